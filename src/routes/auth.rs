use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, LoginRequest, RegisterRequest,
    },
    error::AppError,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

fn already_registered() -> AppError {
    AppError::BadRequest("Email or username already registered".into())
}

/// Register a new member
///
/// Creates a new account and returns an authentication token.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let existing_user = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM users WHERE email = $1 OR username = $2",
    )
    .bind(&register_data.email)
    .bind(&register_data.username)
    .fetch_optional(&**pool)
    .await?;

    if existing_user.is_some() {
        return Err(already_registered());
    }

    let password_hash = hash_password(&register_data.password)?;

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(password_hash)
    .fetch_one(&**pool)
    .await
    .map_err(|e| match e {
        // A concurrent registration won the race for the same email or username.
        sqlx::Error::Database(ref db) if db.is_unique_violation() => already_registered(),
        other => other.into(),
    })?;

    let token = generate_token(user_id)?;

    log::info!("Registered member {} ({})", user_id, register_data.username);
    Ok(HttpResponse::Created().json(AuthResponse { token, user_id }))
}

/// Login member
///
/// Authenticates a member and returns an authentication token.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = sqlx::query_as::<_, (i32, String)>(
        "SELECT id, password_hash FROM users WHERE email = $1",
    )
    .bind(&login_data.email)
    .fetch_optional(&**pool)
    .await?;

    match user {
        Some((user_id, password_hash)) if verify_password(&login_data.password, &password_hash)? => {
            let token = generate_token(user_id)?;
            Ok(HttpResponse::Ok().json(AuthResponse { token, user_id }))
        }
        _ => {
            log::warn!("Failed login attempt for {}", login_data.email);
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
    }
}

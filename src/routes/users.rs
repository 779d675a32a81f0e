use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Event, User},
};
use actix_web::{get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Returns the caller's account.
#[get("/me")]
pub async fn me(pool: web::Data<PgPool>, user: CurrentUser) -> Result<impl Responder, AppError> {
    let account = sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users WHERE id = $1")
        .bind(user.id())
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(account))
}

/// Events the caller is registered for as participant, earliest first.
#[get("/me/events")]
pub async fn my_events(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT e.id, e.name, e.description, e.date_and_time, e.location, e.max_participants, \
                e.created_at, e.updated_at \
         FROM events e \
         JOIN event_participants p ON p.event_id = e.id \
         WHERE p.user_id = $1 \
         ORDER BY e.date_and_time ASC",
    )
    .bind(user.id())
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(events))
}

#![allow(dead_code)]

use actix_web::{dev::ServiceResponse, test};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Connects to `DATABASE_URL` and applies the migrations.
///
/// Returns `None` when no database is configured so the calling test can
/// skip itself.
pub async fn test_pool() -> Option<PgPool> {
    dotenv::dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    eventdesk::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    Some(pool)
}

/// Builds the full application the way `main` does, minus CORS.
macro_rules! test_app {
    ($pool:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .wrap(actix_web::middleware::Logger::default())
                .service(eventdesk::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(eventdesk::auth::AuthMiddleware)
                        .configure(eventdesk::routes::config),
                ),
        )
        .await
    };
}

pub struct TestMember {
    pub id: i32,
    pub username: String,
    pub token: String,
}

impl TestMember {
    pub fn bearer(&self) -> (actix_web::http::header::HeaderName, String) {
        (
            actix_web::http::header::AUTHORIZATION,
            format!("Bearer {}", self.token),
        )
    }
}

/// Registers a member with a unique name through the API.
pub async fn register_member<S, B>(app: &S, prefix: &str) -> TestMember
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    B: actix_web::body::MessageBody,
{
    let suffix = &Uuid::new_v4().simple().to_string()[..12];
    let username = format!("{}_{}", prefix, suffix);
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "Password123!"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(
        resp.status(),
        actix_web::http::StatusCode::CREATED,
        "Failed to register test member"
    );
    let auth: eventdesk::auth::AuthResponse = test::read_body_json(resp).await;

    TestMember {
        id: auth.user_id,
        username,
        token: auth.token,
    }
}

pub async fn cleanup_member(pool: &PgPool, member: &TestMember) {
    let _ = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(member.id)
        .execute(pool)
        .await;
}

pub async fn cleanup_event(pool: &PgPool, event_id: Uuid) {
    let _ = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await;
}

pub fn event_payload(name: &str, date_and_time: &str, max_participants: i32) -> serde_json::Value {
    json!({
        "name": name,
        "description": "Test Event Description",
        "date_and_time": date_and_time,
        "location": "Test Event Location",
        "max_participants": max_participants
    })
}

/// Creates an event through the API and returns its id.
pub async fn create_event<S, B>(app: &S, member: &TestMember, payload: serde_json::Value) -> Uuid
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    B: actix_web::body::MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(member.bearer())
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let event: eventdesk::models::Event = test::read_body_json(resp).await;
    event.id
}

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::Participant,
    routes::events::find_event,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;

const PARTICIPANT_ROWS: &str = "SELECT p.user_id, u.username, p.registered_at \
     FROM event_participants p \
     JOIN users u ON u.id = p.user_id";

async fn find_participant<'e, E>(
    executor: E,
    event_id: Uuid,
    user_id: i32,
) -> Result<Option<Participant>, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let participant = sqlx::query_as::<_, Participant>(&format!(
        "{} WHERE p.event_id = $1 AND p.user_id = $2",
        PARTICIPANT_ROWS
    ))
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(participant)
}

/// Lists the participants of an event in registration order.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Participant`.
/// - `404 Not Found`: no event with this id.
#[get("/{id}/participants")]
pub async fn list_participants(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event = find_event(&**pool, event_id.into_inner()).await?;

    let participants = sqlx::query_as::<_, Participant>(&format!(
        "{} WHERE p.event_id = $1 ORDER BY p.registered_at ASC, p.user_id ASC",
        PARTICIPANT_ROWS
    ))
    .bind(event.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(participants))
}

/// Registers the caller as a participant of the event.
///
/// Registering twice is not an error: the existing registration is returned
/// with `200 OK`. The event row is locked for the duration of the check so
/// concurrent registrations cannot exceed `max_participants`.
///
/// ## Responses:
/// - `201 Created`: the new `Participant`.
/// - `200 OK`: the caller was already registered.
/// - `404 Not Found`: no event with this id.
/// - `409 Conflict`: the event is full.
#[post("/{id}/participants")]
pub async fn register_participant(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event_id = event_id.into_inner();
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    let event = find_event(&mut *tx, event_id).await?;

    if let Some(existing) = find_participant(&mut *tx, event.id, user.id()).await? {
        tx.commit().await?;
        return Ok(HttpResponse::Ok().json(existing));
    }

    let (participant_count,) =
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM event_participants WHERE event_id = $1")
            .bind(event.id)
            .fetch_one(&mut *tx)
            .await?;

    if event.is_full(participant_count) {
        log::info!(
            "User {} turned away from full event {} ({} / {})",
            user.id(),
            event.id,
            participant_count,
            event.max_participants
        );
        return Err(AppError::Conflict("Event is full".into()));
    }

    sqlx::query("INSERT INTO event_participants (event_id, user_id) VALUES ($1, $2)")
        .bind(event.id)
        .bind(user.id())
        .execute(&mut *tx)
        .await?;

    let participant = find_participant(&mut *tx, event.id, user.id())
        .await?
        .ok_or_else(|| AppError::InternalServerError("Registration vanished".into()))?;

    tx.commit().await?;

    log::info!("User {} registered for event {}", user.id(), event.id);
    Ok(HttpResponse::Created().json(participant))
}

/// Removes the caller from the event's participants.
///
/// Unregistering when not registered is a no-op.
///
/// ## Responses:
/// - `204 No Content`: the caller is no longer a participant.
/// - `404 Not Found`: no event with this id.
#[delete("/{id}/participants")]
pub async fn unregister_participant(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event = find_event(&**pool, event_id.into_inner()).await?;

    let result = sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND user_id = $2")
        .bind(event.id)
        .bind(user.id())
        .execute(&**pool)
        .await?;

    if result.rows_affected() > 0 {
        log::info!("User {} unregistered from event {}", user.id(), event.id);
    }
    Ok(HttpResponse::NoContent().finish())
}

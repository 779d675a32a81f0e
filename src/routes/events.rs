use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        event::EVENT_COLUMNS, is_candidating_alone, Event, EventDetail, EventInput, EventListRow,
        EventSummary,
    },
    routes::candidacies::load_event_candidacies,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Loads an event or fails with `NotFound`.
pub(crate) async fn find_event<'e, E>(executor: E, event_id: Uuid) -> Result<Event, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Event>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
        .bind(event_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// Lists every event, earliest first.
///
/// Each entry carries the participant count and whether the caller is a
/// participant or the sole candidate of one of the event's candidacies.
///
/// ## Responses:
/// - `200 OK`: JSON array of `EventSummary`.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn list_events(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let rows = sqlx::query_as::<_, EventListRow>(
        "SELECT e.id, e.name, e.description, e.date_and_time, e.location, e.max_participants, \
                e.created_at, e.updated_at, \
                (SELECT COUNT(*) FROM event_participants p WHERE p.event_id = e.id) AS participant_count, \
                EXISTS (SELECT 1 FROM event_participants p \
                        WHERE p.event_id = e.id AND p.user_id = $1) AS is_participant, \
                EXISTS (SELECT 1 FROM candidacies c \
                        JOIN candidacy_candidates cc ON cc.candidacy_id = c.id \
                        WHERE c.event_id = e.id AND cc.user_id = $1 \
                          AND (SELECT COUNT(*) FROM candidacy_candidates other \
                               WHERE other.candidacy_id = c.id) = 1) AS is_candidating_alone \
         FROM events e \
         ORDER BY e.date_and_time ASC",
    )
    .bind(user.id())
    .fetch_all(&**pool)
    .await?;

    let events: Vec<EventSummary> = rows.into_iter().map(EventSummary::from).collect();
    Ok(HttpResponse::Ok().json(events))
}

/// Creates an event.
///
/// ## Responses:
/// - `201 Created`: the new `Event`.
/// - `422 Unprocessable Entity`: `EventInput` validation failed.
#[post("")]
pub async fn create_event(
    pool: web::Data<PgPool>,
    event_data: web::Json<EventInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    event_data.validate()?;
    let event = Event::new(event_data.into_inner());

    let created = sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (id, name, description, date_and_time, location, max_participants, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {}",
        EVENT_COLUMNS
    ))
    .bind(event.id)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.date_and_time)
    .bind(&event.location)
    .bind(event.max_participants)
    .bind(event.created_at)
    .bind(event.updated_at)
    .fetch_one(&**pool)
    .await?;

    log::info!("User {} created event {} ({})", user.id(), created.id, created.name);
    Ok(HttpResponse::Created().json(created))
}

/// Returns one event with its candidacies and the caller's membership flags.
///
/// ## Responses:
/// - `200 OK`: `EventDetail`.
/// - `404 Not Found`: no event with this id.
#[get("/{id}")]
pub async fn get_event(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event = find_event(&**pool, event_id.into_inner()).await?;

    let (participant_count, is_participant) = sqlx::query_as::<_, (i64, bool)>(
        "SELECT COUNT(*), COALESCE(BOOL_OR(user_id = $2), FALSE) \
         FROM event_participants WHERE event_id = $1",
    )
    .bind(event.id)
    .bind(user.id())
    .fetch_one(&**pool)
    .await?;

    let candidacies = load_event_candidacies(&pool, event.id).await?;

    Ok(HttpResponse::Ok().json(EventDetail {
        display_date: event.display_date(),
        is_candidating_alone: is_candidating_alone(user.id(), &candidacies),
        event,
        participant_count,
        is_participant,
        candidacies,
    }))
}

/// Deletes an event together with its participants and candidacies.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no event with this id.
#[delete("/{id}")]
pub async fn delete_event(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event_id = event_id.into_inner();
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Event not found".into()));
    }

    log::info!("User {} deleted event {}", user.id(), event_id);
    Ok(HttpResponse::NoContent().finish())
}

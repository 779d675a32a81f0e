use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        event::EVENT_COLUMNS, group_candidacies, Candidacy, CandidacyCandidateRow, CandidacyInput,
        Event, NewCandidacy,
    },
    routes::events::find_event,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const CANDIDACY_ROWS: &str =
    "SELECT c.id AS candidacy_id, c.event_id, c.created_at, cc.user_id, u.username, \
            cc.as_player, cc.as_speaker, cc.as_arbiter, cc.as_disk_jockey \
     FROM candidacies c \
     JOIN candidacy_candidates cc ON cc.candidacy_id = c.id \
     JOIN users u ON u.id = cc.user_id";

/// All candidacies of an event, oldest first.
pub(crate) async fn load_event_candidacies(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<Candidacy>, AppError> {
    let rows = sqlx::query_as::<_, CandidacyCandidateRow>(&format!(
        "{} WHERE c.event_id = $1 ORDER BY c.created_at ASC, c.id, cc.position ASC",
        CANDIDACY_ROWS
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(group_candidacies(rows))
}

async fn load_candidacy(
    pool: &PgPool,
    event_id: Uuid,
    candidacy_id: Uuid,
) -> Result<Option<Candidacy>, AppError> {
    let rows = sqlx::query_as::<_, CandidacyCandidateRow>(&format!(
        "{} WHERE c.event_id = $1 AND c.id = $2 ORDER BY cc.position ASC",
        CANDIDACY_ROWS
    ))
    .bind(event_id)
    .bind(candidacy_id)
    .fetch_all(pool)
    .await?;

    Ok(group_candidacies(rows).into_iter().next())
}

/// Lists the candidacies of an event with their candidates and roles.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Candidacy`.
/// - `404 Not Found`: no event with this id.
#[get("/{id}/candidacies")]
pub async fn list_candidacies(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let event = find_event(&**pool, event_id.into_inner()).await?;
    let candidacies = load_event_candidacies(&pool, event.id).await?;
    Ok(HttpResponse::Ok().json(candidacies))
}

/// Submits a candidacy for the caller, optionally with teammates.
///
/// The caller's own role flags sit at the top level of the body; each entry
/// of `teammates` names another member and their roles. Every candidate
/// needs at least one role and may appear only once.
///
/// ## Responses:
/// - `201 Created`: the stored `Candidacy`.
/// - `400 Bad Request`: a candidate is listed more than once.
/// - `404 Not Found`: a teammate does not exist.
/// - `422 Unprocessable Entity`: a candidate has no role, or the event does not exist.
#[post("/{id}/candidacies")]
pub async fn submit_candidacy(
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    candidacy_data: web::Json<CandidacyInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    candidacy_data.validate()?;
    let requests = candidacy_data.into_inner().into_requests(user.id())?;

    let event = sqlx::query_as::<_, Event>(&format!(
        "SELECT {} FROM events WHERE id = $1",
        EVENT_COLUMNS
    ))
    .bind(event_id.into_inner())
    .fetch_optional(&**pool)
    .await?;

    let candidacy = NewCandidacy::from_event_and_candidates(event.as_ref(), requests)?;

    let mut tx = pool.begin().await?;

    // FOR SHARE keeps the candidates from being deleted before the commit.
    let candidate_ids: Vec<i32> = candidacy.candidates.iter().map(|c| c.candidate()).collect();
    let known = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = ANY($1) FOR SHARE")
        .bind(candidate_ids.as_slice())
        .fetch_all(&mut *tx)
        .await?;
    if let Some(missing) = candidate_ids.iter().find(|id| !known.contains(*id)) {
        return Err(AppError::NotFound(format!("Candidate {} not found", missing)));
    }

    sqlx::query("INSERT INTO candidacies (id, event_id) VALUES ($1, $2)")
        .bind(candidacy.id)
        .bind(candidacy.event_id)
        .execute(&mut *tx)
        .await?;

    for (position, request) in candidacy.candidates.iter().enumerate() {
        let roles = request.roles();
        sqlx::query(
            "INSERT INTO candidacy_candidates \
             (candidacy_id, user_id, as_player, as_speaker, as_arbiter, as_disk_jockey, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(candidacy.id)
        .bind(request.candidate())
        .bind(roles.player)
        .bind(roles.speaker)
        .bind(roles.arbiter)
        .bind(roles.disk_jockey)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "User {} submitted candidacy {} for event {} with {} candidate(s)",
        user.id(),
        candidacy.id,
        candidacy.event_id,
        candidacy.candidates.len()
    );

    let stored = load_candidacy(&pool, candidacy.event_id, candidacy.id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Stored candidacy vanished".into()))?;
    Ok(HttpResponse::Created().json(stored))
}

/// Cancels a candidacy: the candidacy and its candidate rows are deleted.
///
/// Only a member listed in the candidacy may cancel it; for anyone else the
/// candidacy is reported as not found.
///
/// ## Responses:
/// - `204 No Content`: cancelled.
/// - `404 Not Found`: no such candidacy on this event, or the caller is not one of its candidates.
#[post("/{id}/candidacies/{candidacy_id}/cancel")]
pub async fn cancel_candidacy(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid, Uuid)>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let (event_id, candidacy_id) = path.into_inner();

    let candidacy = load_candidacy(&pool, event_id, candidacy_id)
        .await?
        .filter(|candidacy| candidacy.has_candidate(user.id()))
        .ok_or_else(|| AppError::NotFound("Candidacy not found".into()))?;

    sqlx::query("DELETE FROM candidacies WHERE id = $1")
        .bind(candidacy.id)
        .execute(&**pool)
        .await?;

    log::info!("User {} cancelled candidacy {}", user.id(), candidacy.id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use actix_web::{dev::Service, http::StatusCode, test, App, HttpMessage};
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    async fn submit(body: serde_json::Value) -> StatusCode {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .wrap_fn(|req, srv| {
                    req.extensions_mut().insert(Claims { sub: 1, exp: 0 });
                    srv.call(req)
                })
                .service(web::scope("/events").service(submit_candidacy)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/events/{}/candidacies", Uuid::new_v4()))
            .set_json(body)
            .to_request();
        test::call_service(&app, req).await.status()
    }

    #[actix_rt::test]
    async fn test_candidacy_without_role_is_rejected() {
        assert_eq!(submit(json!({})).await, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            submit(json!({"player": false, "speaker": false})).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[actix_rt::test]
    async fn test_teammate_without_role_is_rejected() {
        let body = json!({"player": true, "teammates": [{"candidate": 2}]});
        assert_eq!(submit(body).await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_rt::test]
    async fn test_duplicate_candidate_is_rejected() {
        let body = json!({
            "arbiter": true,
            "teammates": [{"candidate": 2, "player": true}, {"candidate": 2, "speaker": true}]
        });
        assert_eq!(submit(body).await, StatusCode::BAD_REQUEST);
    }
}

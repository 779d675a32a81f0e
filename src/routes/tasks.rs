use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Task, TaskInput, TaskWithContributors},
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const TASK_WITH_CONTRIBUTORS: &str =
    "SELECT t.id, t.name, t.description, t.created_at, t.updated_at, \
            COALESCE(ARRAY_AGG(tc.user_id ORDER BY tc.joined_at, tc.user_id) \
                     FILTER (WHERE tc.user_id IS NOT NULL), '{}') AS contributors \
     FROM tasks t \
     LEFT JOIN task_contributors tc ON tc.task_id = t.id";

/// Query parameters for filtering tasks when listing them.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    /// Case-insensitive match on name or description.
    pub search: Option<String>,
    /// Only tasks this member contributes to.
    pub contributor: Option<i32>,
}

/// `%term%` for ILIKE, with `\`, `%` and `_` in `term` matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn find_task(pool: &PgPool, task_id: Uuid) -> Result<TaskWithContributors, AppError> {
    sqlx::query_as::<_, TaskWithContributors>(&format!(
        "{} WHERE t.id = $1 GROUP BY t.id",
        TASK_WITH_CONTRIBUTORS
    ))
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Lists tasks with their contributors, newest first.
///
/// ## Query Parameters:
/// - `search` (optional): matched against name and description (case-insensitive).
/// - `contributor` (optional): only tasks claimed by this member id.
///
/// ## Responses:
/// - `200 OK`: JSON array of `TaskWithContributors`.
#[get("")]
#[allow(unused_assignments)]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let mut sql = String::from(TASK_WITH_CONTRIBUTORS);
    let mut conditions: Vec<String> = Vec::new();
    let mut param_count = 1;

    if query_params.search.is_some() {
        conditions.push(format!(
            "(t.name ILIKE ${0} OR t.description ILIKE ${0})",
            param_count
        ));
        param_count += 1;
    }
    if query_params.contributor.is_some() {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM task_contributors mine \
                     WHERE mine.task_id = t.id AND mine.user_id = ${})",
            param_count
        ));
        param_count += 1;
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" GROUP BY t.id ORDER BY t.created_at DESC");

    let mut query_builder = sqlx::query_as::<_, TaskWithContributors>(&sql);
    if let Some(search) = &query_params.search {
        query_builder = query_builder.bind(contains_pattern(search));
    }
    if let Some(contributor) = query_params.contributor {
        query_builder = query_builder.bind(contributor);
    }

    let tasks = query_builder.fetch_all(&**pool).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task with no contributors.
///
/// ## Responses:
/// - `201 Created`: the new `TaskWithContributors`.
/// - `422 Unprocessable Entity`: `TaskInput` validation failed.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task = Task::new(task_data.into_inner());

    let created = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, name, description, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, description, created_at, updated_at",
    )
    .bind(task.id)
    .bind(&task.name)
    .bind(&task.description)
    .bind(task.created_at)
    .bind(task.updated_at)
    .fetch_one(&**pool)
    .await?;

    log::info!("User {} created task {} ({})", user.id(), created.id, created.name);
    Ok(HttpResponse::Created().json(TaskWithContributors {
        task: created,
        contributors: Vec::new(),
    }))
}

/// Retrieves a task with its contributors.
///
/// ## Responses:
/// - `200 OK`: `TaskWithContributors`.
/// - `404 Not Found`: no task with this id.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    _user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = find_task(&pool, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task and its contributions.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no task with this id.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    log::info!("User {} deleted task {}", user.id(), task_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Adds the caller to the task's contributors. Claiming twice is a no-op.
///
/// ## Responses:
/// - `200 OK`: the updated `TaskWithContributors`.
/// - `404 Not Found`: no task with this id.
#[post("/{id}/claim")]
pub async fn claim_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = find_task(&pool, task_id.into_inner()).await?;

    sqlx::query(
        "INSERT INTO task_contributors (task_id, user_id) VALUES ($1, $2) \
         ON CONFLICT (task_id, user_id) DO NOTHING",
    )
    .bind(task.task.id)
    .bind(user.id())
    .execute(&**pool)
    .await?;

    log::info!("User {} claimed task {}", user.id(), task.task.id);
    let task = find_task(&pool, task.task.id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Removes the caller from the task's contributors.
///
/// ## Responses:
/// - `204 No Content`: the caller no longer contributes to the task.
/// - `404 Not Found`: no task with this id.
#[delete("/{id}/claim")]
pub async fn release_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = find_task(&pool, task_id.into_inner()).await?;

    sqlx::query("DELETE FROM task_contributors WHERE task_id = $1 AND user_id = $2")
        .bind(task.task.id)
        .bind(user.id())
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

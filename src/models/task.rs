use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The name of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Optional longer description; empty when omitted.
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
}

/// A task as stored in the `tasks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task together with the ids of the members who claimed it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskWithContributors {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub contributors: Vec<i32>,
}

impl Task {
    /// Creates a new `Task` with a fresh id; `created_at` and `updated_at`
    /// are both set to now.
    pub fn new(input: TaskInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }
}

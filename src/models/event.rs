use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::candidacy::Candidacy;

/// Column list shared by every query returning an `Event`.
pub const EVENT_COLUMNS: &str =
    "id, name, description, date_and_time, location, max_participants, created_at, updated_at";

/// Input for creating an event.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EventInput {
    /// 1 to 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,

    pub date_and_time: DateTime<Utc>,

    /// 1 to 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub location: String,

    /// Capacity; `0` means nobody can register as participant.
    #[validate(range(min = 0))]
    pub max_participants: i32,
}

/// An event as stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date_and_time: DateTime<Utc>,
    pub location: String,
    pub max_participants: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(input: EventInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            date_and_time: input.date_and_time,
            location: input.location,
            max_participants: input.max_participants,
            created_at: now,
            updated_at: now,
        }
    }

    /// `dd/mm/YYYY HH:MM`, as shown to members.
    pub fn display_date(&self) -> String {
        self.date_and_time.format("%d/%m/%Y %H:%M").to_string()
    }

    pub fn is_full(&self, participant_count: i64) -> bool {
        participant_count >= i64::from(self.max_participants)
    }
}

/// An event row joined with the requesting member's membership flags.
#[derive(Debug, Clone, FromRow)]
pub struct EventListRow {
    #[sqlx(flatten)]
    pub event: Event,
    pub participant_count: i64,
    pub is_participant: bool,
    pub is_candidating_alone: bool,
}

/// An event as listed for a given member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub display_date: String,
    pub participant_count: i64,
    pub is_participant: bool,
    pub is_candidating_alone: bool,
}

impl From<EventListRow> for EventSummary {
    fn from(row: EventListRow) -> Self {
        Self {
            display_date: row.event.display_date(),
            event: row.event,
            participant_count: row.participant_count,
            is_participant: row.is_participant,
            is_candidating_alone: row.is_candidating_alone,
        }
    }
}

/// An event with its candidacies, as returned by `GET /api/events/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub display_date: String,
    pub participant_count: i64,
    pub is_participant: bool,
    pub is_candidating_alone: bool,
    pub candidacies: Vec<Candidacy>,
}

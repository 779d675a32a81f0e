//! Candidacies: applications by one or more members to take roles at an event.
//!
//! A candidacy is only built through [`NewCandidacy::from_event_and_candidates`],
//! which guarantees an existing event and at least one candidate, and every
//! candidate goes through [`CandidateCandidacyRequest::new`], which guarantees
//! at least one role.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::event::Event;

pub const MISSING_ROLE: &str = "At least one role is required to create a candidacy request";
pub const MISSING_EVENT: &str = "An event is required to create a candidacy";
pub const MISSING_CANDIDATE: &str = "At least one candidate is required to create a candidacy";

/// Roles a candidate applies for. Omitted flags are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleFlags {
    pub player: bool,
    pub speaker: bool,
    pub arbiter: bool,
    pub disk_jockey: bool,
}

impl RoleFlags {
    pub fn any(&self) -> bool {
        self.player || self.speaker || self.arbiter || self.disk_jockey
    }
}

fn require_a_role(roles: &RoleFlags) -> Result<(), ValidationError> {
    if roles.any() {
        Ok(())
    } else {
        let mut error = ValidationError::new("missing_role");
        error.message = Some(Cow::Borrowed(MISSING_ROLE));
        Err(error)
    }
}

fn validate_own_roles(input: &CandidacyInput) -> Result<(), ValidationError> {
    require_a_role(&input.roles)
}

fn validate_teammate_roles(input: &TeammateInput) -> Result<(), ValidationError> {
    require_a_role(&input.roles)
}

/// One member's request to join a candidacy with a non-empty set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateCandidacyRequest {
    candidate: i32,
    roles: RoleFlags,
}

impl CandidateCandidacyRequest {
    pub fn new(candidate: i32, roles: RoleFlags) -> Result<Self, AppError> {
        if !roles.any() {
            return Err(AppError::ValidationError(MISSING_ROLE.into()));
        }
        Ok(Self { candidate, roles })
    }

    pub fn candidate(&self) -> i32 {
        self.candidate
    }

    pub fn roles(&self) -> RoleFlags {
        self.roles
    }
}

/// A candidacy ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidacy {
    pub id: Uuid,
    pub event_id: Uuid,
    pub candidates: Vec<CandidateCandidacyRequest>,
}

impl NewCandidacy {
    pub fn from_event_and_candidates(
        event: Option<&Event>,
        candidates: Vec<CandidateCandidacyRequest>,
    ) -> Result<Self, AppError> {
        let event = event.ok_or_else(|| AppError::ValidationError(MISSING_EVENT.into()))?;
        if candidates.is_empty() {
            return Err(AppError::ValidationError(MISSING_CANDIDATE.into()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            event_id: event.id,
            candidates,
        })
    }
}

/// A teammate added to a group candidacy by the submitting member.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_teammate_roles"))]
pub struct TeammateInput {
    pub candidate: i32,
    #[serde(flatten)]
    pub roles: RoleFlags,
}

/// Body of `POST /api/events/{id}/candidacies`.
///
/// The submitting member's own roles sit at the top level; `teammates` is
/// empty for an individual candidacy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_own_roles"))]
pub struct CandidacyInput {
    #[serde(flatten)]
    pub roles: RoleFlags,
    #[serde(default)]
    #[validate]
    pub teammates: Vec<TeammateInput>,
}

impl CandidacyInput {
    /// Submitter first, then teammates in submission order.
    ///
    /// A member listed twice (the submitter included) rejects the whole input.
    pub fn into_requests(self, submitter: i32) -> Result<Vec<CandidateCandidacyRequest>, AppError> {
        let mut seen = HashSet::new();
        seen.insert(submitter);

        let mut requests = Vec::with_capacity(self.teammates.len() + 1);
        requests.push(CandidateCandidacyRequest::new(submitter, self.roles)?);

        for teammate in self.teammates {
            if !seen.insert(teammate.candidate) {
                return Err(AppError::BadRequest(format!(
                    "Candidate {} appears more than once in the candidacy",
                    teammate.candidate
                )));
            }
            requests.push(CandidateCandidacyRequest::new(
                teammate.candidate,
                teammate.roles,
            )?);
        }

        Ok(requests)
    }
}

/// A candidate of a stored candidacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidacyCandidate {
    pub user_id: i32,
    pub username: String,
    #[serde(flatten)]
    pub roles: RoleFlags,
}

/// A stored candidacy with its candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidacy {
    pub id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub candidates: Vec<CandidacyCandidate>,
}

impl Candidacy {
    pub fn has_candidate(&self, user_id: i32) -> bool {
        self.candidates.iter().any(|c| c.user_id == user_id)
    }
}

/// One row of the candidacy ⨝ candidate ⨝ user join.
#[derive(Debug, Clone, FromRow)]
pub struct CandidacyCandidateRow {
    pub candidacy_id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: i32,
    pub username: String,
    pub as_player: bool,
    pub as_speaker: bool,
    pub as_arbiter: bool,
    pub as_disk_jockey: bool,
}

/// Folds join rows into candidacies, keeping first-seen order for both
/// candidacies and their candidates.
pub fn group_candidacies(rows: Vec<CandidacyCandidateRow>) -> Vec<Candidacy> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut candidacies: Vec<Candidacy> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.candidacy_id).or_insert_with(|| {
            candidacies.push(Candidacy {
                id: row.candidacy_id,
                event_id: row.event_id,
                created_at: row.created_at,
                candidates: Vec::new(),
            });
            candidacies.len() - 1
        });
        candidacies[slot].candidates.push(CandidacyCandidate {
            user_id: row.user_id,
            username: row.username,
            roles: RoleFlags {
                player: row.as_player,
                speaker: row.as_speaker,
                arbiter: row.as_arbiter,
                disk_jockey: row.as_disk_jockey,
            },
        });
    }

    candidacies
}

/// True when `user_id` is the only candidate of one of `candidacies`.
pub fn is_candidating_alone(user_id: i32, candidacies: &[Candidacy]) -> bool {
    candidacies
        .iter()
        .any(|candidacy| candidacy.candidates.len() == 1 && candidacy.has_candidate(user_id))
}

pub mod candidacy;
pub mod event;
pub mod task;
pub mod user;

pub use candidacy::{
    group_candidacies, is_candidating_alone, CandidacyCandidate, Candidacy, CandidacyCandidateRow,
    CandidacyInput, CandidateCandidacyRequest, NewCandidacy, RoleFlags, TeammateInput,
};
pub use event::{Event, EventDetail, EventInput, EventListRow, EventSummary};
pub use task::{Task, TaskInput, TaskWithContributors};
pub use user::{Participant, User};

use actlog_core::{InvalidAction, RecordId, TransitionError};
use actlog_storage::StorageError;

/// Failures surfaced by [`crate::ActivityService`].
///
/// Everything except `Storage` is a deterministic validation outcome.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Absent, or owned by someone else. Never distinguished.
    #[error("not found")]
    NotFound { id: RecordId },

    #[error(transparent)]
    InvalidAction(#[from] InvalidAction),

    /// `InvalidStatusValue` or `InvalidTransition` from the transition engine.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Every transition attempt lost a version race.
    #[error("record {id} was modified concurrently; gave up after {attempts} attempts")]
    Conflict { id: RecordId, attempts: u32 },

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::RecordNotFound { id } => ServiceError::NotFound { id },
            other => ServiceError::Storage(other),
        }
    }
}

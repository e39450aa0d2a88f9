//! Status transition engine.
//!
//! A pure decision over `(current, requested)`:
//! 1. Reject values outside the status set (`InvalidStatusValue`)
//! 2. Accept a same-value request as a no-op
//! 3. Reject moves not in `current.allowed_next()` (`InvalidTransition`)
//! 4. Otherwise accept the move
//!
//! Persisting the outcome is the caller's job.

use crate::error::TransitionError;
use crate::types::Status;

/// An accepted transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one. Nothing to persist.
    Unchanged(Status),
    /// The record moves forward one step.
    Advanced { from: Status, to: Status },
}

impl Transition {
    /// The status the record holds after the transition.
    pub fn status(self) -> Status {
        match self {
            Transition::Unchanged(s) => s,
            Transition::Advanced { to, .. } => to,
        }
    }
}

/// Validate a raw status-change request against the current status.
pub fn transition(current: Status, requested: &str) -> Result<Transition, TransitionError> {
    let to = Status::parse(requested).ok_or_else(|| TransitionError::InvalidStatusValue {
        value: requested.to_string(),
    })?;
    transition_to(current, to)
}

/// Validate a status-change request that is already known to be a status.
pub fn transition_to(current: Status, to: Status) -> Result<Transition, TransitionError> {
    if to == current {
        return Ok(Transition::Unchanged(current));
    }

    let allowed = current.allowed_next();
    if !allowed.contains(&to) {
        return Err(TransitionError::InvalidTransition {
            from: current,
            to,
            allowed,
        });
    }

    Ok(Transition::Advanced { from: current, to })
}

//! Validation errors produced by the core.

use crate::types::{Action, Status};

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// A create or update request named an action outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAction {
    pub value: String,
}

impl InvalidAction {
    /// Wire names of every accepted action.
    pub fn valid_choices(&self) -> Vec<&'static str> {
        Action::ALL.iter().map(|a| a.as_str()).collect()
    }
}

impl std::fmt::Display for InvalidAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid action '{}'. valid choices: {}",
            self.value,
            join_names(Action::ALL.iter().map(|a| a.as_str()))
        )
    }
}

impl std::error::Error for InvalidAction {}

/// A status change request rejected by the transition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The requested value is not a status at all.
    InvalidStatusValue { value: String },
    /// The requested status exists but is not reachable from the current one.
    InvalidTransition {
        from: Status,
        to: Status,
        allowed: &'static [Status],
    },
}

impl TransitionError {
    /// Wire names of every status, for `InvalidStatusValue` responses.
    pub fn valid_choices() -> Vec<&'static str> {
        Status::ALL.iter().map(|s| s.as_str()).collect()
    }
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::InvalidStatusValue { value } => write!(
                f,
                "invalid status '{}'. valid choices: {}",
                value,
                join_names(Status::ALL.iter().map(|s| s.as_str()))
            ),
            TransitionError::InvalidTransition { from, to, allowed } => {
                let allowed = if allowed.is_empty() {
                    "none".to_string()
                } else {
                    join_names(allowed.iter().map(|s| s.as_str()))
                };
                write!(
                    f,
                    "invalid transition from {} to {}. allowed: {}",
                    from, to, allowed
                )
            }
        }
    }
}

impl std::error::Error for TransitionError {}

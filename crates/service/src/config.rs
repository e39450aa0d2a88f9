use serde::Deserialize;

/// Default number of load-validate-write attempts for one transition.
pub const DEFAULT_MAX_TRANSITION_ATTEMPTS: u32 = 3;

/// Tuning for the status lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Total attempts (first try included) before a transition that keeps
    /// losing version races fails with `ServiceError::Conflict`.
    pub max_transition_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_transition_attempts: DEFAULT_MAX_TRANSITION_ATTEMPTS,
        }
    }
}

//! actlog-service: the operations a caller can perform on activity records.
//!
//! [`ActivityService`] resolves every request against the caller's own
//! records, runs status changes through the transition engine, and retries
//! status writes that lose an optimistic concurrency race.

mod config;
mod error;
mod service;

pub use config::LifecycleConfig;
pub use error::ServiceError;
pub use service::ActivityService;

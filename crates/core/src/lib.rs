//! actlog-core: activity record domain types and the status lifecycle.
//!
//! Everything in this crate is synchronous and free of I/O. Storage
//! backends and the HTTP surface build on top of it.
//!
//! # Public API
//!
//! - [`ActivityRecord`] -- a stored activity record
//! - [`NewRecord`], [`RecordPatch`], [`RecordFilter`] -- inputs for create,
//!   field update and list
//! - [`Action`], [`Status`] -- the closed enumerations a record draws from
//! - [`transition()`] / [`transition_to()`] -- the status transition engine

/// Crate version reported by the health endpoint.
pub const ACTLOG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod record;
pub mod transition;
pub mod types;

pub use error::{InvalidAction, TransitionError};
pub use record::{ActivityRecord, NewRecord, RecordFilter, RecordPatch};
pub use transition::{transition, transition_to, Transition};
pub use types::{Action, Principal, RecordId, Status};

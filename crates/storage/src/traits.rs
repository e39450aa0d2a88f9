use async_trait::async_trait;

use actlog_core::{ActivityRecord, NewRecord, Principal, RecordFilter, RecordId, RecordPatch, Status};

use crate::error::StorageError;

/// The storage trait for activity records.
///
/// Every read and write takes the requesting principal and narrows to the
/// records that principal owns. There is no unscoped accessor.
///
/// ## Ownership
///
/// A record owned by someone else is reported exactly like a missing one:
/// `Err(StorageError::RecordNotFound { id })`. Implementations must not
/// return any other error, or take any observably different path, for a
/// foreign record.
///
/// ## OCC Conflict Detection
///
/// `update_status` performs an optimistic concurrency check:
/// `UPDATE WHERE version = expected_version`. If the stored version
/// differs, the method returns `Err(StorageError::ConcurrentConflict { ... })`
/// and nothing is written.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert a new record owned by `owner`, at status `PENDING` and version 0.
    ///
    /// The store assigns the id and the creation timestamp.
    async fn insert(
        &self,
        owner: &Principal,
        draft: NewRecord,
    ) -> Result<ActivityRecord, StorageError>;

    /// List `owner`'s records matching `filter`, in insertion order.
    async fn list_for_owner(
        &self,
        owner: &Principal,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StorageError>;

    /// Read one record if it exists and belongs to `owner`.
    async fn get_owned(
        &self,
        id: RecordId,
        owner: &Principal,
    ) -> Result<ActivityRecord, StorageError>;

    /// Apply a partial update to the mutable fields. Never touches status.
    ///
    /// Increments the version when the patch is non-empty.
    async fn update_fields(
        &self,
        id: RecordId,
        owner: &Principal,
        patch: &RecordPatch,
    ) -> Result<ActivityRecord, StorageError>;

    /// Write a new status, conditional on `version = expected_version` (OCC).
    ///
    /// Callers are expected to have validated the move with the transition
    /// engine against the status they loaded at `expected_version`.
    async fn update_status(
        &self,
        id: RecordId,
        owner: &Principal,
        expected_version: i64,
        status: Status,
    ) -> Result<ActivityRecord, StorageError>;

    /// Permanently remove one of `owner`'s records.
    async fn delete_owned(&self, id: RecordId, owner: &Principal) -> Result<(), StorageError>;
}

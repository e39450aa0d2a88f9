use actlog_core::RecordId;

/// All errors that can be returned by a RecordStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with this id is visible to the caller. Returned both when
    /// the record does not exist and when it belongs to another principal.
    #[error("record not found: {id}")]
    RecordNotFound { id: RecordId },

    /// Optimistic concurrency control conflict: the record was written
    /// after the caller loaded it.
    #[error("concurrent conflict on record {id}: expected version {expected_version}")]
    ConcurrentConflict { id: RecordId, expected_version: i64 },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

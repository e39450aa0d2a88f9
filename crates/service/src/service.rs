use std::sync::Arc;

use actlog_core::{
    transition, Action, ActivityRecord, NewRecord, Principal, RecordFilter, RecordId, RecordPatch,
    Transition,
};
use actlog_storage::{RecordStore, StorageError};

use crate::config::LifecycleConfig;
use crate::error::ServiceError;

/// Record operations scoped to the calling principal.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn RecordStore>,
    config: LifecycleConfig,
}

impl ActivityService {
    pub fn new(store: Arc<dyn RecordStore>, config: LifecycleConfig) -> Self {
        Self { store, config }
    }

    /// Create a record owned by `principal` at status `PENDING`.
    pub async fn create(
        &self,
        principal: &Principal,
        action: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<ActivityRecord, ServiceError> {
        let action: Action = action.parse()?;
        let record = self
            .store
            .insert(principal, NewRecord { action, metadata })
            .await?;
        tracing::info!(
            record.id = %record.id,
            owner = %principal,
            action = %record.action,
            "activity record created"
        );
        Ok(record)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, ServiceError> {
        Ok(self.store.list_for_owner(principal, filter).await?)
    }

    pub async fn get(
        &self,
        id: RecordId,
        principal: &Principal,
    ) -> Result<ActivityRecord, ServiceError> {
        Ok(self.store.get_owned(id, principal).await?)
    }

    /// Update `action` and/or `metadata`. Status is not reachable from here.
    pub async fn update_fields(
        &self,
        id: RecordId,
        principal: &Principal,
        patch: &RecordPatch,
    ) -> Result<ActivityRecord, ServiceError> {
        let record = self.store.update_fields(id, principal, patch).await?;
        tracing::debug!(record.id = %id, owner = %principal, "activity record fields updated");
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId, principal: &Principal) -> Result<(), ServiceError> {
        self.store.delete_owned(id, principal).await?;
        tracing::info!(record.id = %id, owner = %principal, "activity record deleted");
        Ok(())
    }

    /// Move a record's status.
    ///
    /// Each attempt loads the record, validates `requested` against the
    /// loaded status, and writes conditionally on the loaded version. A lost
    /// race reloads and validates again, so a concurrent writer's result is
    /// always judged by the transition table before this call can succeed.
    pub async fn transition(
        &self,
        id: RecordId,
        principal: &Principal,
        requested: &str,
    ) -> Result<ActivityRecord, ServiceError> {
        let attempts = self.config.max_transition_attempts.max(1);

        for attempt in 1..=attempts {
            let record = self.store.get_owned(id, principal).await?;

            let (from, to) = match transition(record.status, requested)? {
                Transition::Unchanged(_) => return Ok(record),
                Transition::Advanced { from, to } => (from, to),
            };

            match self
                .store
                .update_status(id, principal, record.version, to)
                .await
            {
                Ok(updated) => {
                    tracing::info!(
                        record.id = %id,
                        owner = %principal,
                        from = %from,
                        to = %to,
                        "status transition applied"
                    );
                    return Ok(updated);
                }
                Err(StorageError::ConcurrentConflict { .. }) => {
                    tracing::warn!(
                        record.id = %id,
                        attempt,
                        max_attempts = attempts,
                        "status write lost a version race, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict { id, attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use actlog_core::{Status, TransitionError};
    use actlog_storage::InMemoryRecordStore;
    use async_trait::async_trait;

    fn alice() -> Principal {
        Principal::new("alice")
    }

    fn bob() -> Principal {
        Principal::new("bob")
    }

    fn service() -> ActivityService {
        ActivityService::new(
            Arc::new(InMemoryRecordStore::new()),
            LifecycleConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_upload_file_is_pending() {
        let svc = service();
        let rec = svc.create(&alice(), "UPLOAD_FILE", None).await.unwrap();
        assert_eq!(rec.status, Status::Pending);
        assert_eq!(rec.action, Action::UploadFile);
        assert_eq!(rec.owner, alice());
    }

    #[tokio::test]
    async fn create_rejects_unknown_action() {
        let svc = service();
        match svc.create(&alice(), "test_action", None).await.unwrap_err() {
            ServiceError::InvalidAction(e) => {
                assert_eq!(e.value, "test_action");
                assert_eq!(e.valid_choices(), vec!["LOGIN", "LOGOUT", "UPLOAD_FILE"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(svc.list(&alice(), &RecordFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let svc = service();
        let meta = serde_json::json!({"file": "a.txt", "size": 12});
        let rec = svc
            .create(&alice(), "UPLOAD_FILE", Some(meta.clone()))
            .await
            .unwrap();
        let read = svc.get(rec.id, &alice()).await.unwrap();
        assert_eq!(read.action, Action::UploadFile);
        assert_eq!(read.metadata, Some(meta));
    }

    #[tokio::test]
    async fn pending_to_in_progress_is_accepted() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        let moved = svc.transition(rec.id, &alice(), "IN_PROGRESS").await.unwrap();
        assert_eq!(moved.status, Status::InProgress);
        assert_eq!(
            svc.get(rec.id, &alice()).await.unwrap().status,
            Status::InProgress
        );
    }

    #[tokio::test]
    async fn pending_to_done_is_rejected_with_allowed_set() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        match svc.transition(rec.id, &alice(), "DONE").await.unwrap_err() {
            ServiceError::Transition(TransitionError::InvalidTransition { allowed, .. }) => {
                assert_eq!(allowed, &[Status::InProgress]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(svc.get(rec.id, &alice()).await.unwrap().status, Status::Pending);
    }

    #[tokio::test]
    async fn bogus_status_is_invalid_value() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        let err = svc.transition(rec.id, &alice(), "BOGUS").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Transition(TransitionError::InvalidStatusValue { .. })
        ));
    }

    #[tokio::test]
    async fn full_lifecycle_then_done_is_terminal() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGOUT", None).await.unwrap();
        svc.transition(rec.id, &alice(), "IN_PROGRESS").await.unwrap();
        let done = svc.transition(rec.id, &alice(), "DONE").await.unwrap();
        assert_eq!(done.status, Status::Done);
        for target in ["PENDING", "IN_PROGRESS"] {
            assert!(svc.transition(rec.id, &alice(), target).await.is_err());
        }
        // Same-value request from DONE is an accepted no-op.
        let again = svc.transition(rec.id, &alice(), "DONE").await.unwrap();
        assert_eq!(again, done);
    }

    #[tokio::test]
    async fn same_value_transition_does_not_write() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        let same = svc.transition(rec.id, &alice(), "PENDING").await.unwrap();
        assert_eq!(same.version, rec.version);
    }

    #[tokio::test]
    async fn foreign_record_is_not_found_everywhere() {
        let svc = service();
        let theirs = svc.create(&bob(), "LOGOUT", None).await.unwrap();

        assert!(matches!(
            svc.get(theirs.id, &alice()).await,
            Err(ServiceError::NotFound { .. })
        ));
        let patch = RecordPatch {
            action: Some(Action::Login),
            metadata: None,
        };
        assert!(matches!(
            svc.update_fields(theirs.id, &alice(), &patch).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            svc.delete(theirs.id, &alice()).await,
            Err(ServiceError::NotFound { .. })
        ));
        // Not found wins over a bad status value: existence is checked first.
        for requested in ["IN_PROGRESS", "BOGUS"] {
            assert!(matches!(
                svc.transition(theirs.id, &alice(), requested).await,
                Err(ServiceError::NotFound { .. })
            ));
        }

        assert_eq!(svc.get(theirs.id, &bob()).await.unwrap(), theirs);
    }

    #[tokio::test]
    async fn list_is_scoped_to_caller() {
        let svc = service();
        svc.create(&alice(), "LOGIN", None).await.unwrap();
        svc.create(&bob(), "LOGOUT", None).await.unwrap();
        let mine = svc.list(&alice(), &RecordFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].action, Action::Login);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        svc.delete(rec.id, &alice()).await.unwrap();
        assert!(matches!(
            svc.get(rec.id, &alice()).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_fields_keeps_status() {
        let svc = service();
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();
        svc.transition(rec.id, &alice(), "IN_PROGRESS").await.unwrap();
        let patch = RecordPatch {
            action: Some(Action::Logout),
            metadata: Some(Some(serde_json::json!({"reason": "idle"}))),
        };
        let updated = svc.update_fields(rec.id, &alice(), &patch).await.unwrap();
        assert_eq!(updated.action, Action::Logout);
        assert_eq!(updated.status, Status::InProgress);
    }

    /// Wraps the in-memory store and makes the first `conflicts` status
    /// writes fail as if another writer got there first.
    struct ContendedStore {
        inner: InMemoryRecordStore,
        conflicts: AtomicU32,
        status_writes: AtomicU32,
    }

    impl ContendedStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryRecordStore::new(),
                conflicts: AtomicU32::new(conflicts),
                status_writes: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordStore for ContendedStore {
        async fn insert(
            &self,
            owner: &Principal,
            draft: NewRecord,
        ) -> Result<ActivityRecord, StorageError> {
            self.inner.insert(owner, draft).await
        }

        async fn list_for_owner(
            &self,
            owner: &Principal,
            filter: &RecordFilter,
        ) -> Result<Vec<ActivityRecord>, StorageError> {
            self.inner.list_for_owner(owner, filter).await
        }

        async fn get_owned(
            &self,
            id: RecordId,
            owner: &Principal,
        ) -> Result<ActivityRecord, StorageError> {
            self.inner.get_owned(id, owner).await
        }

        async fn update_fields(
            &self,
            id: RecordId,
            owner: &Principal,
            patch: &RecordPatch,
        ) -> Result<ActivityRecord, StorageError> {
            self.inner.update_fields(id, owner, patch).await
        }

        async fn update_status(
            &self,
            id: RecordId,
            owner: &Principal,
            expected_version: i64,
            status: Status,
        ) -> Result<ActivityRecord, StorageError> {
            self.status_writes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::ConcurrentConflict {
                    id,
                    expected_version,
                });
            }
            self.inner
                .update_status(id, owner, expected_version, status)
                .await
        }

        async fn delete_owned(&self, id: RecordId, owner: &Principal) -> Result<(), StorageError> {
            self.inner.delete_owned(id, owner).await
        }
    }

    #[tokio::test]
    async fn transition_retries_after_conflict() {
        let store = Arc::new(ContendedStore::new(2));
        let svc = ActivityService::new(store.clone(), LifecycleConfig::default());
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();

        let moved = svc.transition(rec.id, &alice(), "IN_PROGRESS").await.unwrap();
        assert_eq!(moved.status, Status::InProgress);
        assert_eq!(store.status_writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transition_gives_up_after_max_attempts() {
        let store = Arc::new(ContendedStore::new(u32::MAX));
        let svc = ActivityService::new(
            store.clone(),
            LifecycleConfig {
                max_transition_attempts: 4,
            },
        );
        let rec = svc.create(&alice(), "LOGIN", None).await.unwrap();

        match svc.transition(rec.id, &alice(), "IN_PROGRESS").await.unwrap_err() {
            ServiceError::Conflict { id, attempts } => {
                assert_eq!(id, rec.id);
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.status_writes.load(Ordering::SeqCst), 4);
        assert_eq!(svc.get(rec.id, &alice()).await.unwrap().status, Status::Pending);
    }

    #[tokio::test]
    async fn racing_identical_transitions_all_succeed() {
        let svc = service();
        let rec = svc.create(&alice(), "UPLOAD_FILE", None).await.unwrap();

        let id = rec.id;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.transition(id, &alice(), "IN_PROGRESS").await
            }));
        }
        for handle in handles {
            let r = handle.await.unwrap().unwrap();
            assert_eq!(r.status, Status::InProgress);
        }
        // Exactly one write landed.
        assert_eq!(svc.get(id, &alice()).await.unwrap().version, 1);
    }
}

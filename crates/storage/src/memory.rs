//! In-memory `RecordStore` backend.
//!
//! Records live in a `BTreeMap` keyed by id, so iteration order is insertion
//! order. Every write runs as a single critical section under the write lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use actlog_core::{ActivityRecord, NewRecord, Principal, RecordFilter, RecordId, RecordPatch, Status};

use crate::error::StorageError;
use crate::traits::RecordStore;

#[derive(Default)]
struct Inner {
    records: BTreeMap<RecordId, ActivityRecord>,
    last_id: u64,
}

impl Inner {
    /// Ownership-scoped mutable lookup. Foreign and missing look the same.
    fn owned_mut(
        &mut self,
        id: RecordId,
        owner: &Principal,
    ) -> Result<&mut ActivityRecord, StorageError> {
        self.records
            .get_mut(&id)
            .filter(|r| r.is_owned_by(owner))
            .ok_or(StorageError::RecordNotFound { id })
    }
}

/// A process-local store. Contents are lost on drop.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all owners.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(
        &self,
        owner: &Principal,
        draft: NewRecord,
    ) -> Result<ActivityRecord, StorageError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = RecordId(inner.last_id);
        let record = ActivityRecord::create(id, owner.clone(), draft, OffsetDateTime::now_utc());
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn list_for_owner(
        &self,
        owner: &Principal,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| r.is_owned_by(owner) && filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get_owned(
        &self,
        id: RecordId,
        owner: &Principal,
    ) -> Result<ActivityRecord, StorageError> {
        let inner = self.inner.read().await;
        inner
            .records
            .get(&id)
            .filter(|r| r.is_owned_by(owner))
            .cloned()
            .ok_or(StorageError::RecordNotFound { id })
    }

    async fn update_fields(
        &self,
        id: RecordId,
        owner: &Principal,
        patch: &RecordPatch,
    ) -> Result<ActivityRecord, StorageError> {
        let mut inner = self.inner.write().await;
        let record = inner.owned_mut(id, owner)?;
        if patch.apply(record) {
            record.version += 1;
        }
        Ok(record.clone())
    }

    async fn update_status(
        &self,
        id: RecordId,
        owner: &Principal,
        expected_version: i64,
        status: Status,
    ) -> Result<ActivityRecord, StorageError> {
        let mut inner = self.inner.write().await;
        let record = inner.owned_mut(id, owner)?;
        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                id,
                expected_version,
            });
        }
        record.status = status;
        record.version += 1;
        Ok(record.clone())
    }

    async fn delete_owned(&self, id: RecordId, owner: &Principal) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.owned_mut(id, owner)?;
        inner.records.remove(&id);
        Ok(())
    }
}

use std::future::Future;
use std::sync::Arc;

use actlog_core::{Action, Status};

use super::{alice, seed, TestResult};
use crate::{RecordStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_status_writes_exactly_one_wins",
        concurrent_status_writes_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_get_distinct_ids",
        concurrent_inserts_get_distinct_ids(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_writes_to_different_records_all_succeed",
        concurrent_writes_to_different_records_all_succeed(factory).await,
    ));

    results
}

// ── Concurrent status write: exactly one wins ───────────────────────────────

/// N tasks all try to move the same record from version 0. Exactly one
/// write lands; the rest must get ConcurrentConflict, and the record ends
/// at version 1.
async fn concurrent_status_writes_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let id = seed(storage.as_ref(), &alice(), Action::UploadFile).await?.id;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            match s
                .update_status(id, &alice(), 0, Status::InProgress)
                .await
            {
                Ok(_) => Ok(true),
                Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    let mut losers = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        } else {
            losers += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }

    let after = storage
        .get_owned(id, &alice())
        .await
        .map_err(|e| format!("get: {e}"))?;
    if after.version != 1 || after.status != Status::InProgress {
        return Err(format!(
            "expected IN_PROGRESS at version 1, got {} at version {}",
            after.status, after.version
        ));
    }
    Ok(())
}

async fn concurrent_inserts_get_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.insert(&alice(), super::draft(Action::Login)).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let rec = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("insert: {e}"))?;
        ids.push(rec.id);
    }
    ids.sort();
    ids.dedup();
    if ids.len() != N {
        return Err(format!("expected {N} distinct ids, got {}", ids.len()));
    }
    Ok(())
}

/// N tasks each move a different record. No false conflicts without
/// contention.
async fn concurrent_writes_to_different_records_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let mut ids = Vec::new();
    for _ in 0..N {
        ids.push(seed(storage.as_ref(), &alice(), Action::Login).await?.id);
    }

    let mut handles = Vec::new();
    for id in ids.clone() {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.update_status(id, &alice(), 0, Status::InProgress).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
    }

    for id in ids {
        let rec = storage
            .get_owned(id, &alice())
            .await
            .map_err(|e| format!("get {id}: {e}"))?;
        if rec.status != Status::InProgress {
            return Err(format!("record {id}: expected IN_PROGRESS, got {}", rec.status));
        }
    }
    Ok(())
}

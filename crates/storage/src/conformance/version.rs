use std::future::Future;

use actlog_core::{Action, Status};

use super::{alice, seed, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "update_with_correct_version_succeeds",
        update_with_correct_version_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "version_increments_sequentially",
        version_increments_sequentially(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_with_wrong_version_returns_conflict",
        update_with_wrong_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_version_after_field_patch",
        stale_version_after_field_patch(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_leaves_record_unchanged",
        conflict_leaves_record_unchanged(factory).await,
    ));

    results
}

async fn update_with_correct_version_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let updated = storage
        .update_status(rec.id, &alice(), 0, Status::InProgress)
        .await
        .map_err(|e| format!("update: {e}"))?;
    if updated.status != Status::InProgress {
        return Err(format!("expected IN_PROGRESS, got {}", updated.status));
    }
    if updated.version != 1 {
        return Err(format!("expected version 1, got {}", updated.version));
    }
    Ok(())
}

async fn version_increments_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let one = storage
        .update_status(rec.id, &alice(), 0, Status::InProgress)
        .await
        .map_err(|e| format!("first update: {e}"))?;
    let two = storage
        .update_status(rec.id, &alice(), one.version, Status::Done)
        .await
        .map_err(|e| format!("second update: {e}"))?;
    if two.version != 2 || two.status != Status::Done {
        return Err(format!(
            "expected DONE at version 2, got {} at version {}",
            two.status, two.version
        ));
    }
    Ok(())
}

async fn update_with_wrong_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    for wrong in [-1, 1, 42] {
        match storage
            .update_status(rec.id, &alice(), wrong, Status::InProgress)
            .await
        {
            Err(StorageError::ConcurrentConflict {
                id,
                expected_version,
            }) => {
                if id != rec.id || expected_version != wrong {
                    return Err(format!(
                        "conflict fields wrong: id {id}, expected_version {expected_version}"
                    ));
                }
            }
            other => return Err(format!("version {wrong}: expected conflict, got {other:?}")),
        }
    }
    Ok(())
}

async fn stale_version_after_field_patch<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let patch = actlog_core::RecordPatch {
        action: Some(Action::Logout),
        metadata: None,
    };
    storage
        .update_fields(rec.id, &alice(), &patch)
        .await
        .map_err(|e| format!("patch: {e}"))?;
    match storage
        .update_status(rec.id, &alice(), rec.version, Status::InProgress)
        .await
    {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        other => Err(format!("expected conflict on stale version, got {other:?}")),
    }
}

async fn conflict_leaves_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let _ = storage
        .update_status(rec.id, &alice(), 7, Status::InProgress)
        .await;
    let after = storage
        .get_owned(rec.id, &alice())
        .await
        .map_err(|e| format!("get: {e}"))?;
    if after != rec {
        return Err("conflicting write modified the record".to_string());
    }
    Ok(())
}

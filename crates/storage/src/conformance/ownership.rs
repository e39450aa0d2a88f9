use std::future::Future;

use actlog_core::{Action, RecordFilter, RecordPatch, Status};

use super::{alice, bob, seed, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_ownership_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "ownership",
        "list_excludes_foreign_records",
        list_excludes_foreign_records(factory).await,
    ));
    results.push(TestResult::from_result(
        "ownership",
        "foreign_get_is_not_found",
        foreign_get_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "ownership",
        "foreign_update_fields_is_not_found",
        foreign_update_fields_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "ownership",
        "foreign_update_status_is_not_found",
        foreign_update_status_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "ownership",
        "foreign_delete_is_not_found",
        foreign_delete_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "ownership",
        "foreign_error_matches_missing_error",
        foreign_error_matches_missing_error(factory).await,
    ));

    results
}

async fn list_excludes_foreign_records<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mine = seed(&storage, &alice(), Action::Login).await?;
    seed(&storage, &bob(), Action::Logout).await?;
    seed(&storage, &bob(), Action::UploadFile).await?;

    let listed = storage
        .list_for_owner(&alice(), &RecordFilter::default())
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != 1 || listed[0].id != mine.id {
        return Err(format!("expected only alice's record, got {listed:?}"));
    }
    Ok(())
}

async fn foreign_get_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    match storage.get_owned(theirs.id, &alice()).await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!("expected RecordNotFound, got {other:?}")),
    }
}

async fn foreign_update_fields_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    let patch = RecordPatch {
        action: Some(Action::Login),
        metadata: Some(None),
    };
    match storage.update_fields(theirs.id, &alice(), &patch).await {
        Err(StorageError::RecordNotFound { .. }) => {}
        other => return Err(format!("expected RecordNotFound, got {other:?}")),
    }

    let unchanged = storage
        .get_owned(theirs.id, &bob())
        .await
        .map_err(|e| format!("owner get: {e}"))?;
    if unchanged != theirs {
        return Err("foreign patch modified the record".to_string());
    }
    Ok(())
}

async fn foreign_update_status_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    match storage
        .update_status(theirs.id, &alice(), theirs.version, Status::InProgress)
        .await
    {
        Err(StorageError::RecordNotFound { .. }) => {}
        other => return Err(format!("expected RecordNotFound, got {other:?}")),
    }

    let unchanged = storage
        .get_owned(theirs.id, &bob())
        .await
        .map_err(|e| format!("owner get: {e}"))?;
    if unchanged.status != Status::Pending {
        return Err(format!(
            "foreign status write landed: status is {}",
            unchanged.status
        ));
    }
    Ok(())
}

async fn foreign_delete_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    match storage.delete_owned(theirs.id, &alice()).await {
        Err(StorageError::RecordNotFound { .. }) => {}
        other => return Err(format!("expected RecordNotFound, got {other:?}")),
    }
    storage
        .get_owned(theirs.id, &bob())
        .await
        .map_err(|e| format!("record vanished after foreign delete: {e}"))?;
    Ok(())
}

/// The error for someone else's record must be indistinguishable from the
/// error for a record that was never created.
async fn foreign_error_matches_missing_error<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    storage
        .delete_owned(theirs.id, &bob())
        .await
        .map_err(|e| format!("delete: {e}"))?;
    let missing = storage
        .get_owned(theirs.id, &alice())
        .await
        .err()
        .map(|e| e.to_string());

    let storage = factory().await;
    let theirs = seed(&storage, &bob(), Action::Logout).await?;
    let foreign = storage
        .get_owned(theirs.id, &alice())
        .await
        .err()
        .map(|e| e.to_string());

    if missing.is_none() || missing != foreign {
        return Err(format!(
            "missing error {missing:?} differs from foreign error {foreign:?}"
        ));
    }
    Ok(())
}

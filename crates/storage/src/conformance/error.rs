use std::future::Future;

use actlog_core::{Action, RecordFilter, RecordId, RecordPatch, Status};

use super::{alice, seed, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "get_nonexistent",
        get_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_fields_nonexistent",
        update_fields_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_status_nonexistent",
        update_status_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_nonexistent",
        delete_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_then_get_not_found",
        delete_then_get_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_twice_not_found",
        delete_twice_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "list_empty_for_new_owner",
        list_empty_for_new_owner(factory).await,
    ));

    results
}

fn expect_not_found<T: std::fmt::Debug>(
    result: Result<T, StorageError>,
    id: RecordId,
) -> Result<(), String> {
    match result {
        Err(StorageError::RecordNotFound { id: got }) if got == id => Ok(()),
        Err(StorageError::RecordNotFound { id: got }) => {
            Err(format!("expected RecordNotFound for {id}, got id {got}"))
        }
        other => Err(format!("expected RecordNotFound, got {other:?}")),
    }
}

async fn get_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    expect_not_found(storage.get_owned(RecordId(999), &alice()).await, RecordId(999))
}

async fn update_fields_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let patch = RecordPatch {
        action: Some(Action::Logout),
        metadata: None,
    };
    expect_not_found(
        storage.update_fields(RecordId(999), &alice(), &patch).await,
        RecordId(999),
    )
}

async fn update_status_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    expect_not_found(
        storage
            .update_status(RecordId(999), &alice(), 0, Status::InProgress)
            .await,
        RecordId(999),
    )
}

async fn delete_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    expect_not_found(
        storage.delete_owned(RecordId(999), &alice()).await,
        RecordId(999),
    )
}

async fn delete_then_get_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    storage
        .delete_owned(rec.id, &alice())
        .await
        .map_err(|e| format!("delete: {e}"))?;
    expect_not_found(storage.get_owned(rec.id, &alice()).await, rec.id)
}

async fn delete_twice_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    storage
        .delete_owned(rec.id, &alice())
        .await
        .map_err(|e| format!("first delete: {e}"))?;
    expect_not_found(storage.delete_owned(rec.id, &alice()).await, rec.id)
}

async fn list_empty_for_new_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let listed = storage
        .list_for_owner(&alice(), &RecordFilter::default())
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !listed.is_empty() {
        return Err(format!("expected empty list, got {}", listed.len()));
    }
    Ok(())
}

use std::future::Future;

use actlog_core::{Action, RecordFilter, Status};

use super::{alice, bob, draft, seed, TestResult};
use crate::RecordStore;

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "insert_forces_pending_status",
        insert_forces_pending_status(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_binds_owner",
        insert_binds_owner(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_assigns_distinct_ids",
        insert_assigns_distinct_ids(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_round_trips_action_and_metadata",
        insert_round_trips_action_and_metadata(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_accepts_null_metadata",
        insert_accepts_null_metadata(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "list_is_in_insertion_order",
        list_is_in_insertion_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "list_filters_by_action",
        list_filters_by_action(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "list_filters_by_created_at",
        list_filters_by_created_at(factory).await,
    ));

    results
}

async fn insert_forces_pending_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::UploadFile).await?;
    if rec.status != Status::Pending {
        return Err(format!("expected PENDING, got {}", rec.status));
    }
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

async fn insert_binds_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &bob(), Action::Login).await?;
    if rec.owner != bob() {
        return Err(format!("expected owner 'bob', got '{}'", rec.owner));
    }
    Ok(())
}

async fn insert_assigns_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let a = seed(&storage, &alice(), Action::Login).await?;
    let b = seed(&storage, &bob(), Action::Login).await?;
    let c = seed(&storage, &alice(), Action::Logout).await?;
    if a.id == b.id || b.id == c.id || a.id == c.id {
        return Err(format!("ids collide: {}, {}, {}", a.id, b.id, c.id));
    }
    Ok(())
}

async fn insert_round_trips_action_and_metadata<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let created = seed(&storage, &alice(), Action::UploadFile).await?;
    let read = storage
        .get_owned(created.id, &alice())
        .await
        .map_err(|e| format!("get: {e}"))?;
    if read.action != Action::UploadFile {
        return Err(format!("expected UPLOAD_FILE, got {}", read.action));
    }
    if read.metadata != draft(Action::UploadFile).metadata {
        return Err(format!("metadata changed: {:?}", read.metadata));
    }
    if read != created {
        return Err("read differs from insert result".to_string());
    }
    Ok(())
}

async fn insert_accepts_null_metadata<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut d = draft(Action::Logout);
    d.metadata = None;
    let rec = storage
        .insert(&alice(), d)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    if rec.metadata.is_some() {
        return Err(format!("expected no metadata, got {:?}", rec.metadata));
    }
    Ok(())
}

async fn list_is_in_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut expected = Vec::new();
    for action in [Action::Login, Action::UploadFile, Action::Logout] {
        expected.push(seed(&storage, &alice(), action).await?.id);
    }
    let listed: Vec<_> = storage
        .list_for_owner(&alice(), &RecordFilter::default())
        .await
        .map_err(|e| format!("list: {e}"))?
        .into_iter()
        .map(|r| r.id)
        .collect();
    if listed != expected {
        return Err(format!("expected {expected:?}, got {listed:?}"));
    }
    Ok(())
}

async fn list_filters_by_action<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    seed(&storage, &alice(), Action::Login).await?;
    let upload = seed(&storage, &alice(), Action::UploadFile).await?;
    seed(&storage, &bob(), Action::UploadFile).await?;

    let filter = RecordFilter {
        action: Some(Action::UploadFile),
        ..Default::default()
    };
    let listed = storage
        .list_for_owner(&alice(), &filter)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != 1 || listed[0].id != upload.id {
        return Err(format!("expected only record {}, got {listed:?}", upload.id));
    }
    Ok(())
}

async fn list_filters_by_created_at<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;

    let hit = RecordFilter {
        created_at: Some(rec.created_at),
        ..Default::default()
    };
    let listed = storage
        .list_for_owner(&alice(), &hit)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !listed.iter().any(|r| r.id == rec.id) {
        return Err("record missing from created_at match".to_string());
    }

    let miss = RecordFilter {
        created_at: Some(rec.created_at - time::Duration::days(1)),
        ..Default::default()
    };
    let listed = storage
        .list_for_owner(&alice(), &miss)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !listed.is_empty() {
        return Err(format!("expected no records, got {}", listed.len()));
    }
    Ok(())
}

use std::future::Future;

use actlog_core::{Action, RecordPatch, Status};

use super::{alice, seed, TestResult};
use crate::RecordStore;

pub(super) async fn run_field_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "fields",
        "patch_action_only",
        patch_action_only(factory).await,
    ));
    results.push(TestResult::from_result(
        "fields",
        "patch_clears_metadata",
        patch_clears_metadata(factory).await,
    ));
    results.push(TestResult::from_result(
        "fields",
        "patch_preserves_status_and_owner",
        patch_preserves_status_and_owner(factory).await,
    ));
    results.push(TestResult::from_result(
        "fields",
        "empty_patch_keeps_version",
        empty_patch_keeps_version(factory).await,
    ));

    results
}

async fn patch_action_only<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let patch = RecordPatch {
        action: Some(Action::Logout),
        metadata: None,
    };
    let updated = storage
        .update_fields(rec.id, &alice(), &patch)
        .await
        .map_err(|e| format!("update: {e}"))?;
    if updated.action != Action::Logout {
        return Err(format!("expected LOGOUT, got {}", updated.action));
    }
    if updated.metadata != rec.metadata {
        return Err("metadata changed by action-only patch".to_string());
    }
    if updated.version != rec.version + 1 {
        return Err(format!(
            "expected version {}, got {}",
            rec.version + 1,
            updated.version
        ));
    }
    Ok(())
}

async fn patch_clears_metadata<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let patch = RecordPatch {
        action: None,
        metadata: Some(None),
    };
    let updated = storage
        .update_fields(rec.id, &alice(), &patch)
        .await
        .map_err(|e| format!("update: {e}"))?;
    if updated.metadata.is_some() {
        return Err(format!("expected metadata cleared, got {:?}", updated.metadata));
    }
    Ok(())
}

async fn patch_preserves_status_and_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let moved = storage
        .update_status(rec.id, &alice(), rec.version, Status::InProgress)
        .await
        .map_err(|e| format!("update_status: {e}"))?;
    let patch = RecordPatch {
        action: Some(Action::UploadFile),
        metadata: Some(Some(serde_json::json!({"file": "report.pdf"}))),
    };
    let updated = storage
        .update_fields(rec.id, &alice(), &patch)
        .await
        .map_err(|e| format!("update: {e}"))?;
    if updated.status != Status::InProgress {
        return Err(format!("status changed to {}", updated.status));
    }
    if updated.owner != alice() || updated.created_at != moved.created_at {
        return Err("owner or created_at changed by patch".to_string());
    }
    Ok(())
}

async fn empty_patch_keeps_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let rec = seed(&storage, &alice(), Action::Login).await?;
    let updated = storage
        .update_fields(rec.id, &alice(), &RecordPatch::default())
        .await
        .map_err(|e| format!("update: {e}"))?;
    if updated != rec {
        return Err("empty patch modified the record".to_string());
    }
    Ok(())
}

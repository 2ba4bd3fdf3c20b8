use std::future::Future;

use super::{make_record, seed, TestResult};
use crate::{ShapeStore, StorageError};

pub(super) async fn run_write_once_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "write_once",
            "put_then_get_succeeds",
            put_then_get_succeeds(factory).await,
        ),
        TestResult::from_result(
            "write_once",
            "second_put_with_same_content_is_rejected",
            second_put_with_same_content_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "write_once",
            "second_put_with_new_content_is_rejected",
            second_put_with_new_content_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "write_once",
            "rejected_put_leaves_record_unchanged",
            rejected_put_leaves_record_unchanged(factory).await,
        ),
        TestResult::from_result(
            "write_once",
            "duplicate_error_names_the_triple",
            duplicate_error_names_the_triple(factory).await,
        ),
        TestResult::from_result(
            "write_once",
            "same_prop_in_another_version_is_independent",
            same_prop_in_another_version_is_independent(factory).await,
        ),
    ]
}

async fn put_then_get_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    store
        .get("card", "heading", "v1")
        .await
        .map_err(|e| format!("get after put: {e}"))?;
    Ok(())
}

async fn second_put_with_same_content_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let record = seed(&store, "card", "heading", "v1").await?;
    match store.put(record).await {
        Err(StorageError::DuplicateVersionWrite { .. }) => Ok(()),
        Ok(()) => Err("identical second put was accepted".to_string()),
        Err(e) => Err(format!("expected DuplicateVersionWrite, got: {e}")),
    }
}

async fn second_put_with_new_content_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    let changed = make_record("card", "heading", "v1", Some(40))?;
    match store.put(changed).await {
        Err(StorageError::DuplicateVersionWrite { .. }) => Ok(()),
        Ok(()) => Err("overwriting put was accepted".to_string()),
        Err(e) => Err(format!("expected DuplicateVersionWrite, got: {e}")),
    }
}

async fn rejected_put_leaves_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let original = seed(&store, "card", "heading", "v1").await?;
    let changed = make_record("card", "heading", "v1", Some(40))?;
    let _ = store.put(changed).await;

    let stored = store
        .get("card", "heading", "v1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.content_hash != original.content_hash || stored.snapshot != original.snapshot {
        return Err("record changed after a rejected put".to_string());
    }
    Ok(())
}

async fn duplicate_error_names_the_triple<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let record = seed(&store, "card", "heading", "v1").await?;
    match store.put(record).await {
        Err(StorageError::DuplicateVersionWrite {
            component_id,
            prop_name,
            version_id,
        }) => {
            if (component_id.as_str(), prop_name.as_str(), version_id.as_str())
                != ("card", "heading", "v1")
            {
                return Err(format!(
                    "error names {component_id}/{prop_name}@{version_id}, expected card/heading@v1"
                ));
            }
            Ok(())
        }
        other => Err(format!("expected DuplicateVersionWrite, got: {other:?}")),
    }
}

async fn same_prop_in_another_version_is_independent<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "heading", "v2").await?;
    seed(&store, "teaser", "heading", "v1").await?;
    Ok(())
}

use std::future::Future;

use super::{seed, TestResult};
use crate::{ShapeStore, StorageError};

pub(super) async fn run_delete_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "delete",
            "delete_removes_every_record_of_the_version",
            delete_removes_every_record_of_the_version(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_keeps_other_versions",
            delete_keeps_other_versions(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_clears_active_pointer",
            delete_clears_active_pointer(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_unknown_version_fails",
            delete_unknown_version_fails(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "deleted_triple_can_be_written_again",
            deleted_triple_can_be_written_again(factory).await,
        ),
    ]
}

async fn delete_removes_every_record_of_the_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "body", "v1").await?;
    store
        .delete_version("card", "v1")
        .await
        .map_err(|e| format!("delete_version: {e}"))?;

    for prop in ["heading", "body"] {
        match store.get("card", prop, "v1").await {
            Err(StorageError::NotFound { .. }) => {}
            other => return Err(format!("{prop} survived deletion: {other:?}")),
        }
    }
    let versions = store
        .list_versions("card")
        .await
        .map_err(|e| format!("list_versions: {e}"))?;
    if !versions.is_empty() {
        return Err(format!("deleted version still listed: {versions:?}"));
    }
    Ok(())
}

async fn delete_keeps_other_versions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "heading", "v2").await?;
    seed(&store, "teaser", "heading", "v1").await?;
    store
        .delete_version("card", "v1")
        .await
        .map_err(|e| format!("delete_version: {e}"))?;

    store
        .get("card", "heading", "v2")
        .await
        .map_err(|e| format!("card v2 lost: {e}"))?;
    store
        .get("teaser", "heading", "v1")
        .await
        .map_err(|e| format!("teaser v1 lost: {e}"))?;
    Ok(())
}

async fn delete_clears_active_pointer<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "heading", "v2").await?;

    store
        .set_active_version("card", "v1")
        .await
        .map_err(|e| format!("set_active_version: {e}"))?;
    store
        .delete_version("card", "v2")
        .await
        .map_err(|e| format!("delete v2: {e}"))?;
    match store.active_version("card").await {
        Ok(Some(v)) if v == "v1" => {}
        other => return Err(format!("deleting an inactive version moved the pointer: {other:?}")),
    }

    store
        .delete_version("card", "v1")
        .await
        .map_err(|e| format!("delete v1: {e}"))?;
    match store.active_version("card").await {
        Ok(None) => Ok(()),
        other => Err(format!("active version survived its deletion: {other:?}")),
    }
}

async fn delete_unknown_version_fails<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.delete_version("card", "v1").await {
        Err(StorageError::VersionNotFound { .. }) => Ok(()),
        other => Err(format!("expected VersionNotFound, got: {other:?}")),
    }
}

async fn deleted_triple_can_be_written_again<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    store
        .delete_version("card", "v1")
        .await
        .map_err(|e| format!("delete_version: {e}"))?;
    seed(&store, "card", "heading", "v1").await?;
    Ok(())
}

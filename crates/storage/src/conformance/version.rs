use std::future::Future;

use super::{seed, TestResult};
use crate::{ShapeStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Listing
    results.push(TestResult::from_result(
        "version",
        "unknown_component_has_no_versions",
        unknown_component_has_no_versions(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "versions_listed_in_first_write_order",
        versions_listed_in_first_write_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "list_props_is_per_version",
        list_props_is_per_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "list_props_of_unknown_version_fails",
        list_props_of_unknown_version_fails(factory).await,
    ));

    // Active pointer
    results.push(TestResult::from_result(
        "version",
        "no_active_version_by_default",
        no_active_version_by_default(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "set_active_version_is_read_back",
        set_active_version_is_read_back(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "set_unknown_active_version_fails",
        set_unknown_active_version_fails(factory).await,
    ));

    results
}

async fn unknown_component_has_no_versions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let versions = store
        .list_versions("nothing")
        .await
        .map_err(|e| format!("list_versions: {e}"))?;
    if !versions.is_empty() {
        return Err(format!("expected no versions, got {versions:?}"));
    }
    Ok(())
}

async fn versions_listed_in_first_write_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "b").await?;
    seed(&store, "card", "heading", "a").await?;
    seed(&store, "card", "body", "b").await?;
    seed(&store, "card", "heading", "c").await?;
    seed(&store, "teaser", "heading", "z").await?;

    let versions = store
        .list_versions("card")
        .await
        .map_err(|e| format!("list_versions: {e}"))?;
    if versions != ["b", "a", "c"] {
        return Err(format!("expected [b, a, c], got {versions:?}"));
    }
    Ok(())
}

async fn list_props_is_per_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "body", "v1").await?;
    seed(&store, "card", "heading", "v2").await?;

    let v1 = store
        .list_props("card", "v1")
        .await
        .map_err(|e| format!("list_props v1: {e}"))?;
    let v2 = store
        .list_props("card", "v2")
        .await
        .map_err(|e| format!("list_props v2: {e}"))?;
    if v1 != ["body", "heading"] || v2 != ["heading"] {
        return Err(format!("got v1={v1:?} v2={v2:?}"));
    }
    Ok(())
}

async fn list_props_of_unknown_version_fails<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    match store.list_props("card", "v9").await {
        Err(StorageError::VersionNotFound { .. }) => Ok(()),
        other => Err(format!("expected VersionNotFound, got: {other:?}")),
    }
}

async fn no_active_version_by_default<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    match store.active_version("card").await {
        Ok(None) => Ok(()),
        other => Err(format!("expected no active version, got: {other:?}")),
    }
}

async fn set_active_version_is_read_back<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    seed(&store, "card", "heading", "v2").await?;
    for v in ["v2", "v1"] {
        store
            .set_active_version("card", v)
            .await
            .map_err(|e| format!("set_active_version {v}: {e}"))?;
        let active = store
            .active_version("card")
            .await
            .map_err(|e| format!("active_version: {e}"))?;
        if active.as_deref() != Some(v) {
            return Err(format!("expected active {v}, got {active:?}"));
        }
    }
    Ok(())
}

async fn set_unknown_active_version_fails<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    match store.set_active_version("card", "v2").await {
        Err(StorageError::VersionNotFound { .. }) => {}
        other => return Err(format!("expected VersionNotFound, got: {other:?}")),
    }
    match store.active_version("card").await {
        Ok(None) => Ok(()),
        other => Err(format!("failed set changed the active version: {other:?}")),
    }
}

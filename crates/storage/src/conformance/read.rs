use std::future::Future;

use super::{make_record, seed, TestResult};
use crate::{ShapeStore, StorageError};

pub(super) async fn run_read_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "read",
            "get_returns_the_written_record",
            get_returns_the_written_record(factory).await,
        ),
        TestResult::from_result(
            "read",
            "snapshot_deserializes_to_the_storable_shape",
            snapshot_deserializes_to_the_storable_shape(factory).await,
        ),
        TestResult::from_result(
            "read",
            "get_missing_returns_not_found",
            get_missing_returns_not_found(factory).await,
        ),
        TestResult::from_result(
            "read",
            "contains_reflects_writes",
            contains_reflects_writes(factory).await,
        ),
    ]
}

async fn get_returns_the_written_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let record = make_record("card", "heading", "v1", Some(80))?;
    store
        .put(record.clone())
        .await
        .map_err(|e| format!("put: {e}"))?;
    let read = store
        .get("card", "heading", "v1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if read != record {
        return Err(format!("read {read:?}, wrote {record:?}"));
    }
    Ok(())
}

async fn snapshot_deserializes_to_the_storable_shape<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    let storable = store
        .get("card", "heading", "v1")
        .await
        .map_err(|e| format!("get: {e}"))?
        .storable()
        .map_err(|e| format!("snapshot: {e}"))?;
    if storable.field_widget() != "string_textfield" {
        return Err(format!(
            "expected widget string_textfield, got {}",
            storable.field_widget()
        ));
    }
    Ok(())
}

async fn get_missing_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "card", "heading", "v1").await?;
    for (c, p, v) in [
        ("card", "heading", "v2"),
        ("card", "body", "v1"),
        ("teaser", "heading", "v1"),
    ] {
        match store.get(c, p, v).await {
            Err(StorageError::NotFound { .. }) => {}
            Ok(_) => return Err(format!("{c}/{p}@{v} was found")),
            Err(e) => return Err(format!("{c}/{p}@{v}: expected NotFound, got: {e}")),
        }
    }
    Ok(())
}

async fn contains_reflects_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let before = store
        .contains("card", "heading", "v1")
        .await
        .map_err(|e| format!("contains: {e}"))?;
    seed(&store, "card", "heading", "v1").await?;
    let after = store
        .contains("card", "heading", "v1")
        .await
        .map_err(|e| format!("contains: {e}"))?;
    if before || !after {
        return Err(format!("contains was {before} before and {after} after the write"));
    }
    Ok(())
}

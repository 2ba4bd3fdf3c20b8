use std::future::Future;
use std::sync::Arc;

use super::{make_record, TestResult};
use crate::{ShapeStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_puts_exactly_one_wins",
            concurrent_puts_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_puts_different_props_all_succeed",
            concurrent_puts_different_props_all_succeed(factory).await,
        ),
    ]
}

// ── Concurrent writes: exactly one wins ─────────────────────────────────────

/// N tasks each try to write their own content to the same triple. Exactly
/// one put succeeds, the rest get DuplicateVersionWrite, and the stored
/// record is the winner's.
async fn concurrent_puts_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let record = make_record("card", "heading", "v1", Some(10 + i as u64))?;
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let hash = record.content_hash.clone();
            match s.put(record).await {
                Ok(()) => Ok(Some(hash)), // won the race
                Err(StorageError::DuplicateVersionWrite { .. }) => Ok(None), // lost the race
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0usize;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        match outcome {
            Some(hash) => winners.push(hash),
            None => losers += 1,
        }
    }

    if winners.len() != 1 {
        return Err(format!("expected exactly 1 winner, got {}", winners.len()));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }
    let stored = storage
        .get("card", "heading", "v1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.content_hash != winners[0] {
        return Err("stored record is not the winner's".to_string());
    }
    Ok(())
}

// ── Concurrent writes to different props: all succeed ───────────────────────

async fn concurrent_puts_different_props_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let record = make_record("card", &format!("prop-{i}"), "v1", None)?;
        let s = storage.clone();
        handles.push(tokio::spawn(async move { s.put(record).await }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    let props = storage
        .list_props("card", "v1")
        .await
        .map_err(|e| format!("list_props: {e}"))?;
    if props.len() != N {
        return Err(format!("expected {N} props, got {}", props.len()));
    }
    let versions = storage
        .list_versions("card")
        .await
        .map_err(|e| format!("list_versions: {e}"))?;
    if versions != ["v1"] {
        return Err(format!("expected a single version, got {versions:?}"));
    }
    Ok(())
}

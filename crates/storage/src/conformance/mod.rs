//! Conformance test suite for `ShapeStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `ShapeStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Write-once**: a triple is written at most once, whatever its content
//! - **Reads**: records come back unchanged, missing triples are `NotFound`
//! - **Versions**: first-write ordering, per-version prop listing, the
//!   active version pointer
//! - **Deletion**: whole-version removal and its effect on the active pointer
//! - **Concurrency**: exactly one of N racing writers wins a triple
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use propshape_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async { open_test_sqlite_store().await }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod delete;
mod read;
mod version;
mod write_once;

use std::fmt;
use std::future::Future;

use propshape_core::{normalize, Resolver};
use serde_json::json;

use crate::record::VersionedShapeRecord;
use crate::ShapeStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "write_once", "read", "version").
    pub category: String,
    /// Test name (e.g. "second_put_is_rejected").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: ShapeStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(write_once::run_write_once_tests(&factory).await);
    results.extend(read::run_read_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(delete::run_delete_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// A record for a plain string prop, optionally capped at `max_length`.
///
/// Different `max_length` values give records with different content.
fn make_record(
    component_id: &str,
    prop_name: &str,
    version_id: &str,
    max_length: Option<u64>,
) -> Result<VersionedShapeRecord, String> {
    let raw = match max_length {
        Some(n) => json!({ "type": "string", "maxLength": n }),
        None => json!({ "type": "string" }),
    };
    let shape = normalize(&raw).map_err(|e| format!("normalize: {e}"))?;
    let storable = Resolver::default()
        .resolve(&shape)
        .map_err(|e| format!("resolve: {e}"))?
        .ok_or_else(|| "string shape has no storable mapping".to_string())?;
    VersionedShapeRecord::new(component_id, prop_name, version_id, &storable)
        .map_err(|e| format!("record: {e}"))
}

/// Store `make_record(component_id, prop_name, version_id, None)`.
async fn seed<S: ShapeStore>(
    store: &S,
    component_id: &str,
    prop_name: &str,
    version_id: &str,
) -> Result<VersionedShapeRecord, String> {
    let record = make_record(component_id, prop_name, version_id, None)?;
    store
        .put(record.clone())
        .await
        .map_err(|e| format!("seed put {component_id}/{prop_name}@{version_id}: {e}"))?;
    Ok(record)
}

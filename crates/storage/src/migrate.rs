//! Backfill of versioned records for versions that predate a prop.
//!
//! When resolution learns to map shapes it used to leave unbound, versions
//! stored before that change lack records for those props. Existing records
//! are never rewritten: only missing ones are resolved and written.

use std::collections::BTreeMap;

use propshape_core::{PropShape, Resolver};
use serde::Serialize;
use tracing::{debug, info};

use crate::record::VersionedShapeRecord;
use crate::traits::ShapeStore;
use crate::versioning::VersioningError;

/// Counts from one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Records written.
    pub created: usize,
    /// Records that already existed and were left untouched.
    pub skipped: usize,
    /// Props that still resolve to no storage mapping.
    pub unbound: usize,
}

/// One stored version of a component and the prop shapes it was made of.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionShapes {
    pub version_id: String,
    pub shapes: BTreeMap<String, PropShape>,
}

/// Write the records missing from each version in `versions`.
pub async fn backfill_missing_records<S: ShapeStore>(
    store: &S,
    resolver: &Resolver,
    component_id: &str,
    versions: &[VersionShapes],
) -> Result<BackfillReport, VersioningError> {
    let mut report = BackfillReport::default();
    for version in versions {
        for (prop, shape) in &version.shapes {
            if store
                .contains(component_id, prop, &version.version_id)
                .await?
            {
                report.skipped += 1;
                continue;
            }
            let resolved = resolver
                .resolve(shape)
                .map_err(|source| VersioningError::Invariant {
                    prop: prop.clone(),
                    source,
                })?;
            let Some(storable) = resolved else {
                report.unbound += 1;
                continue;
            };
            let record =
                VersionedShapeRecord::new(component_id, prop, &version.version_id, &storable)?;
            store.put(record).await?;
            debug!(
                component_id,
                prop_name = %prop,
                version_id = %version.version_id,
                "backfilled versioned shape record"
            );
            report.created += 1;
        }
    }
    info!(
        component_id,
        created = report.created,
        skipped = report.skipped,
        unbound = report.unbound,
        "backfill finished"
    );
    Ok(report)
}

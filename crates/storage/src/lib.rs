//! propshape-storage: versioned persistence of storable prop shapes.
//!
//! - [`ShapeStore`] -- the write-once record store contract
//! - [`MemoryShapeStore`] -- an in-process backend
//! - [`conformance`] -- a backend-agnostic test suite for `ShapeStore`
//! - [`ComponentVersioner`] -- resolves and stores component versions
//! - [`backfill_missing_records`] -- fills records missing from old versions

pub mod conformance;
mod error;
mod memory;
mod migrate;
mod record;
mod traits;
mod versioning;

pub use error::StorageError;
pub use memory::MemoryShapeStore;
pub use migrate::{backfill_missing_records, BackfillReport, VersionShapes};
pub use record::{RecordKey, VersionedShapeRecord};
pub use traits::ShapeStore;
pub use versioning::{
    ComponentSource, ComponentVersion, ComponentVersioner, ResolvedComponent, VersioningError,
};

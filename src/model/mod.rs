//! Canonical record types shared across the pipeline.

mod dataset;
mod finding;

pub use dataset::{DatasetMetadata, VulnerabilityDataset};
pub use finding::{Category, Finding, Severity, Tool};

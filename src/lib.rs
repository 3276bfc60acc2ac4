//! vulneval - Normalization & Evaluation Engine
//!
//! vulneval reconciles heterogeneous security-scan reports into one canonical
//! vulnerability dataset, and scores generated policy documents against
//! reference policies.
//!
//! ## Pipeline
//!
//! 1. **Normalize**: per-tool adapters parse raw SAST/SCA/DAST reports into
//!    canonical findings, which are deduplicated and merged across tools.
//! 2. **Match**: each model's generated policy collection is paired with the
//!    reference collection by control identifier, with positional fallback.
//! 3. **Score**: every pair gets lexical overlap and sequence-similarity
//!    scores, and optionally a five-criterion verdict from a rubric judge.
//! 4. **Aggregate**: per-model summary statistics over all scored pairs.

pub mod config;
pub mod evaluate;
pub mod model;
pub mod policy;
pub mod report;
pub mod score;

pub use config::Config;

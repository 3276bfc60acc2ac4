//! Policy collections and generated-to-reference matching.

mod collection;
mod matcher;

pub use collection::{PolicyCollection, PolicyRecord, REFERENCE_MODEL};
pub use matcher::{match_collections, MatchMethod, MatchOutcome, PolicyPair};

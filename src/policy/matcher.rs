//! Two-tier matching of a generated collection against the reference set.
//!
//! Primary key is the control identifier (trimmed, case-insensitive); every
//! reference is claimable once. Generated records with no usable or unknown
//! identifier fall back to positional matching: the k-th unmatched generated
//! record pairs with the k-th unused reference, both in collection order.
//! Not every generation model reliably echoes the control identifier it was
//! prompted with, so pure identifier matching would undercount.

use std::collections::HashMap;

use serde::Serialize;

use super::{PolicyCollection, PolicyRecord};

/// How a pair was formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ControlId,
    Position,
}

/// A matched (generated, reference) tuple
#[derive(Debug, Clone)]
pub struct PolicyPair {
    pub generated: PolicyRecord,
    pub reference: PolicyRecord,
    pub method: MatchMethod,
}

impl PolicyPair {
    /// Label used in score records and logs
    pub fn label(&self, index: usize) -> String {
        self.generated
            .control_id
            .as_deref()
            .or(self.reference.control_id.as_deref())
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| format!("index_{index}"))
    }
}

/// Matcher output: ordered pairs plus generated records that found no
/// reference. Unmatched records are excluded from scoring denominators.
#[derive(Debug)]
pub struct MatchOutcome {
    pub pairs: Vec<PolicyPair>,
    pub unmatched: Vec<PolicyRecord>,
}

/// Pair a generated collection with the reference collection.
pub fn match_collections(
    generated: &PolicyCollection,
    reference: &PolicyCollection,
) -> MatchOutcome {
    // First claimant wins each reference
    let mut ref_by_key: HashMap<String, usize> = HashMap::new();
    for (i, record) in reference.policies.iter().enumerate() {
        if let Some(key) = record.match_key() {
            ref_by_key.entry(key).or_insert(i);
        }
    }

    let mut ref_used = vec![false; reference.policies.len()];
    // (generated index, reference index or pending-positional)
    let mut id_matched: Vec<(usize, usize)> = Vec::new();
    let mut positional_gen: Vec<usize> = Vec::new();

    for (gi, record) in generated.policies.iter().enumerate() {
        let claimed = record
            .match_key()
            .and_then(|key| ref_by_key.get(&key).copied())
            .filter(|&ri| !ref_used[ri]);

        match claimed {
            Some(ri) => {
                ref_used[ri] = true;
                id_matched.push((gi, ri));
            }
            None => positional_gen.push(gi),
        }
    }

    // k-th unmatched generated record pairs with k-th unused reference
    let unused_refs: Vec<usize> = (0..reference.policies.len())
        .filter(|&ri| !ref_used[ri])
        .collect();

    let mut pair_for_gen: HashMap<usize, (usize, MatchMethod)> = id_matched
        .iter()
        .map(|&(gi, ri)| (gi, (ri, MatchMethod::ControlId)))
        .collect();

    let mut unmatched = Vec::new();
    for (k, &gi) in positional_gen.iter().enumerate() {
        match unused_refs.get(k) {
            Some(&ri) => {
                pair_for_gen.insert(gi, (ri, MatchMethod::Position));
            }
            None => {
                tracing::warn!(
                    "no reference for generated policy {} of model {}; excluded from scoring",
                    generated.policies[gi]
                        .control_id
                        .as_deref()
                        .unwrap_or("<no control id>"),
                    generated.model
                );
                unmatched.push(generated.policies[gi].clone());
            }
        }
    }

    // Emit pairs in generated-collection order
    let pairs = generated
        .policies
        .iter()
        .enumerate()
        .filter_map(|(gi, record)| {
            pair_for_gen.get(&gi).map(|&(ri, method)| PolicyPair {
                generated: record.clone(),
                reference: reference.policies[ri].clone(),
                method,
            })
        })
        .collect();

    MatchOutcome { pairs, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(control_id: Option<&str>, policy: &str) -> PolicyRecord {
        PolicyRecord {
            control_id: control_id.map(|s| s.to_string()),
            policy: policy.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn collection(model: &str, records: Vec<PolicyRecord>) -> PolicyCollection {
        PolicyCollection::new(model, records)
    }

    #[test]
    fn test_all_identifiers_match_no_positional() {
        let generated = collection(
            "m",
            vec![record(Some("A.5.1"), "g1"), record(Some(" a.5.2 "), "g2")],
        );
        let reference = collection(
            "reference",
            vec![record(Some("A.5.2"), "r2"), record(Some("A.5.1"), "r1")],
        );

        let outcome = match_collections(&generated, &reference);
        assert_eq!(outcome.pairs.len(), 2);
        assert!(outcome.unmatched.is_empty());
        assert!(outcome
            .pairs
            .iter()
            .all(|p| p.method == MatchMethod::ControlId));
        assert_eq!(outcome.pairs[0].reference.policy, "r1");
        assert_eq!(outcome.pairs[1].reference.policy, "r2");
    }

    #[test]
    fn test_positional_fallback() {
        let generated = collection(
            "m",
            vec![record(None, "g1"), record(Some("A.9.9"), "g2")],
        );
        let reference = collection(
            "reference",
            vec![record(Some("A.5.1"), "r1"), record(Some("A.5.2"), "r2")],
        );

        let outcome = match_collections(&generated, &reference);
        assert_eq!(outcome.pairs.len(), 2);
        assert!(outcome
            .pairs
            .iter()
            .all(|p| p.method == MatchMethod::Position));
        // k-th unmatched generated pairs with k-th unused reference
        assert_eq!(outcome.pairs[0].reference.policy, "r1");
        assert_eq!(outcome.pairs[1].reference.policy, "r2");
    }

    #[test]
    fn test_excess_generated_records_are_unmatched() {
        // {A,B,C} against {A,C}: 2 identifier matches, 1 unmatched, 0 positional
        let generated = collection(
            "m",
            vec![
                record(Some("A"), "ga"),
                record(Some("B"), "gb"),
                record(Some("C"), "gc"),
            ],
        );
        let reference = collection(
            "reference",
            vec![record(Some("A"), "ra"), record(Some("C"), "rc")],
        );

        let outcome = match_collections(&generated, &reference);
        assert_eq!(outcome.pairs.len(), 2);
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.unmatched[0].control_id.as_deref(), Some("B"));
        assert_eq!(
            outcome
                .pairs
                .iter()
                .filter(|p| p.method == MatchMethod::Position)
                .count(),
            0
        );
    }

    #[test]
    fn test_reference_claimed_once() {
        let generated = collection(
            "m",
            vec![record(Some("A"), "g1"), record(Some("A"), "g2")],
        );
        let reference = collection("reference", vec![record(Some("A"), "ra")]);

        let outcome = match_collections(&generated, &reference);
        // First claimant wins; the duplicate falls to positional and finds
        // no unused reference
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].generated.policy, "g1");
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[test]
    fn test_pair_label() {
        let pair = PolicyPair {
            generated: record(None, "g"),
            reference: record(Some("A.5.1"), "r"),
            method: MatchMethod::Position,
        };
        assert_eq!(pair.label(3), "A.5.1");

        let anon = PolicyPair {
            generated: record(None, "g"),
            reference: record(None, "r"),
            method: MatchMethod::Position,
        };
        assert_eq!(anon.label(3), "index_3");
    }
}

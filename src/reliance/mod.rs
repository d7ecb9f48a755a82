//! Rule reliance analysis
//!
//! A rule `b` relies on a rule `a` if applying `a` can create a match for the
//! body of `b` that did not exist before. The analyzer decides this with a
//! piece-unifier search between the head of `a` and the positive body of
//! `b`, after renaming both rules apart. It also computes negative reliances
//! (`a` may make a negated body literal of `b` true), which drive
//! stratification.

use fnv::FnvHashMap;
use tracing::trace;

use crate::term::Rule;

mod graph;
pub mod renamer;
mod unifier;

pub use graph::RelianceGraph;
pub use renamer::{rename_rule, restore_rule, VariableRenamer};
pub use unifier::RelianceWitness;

/// Renaming applied to the producing rule before comparison
const PRODUCER: VariableRenamer = VariableRenamer::new(1);
/// Renaming applied to the consuming rule before comparison
const CONSUMER: VariableRenamer = VariableRenamer::new(2);

/// Pairwise reliance checks with memoization
///
/// Results are cached per pair of structurally equal rules, so analyzing the
/// same rule set twice only pays once.
#[derive(Debug, Default)]
pub struct RelianceAnalyzer {
    positive: FnvHashMap<(Rule, Rule), Option<RelianceWitness>>,
    negative: FnvHashMap<(Rule, Rule), bool>,
}

impl RelianceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The witness showing that `b` may rely on `a`, if any
    ///
    /// Variables in the witness carry the suffix `.1` for `a` and `.2` for `b`.
    pub fn reliance(&mut self, a: &Rule, b: &Rule) -> Option<RelianceWitness> {
        let key = (a.clone(), b.clone());
        if let Some(cached) = self.positive.get(&key) {
            return cached.clone();
        }
        let witness = unifier::find_positive(
            &PRODUCER.rename(a),
            &CONSUMER.rename(b),
        );
        if let Some(ref w) = witness {
            trace!(producer = %a, consumer = %b, witness = %w, "positive reliance");
        }
        self.positive.insert(key, witness.clone());
        witness
    }

    /// Check whether an application of `a` may create a new match for the body of `b`
    pub fn may_rely_on(&mut self, a: &Rule, b: &Rule) -> bool {
        self.reliance(a, b).is_some()
    }

    /// Check whether `a` may derive a fact matching a negated body literal of `b`
    pub fn restrains(&mut self, a: &Rule, b: &Rule) -> bool {
        let key = (a.clone(), b.clone());
        if let Some(&cached) = self.negative.get(&key) {
            return cached;
        }
        let result = unifier::find_negative(
            &PRODUCER.rename(a),
            &CONSUMER.rename(b),
        );
        if result {
            trace!(producer = %a, consumer = %b, "negative reliance");
        }
        self.negative.insert(key, result);
        result
    }

    /// Build the reliance graph of a rule set
    pub fn graph(&mut self, rules: &[Rule]) -> RelianceGraph {
        let mut graph = RelianceGraph::new(rules.to_vec());
        for (i, a) in rules.iter().enumerate() {
            for (j, b) in rules.iter().enumerate() {
                if self.may_rely_on(a, b) {
                    graph.add_positive(i, j);
                }
                if b.has_negation() && self.restrains(a, b) {
                    graph.add_negative(i, j);
                }
            }
        }
        graph
    }

    /// Number of cached pair results
    pub fn cache_len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn clear(&mut self) {
        self.positive.clear();
        self.negative.clear();
    }
}

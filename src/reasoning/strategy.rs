//! Chase strategy trait and statistics

use std::time::Duration;

use crate::config::ChaseAlgorithm;
use crate::store::FactStore;
use crate::term::{Bindings, Rule};

/// A rule together with a match of its positive body
#[derive(Debug, Clone, Copy)]
pub struct Trigger<'a> {
    /// Position of the rule in the program
    pub rule_index: usize,
    pub rule: &'a Rule,
    /// Bindings of every universal variable of the rule
    pub bindings: &'a Bindings,
}

/// Statistics about a chase run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaseStats {
    /// Number of strata evaluated
    pub strata: usize,
    /// Number of rounds executed across all strata
    pub rounds: usize,
    /// Triggers whose negated literals and head were checked
    pub triggers_considered: usize,
    /// Triggers that fired
    pub triggers_applied: usize,
    /// Triggers skipped because their head was already satisfied
    pub triggers_satisfied: usize,
    /// Triggers skipped because a negated literal was true
    pub triggers_blocked: usize,
    /// New facts added by rule applications
    pub facts_derived: usize,
    /// Rule evaluations skipped thanks to reliances
    pub rules_skipped: usize,
    /// Witness terms introduced for existential variables
    pub nulls_introduced: usize,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// How a chase variant handles a trigger
///
/// Implementations decide whether a trigger fires and what witnesses its
/// existential variables receive:
/// - Restricted: fire only if the head is not yet satisfied, fresh nulls
/// - Skolem: always fire, deterministic skolem terms
pub trait ChaseStrategy: Send {
    /// Name of this strategy
    fn name(&self) -> &str;

    /// The variant this strategy implements
    fn algorithm(&self) -> ChaseAlgorithm;

    /// Extend the trigger's bindings with witnesses for the existential
    /// variables, or return `None` to skip the trigger
    fn instantiate(&mut self, trigger: &Trigger<'_>, store: &FactStore) -> Option<Bindings>;

    /// Number of witness terms created so far
    fn nulls_introduced(&self) -> usize;

    /// Reset any internal state
    fn reset(&mut self) {}
}

/// Create the strategy for a chase variant
pub fn strategy_for(algorithm: ChaseAlgorithm) -> Box<dyn ChaseStrategy> {
    match algorithm {
        ChaseAlgorithm::Restricted => Box::new(super::RestrictedChase::new()),
        ChaseAlgorithm::Skolem => Box::new(super::SkolemChase::new()),
    }
}

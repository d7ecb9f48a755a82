//! Skolem chase
//!
//! Every trigger fires. An existential variable is replaced by a skolem term
//! determined by the rule, the variable and the values of the rule frontier,
//! so repeated derivations of the same consequence produce the same facts.

use fnv::FnvHashMap;

use crate::config::ChaseAlgorithm;
use crate::store::FactStore;
use crate::term::{substitute, Bindings, Rule, Term};

use super::strategy::{ChaseStrategy, Trigger};

type SkolemKey = (usize, Term, Vec<Term>);

/// Interning table of skolem terms
#[derive(Debug, Clone, Default)]
pub struct SkolemTable {
    terms: FnvHashMap<SkolemKey, Term>,
}

impl SkolemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The skolem term for `(rule_index, var, frontier)`, created on first use
    pub fn term(&mut self, rule_index: usize, var: &Term, frontier: Vec<Term>) -> Term {
        let next = self.terms.len();
        self.terms
            .entry((rule_index, var.clone(), frontier))
            .or_insert_with(|| Term::NamedNull(format!("sk{}", next).into()))
            .clone()
    }

    /// Extend body bindings of rule `rule_index` with skolem terms for its existentials
    pub fn instantiate(&mut self, rule_index: usize, rule: &Rule, bindings: &Bindings) -> Bindings {
        let frontier: Vec<Term> = rule
            .frontier()
            .iter()
            .map(|v| substitute(v, bindings))
            .collect();
        let mut extended = bindings.clone();
        for var in rule.existential_variables() {
            let term = self.term(rule_index, &var, frontier.clone());
            extended.insert(var, term);
        }
        extended
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Skolem chase strategy
#[derive(Debug, Default)]
pub struct SkolemChase {
    table: SkolemTable,
}

impl SkolemChase {
    pub fn new() -> Self {
        Self::default()
    }

    /// The skolem terms created so far
    pub fn table(&self) -> &SkolemTable {
        &self.table
    }

    pub fn into_table(self) -> SkolemTable {
        self.table
    }
}

impl ChaseStrategy for SkolemChase {
    fn name(&self) -> &str {
        "skolem"
    }

    fn algorithm(&self) -> ChaseAlgorithm {
        ChaseAlgorithm::Skolem
    }

    fn instantiate(&mut self, trigger: &Trigger<'_>, _store: &FactStore) -> Option<Bindings> {
        Some(
            self.table
                .instantiate(trigger.rule_index, trigger.rule, trigger.bindings),
        )
    }

    fn nulls_introduced(&self) -> usize {
        self.table.len()
    }

    fn reset(&mut self) {
        self.table = SkolemTable::new();
    }
}

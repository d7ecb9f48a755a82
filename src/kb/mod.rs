//! Knowledge base: facts, rules and data sources
//!
//! The knowledge base owns the input of a reasoning session. It tracks which
//! predicates are supplied from outside (facts and data sources) and which are
//! derived by rule heads, and checks the EDB/IDB separation lazily, when a
//! reasoner asks for the program to materialize.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use fnv::FnvHashMap;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::config::SeparationPolicy;
use crate::core::DataSource;
use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::term::{Literal, Predicate, Rule, Term};

mod source;

pub use source::InMemoryDataSource;
use source::rows_to_facts;

/// Suffix of the auxiliary predicate holding supplied facts under the rewrite policy
pub const EDB_SUFFIX: &str = "__edb";

/// How a predicate is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateRole {
    /// Supplied by facts or data sources only, or only read by rules
    Extensional,
    /// Derived by some rule head only
    Intensional,
    /// Both supplied and derived
    Mixed,
}

impl fmt::Display for PredicateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredicateRole::Extensional => "EXTENSIONAL",
            PredicateRole::Intensional => "INTENSIONAL",
            PredicateRole::Mixed => "MIXED",
        };
        f.write_str(name)
    }
}

/// Facts and rules ready for materialization
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub facts: Vec<Literal>,
    pub rules: Vec<Rule>,
}

/// A knowledge base of facts, rules and data sources
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    facts: IndexSet<Literal>,
    rules: IndexSet<Rule>,
    sources: IndexMap<Predicate, Vec<Arc<dyn DataSource>>>,
    arities: FnvHashMap<Arc<str>, usize>,
    sealed: bool,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_mutable(&self, operation: &str) -> ChaseResult<()> {
        if self.sealed {
            return Err(ChaseError::new(
                ErrorCode::IllegalReasonerState,
                format!(
                    "cannot {} while the knowledge base is held by a reasoner",
                    operation
                ),
            )
            .with_hint("reset the reasoner before changing its knowledge base"));
        }
        Ok(())
    }

    fn check_arity(&self, predicate: &Predicate) -> ChaseResult<()> {
        match self.arities.get(predicate.name()) {
            Some(&arity) if arity != predicate.arity() => Err(ChaseError::arity_mismatch(
                predicate.name(),
                arity,
                predicate.arity(),
            )),
            _ => Ok(()),
        }
    }

    fn register_arity(&mut self, predicate: &Predicate) {
        self.arities
            .entry(Arc::from(predicate.name()))
            .or_insert(predicate.arity());
    }

    fn rebuild_arities(&mut self) {
        let mut arities = FnvHashMap::default();
        let literals = self
            .facts
            .iter()
            .chain(self.rules.iter().flat_map(|r| r.head().iter().chain(r.body())));
        for predicate in literals
            .map(Literal::predicate)
            .chain(self.sources.keys())
        {
            arities
                .entry(Arc::from(predicate.name()))
                .or_insert(predicate.arity());
        }
        self.arities = arities;
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a fact; returns false if it was already present
    pub fn add_fact(&mut self, fact: Literal) -> ChaseResult<bool> {
        self.ensure_mutable("add a fact")?;
        if fact.is_negated() || !fact.arguments().iter().all(|t| matches!(t, Term::Constant(_))) {
            return Err(ChaseError::invalid_argument(format!(
                "{} is not a fact: facts are positive and contain only constants",
                fact
            )));
        }
        self.check_arity(fact.predicate())?;
        self.register_arity(fact.predicate());
        Ok(self.facts.insert(fact))
    }

    /// Add several facts; returns how many were new
    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = Literal>) -> ChaseResult<usize> {
        let mut added = 0;
        for fact in facts {
            if self.add_fact(fact)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Add a rule; returns false if a structurally equal rule was already present
    pub fn add_rule(&mut self, rule: Rule) -> ChaseResult<bool> {
        self.ensure_mutable("add a rule")?;
        for literal in rule.head().iter().chain(rule.body()) {
            self.check_arity(literal.predicate())?;
        }
        for literal in rule.head().iter().chain(rule.body()) {
            self.register_arity(literal.predicate());
        }
        Ok(self.rules.insert(rule))
    }

    /// Add several rules; returns how many were new
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> ChaseResult<usize> {
        let mut added = 0;
        for rule in rules {
            if self.add_rule(rule)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Bind a data source to a predicate
    pub fn add_data_source(
        &mut self,
        predicate: Predicate,
        source: Arc<dyn DataSource>,
    ) -> ChaseResult<()> {
        self.ensure_mutable("add a data source")?;
        self.check_arity(&predicate)?;
        self.register_arity(&predicate);
        debug!(predicate = %predicate, source = source.name(), "bound data source");
        self.sources.entry(predicate).or_default().push(source);
        Ok(())
    }

    /// Remove a fact; returns false if it was not present
    pub fn remove_fact(&mut self, fact: &Literal) -> ChaseResult<bool> {
        self.ensure_mutable("remove a fact")?;
        let removed = self.facts.shift_remove(fact);
        if removed {
            self.rebuild_arities();
        }
        Ok(removed)
    }

    /// Remove a rule; returns false if it was not present
    pub fn remove_rule(&mut self, rule: &Rule) -> ChaseResult<bool> {
        self.ensure_mutable("remove a rule")?;
        let removed = self.rules.shift_remove(rule);
        if removed {
            self.rebuild_arities();
        }
        Ok(removed)
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn unseal(&mut self) {
        self.sealed = false;
    }

    /// Check whether a reasoner currently holds this knowledge base
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Facts in insertion order
    pub fn facts(&self) -> impl Iterator<Item = &Literal> {
        self.facts.iter()
    }

    /// Rules in insertion order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Data sources with the predicate each one is bound to
    pub fn data_sources(&self) -> impl Iterator<Item = (&Predicate, &dyn DataSource)> {
        self.sources
            .iter()
            .flat_map(|(p, sources)| sources.iter().map(move |s| (p, s.as_ref())))
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.rules.is_empty() && self.sources.is_empty()
    }

    pub fn has_negation(&self) -> bool {
        self.rules.iter().any(Rule::has_negation)
    }

    /// Every predicate mentioned by a fact, rule or data source
    pub fn predicates(&self) -> BTreeSet<Predicate> {
        self.facts
            .iter()
            .chain(self.rules.iter().flat_map(|r| r.head().iter().chain(r.body())))
            .map(|l| l.predicate().clone())
            .chain(self.sources.keys().cloned())
            .collect()
    }

    fn is_supplied(&self, predicate: &Predicate) -> bool {
        self.sources.contains_key(predicate)
            || self.facts.iter().any(|f| f.predicate() == predicate)
    }

    fn is_derived(&self, predicate: &Predicate) -> bool {
        self.rules
            .iter()
            .flat_map(|r| r.head())
            .any(|l| l.predicate() == predicate)
    }

    /// The role of a predicate, or `None` if nothing mentions it
    pub fn predicate_role(&self, predicate: &Predicate) -> Option<PredicateRole> {
        match (self.is_supplied(predicate), self.is_derived(predicate)) {
            (true, true) => Some(PredicateRole::Mixed),
            (false, true) => Some(PredicateRole::Intensional),
            (true, false) => Some(PredicateRole::Extensional),
            (false, false) => self
                .rules
                .iter()
                .flat_map(|r| r.body())
                .any(|l| l.predicate() == predicate)
                .then_some(PredicateRole::Extensional),
        }
    }

    /// Predicates that are both supplied and derived, sorted
    pub fn mixed_predicates(&self) -> Vec<Predicate> {
        let derived: BTreeSet<&Predicate> = self
            .rules
            .iter()
            .flat_map(|r| r.head())
            .map(Literal::predicate)
            .collect();
        let supplied: BTreeSet<&Predicate> = self
            .facts
            .iter()
            .map(Literal::predicate)
            .chain(self.sources.keys())
            .collect();
        derived.intersection(&supplied).map(|p| (*p).clone()).collect()
    }

    /// Check EDB/IDB separation under a policy
    pub fn check_separation(&self, policy: SeparationPolicy) -> ChaseResult<()> {
        let mixed = self.mixed_predicates();
        if mixed.is_empty() {
            return Ok(());
        }
        match policy {
            SeparationPolicy::Reject => {
                let names: Vec<String> = mixed.iter().map(|p| p.to_string()).collect();
                warn!(predicates = ?names, "EDB/IDB separation violated");
                Err(ChaseError::separation(&names))
            }
            SeparationPolicy::Merge | SeparationPolicy::Rewrite => {
                debug!(count = mixed.len(), ?policy, "accepting mixed predicates");
                Ok(())
            }
        }
    }

    /// Load data sources and apply the separation policy
    ///
    /// Under `Rewrite`, supplied facts of a mixed predicate `p` are moved to
    /// `p__edb` and a rule `p(?x1, ..) :- p__edb(?x1, ..)` is added.
    pub fn prepare(&self, policy: SeparationPolicy) -> ChaseResult<Program> {
        self.check_separation(policy)?;

        let mut facts: IndexSet<Literal> = self.facts.clone();
        for (predicate, sources) in &self.sources {
            for source in sources {
                let rows = source.load(predicate).map_err(|e| {
                    e.with_context("source", source.name())
                        .with_context("predicate", predicate.to_string())
                })?;
                let loaded = rows_to_facts(source.as_ref(), predicate, rows)?;
                debug!(predicate = %predicate, source = source.name(), rows = loaded.len(), "loaded data source");
                facts.extend(loaded);
            }
        }

        let mut rules: Vec<Rule> = self.rules.iter().cloned().collect();
        if policy == SeparationPolicy::Rewrite {
            for predicate in self.mixed_predicates() {
                let auxiliary = self.auxiliary_predicate(&predicate)?;
                facts = facts
                    .into_iter()
                    .map(|f| {
                        if f.predicate() == &predicate {
                            Literal::from_row(auxiliary.clone(), f.arguments().to_vec())
                        } else {
                            f
                        }
                    })
                    .collect();
                rules.push(bridging_rule(&predicate, &auxiliary)?);
            }
        }

        Ok(Program {
            facts: facts.into_iter().collect(),
            rules,
        })
    }

    fn auxiliary_predicate(&self, predicate: &Predicate) -> ChaseResult<Predicate> {
        let mut name = format!("{}{}", predicate.name(), EDB_SUFFIX);
        while self.arities.contains_key(name.as_str()) {
            name.push('_');
        }
        Predicate::new(name, predicate.arity())
    }
}

/// `p(?x1, .., ?xn) :- aux(?x1, .., ?xn)`
fn bridging_rule(predicate: &Predicate, auxiliary: &Predicate) -> ChaseResult<Rule> {
    let vars = (1..=predicate.arity())
        .map(|i| Term::universal(format!("x{}", i)))
        .collect::<ChaseResult<Vec<_>>>()?;
    Rule::new(
        vec![Literal::positive(predicate.clone(), vars.clone())?],
        vec![Literal::positive(auxiliary.clone(), vars)?],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> Term {
        Term::constant(name).unwrap()
    }

    fn v(name: &str) -> Term {
        Term::universal(name).unwrap()
    }

    fn atom(name: &str, args: Vec<Term>) -> Literal {
        Literal::atom(name, args).unwrap()
    }

    fn rule(head: Vec<Literal>, body: Vec<Literal>) -> Rule {
        Rule::new(head, body).unwrap()
    }

    fn mixed_kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_fact(atom("p", vec![c("a")])).unwrap();
        kb.add_fact(atom("q", vec![c("b")])).unwrap();
        kb.add_rule(rule(vec![atom("p", vec![v("x")])], vec![atom("q", vec![v("x")])]))
            .unwrap();
        kb
    }

    #[test]
    fn test_set_semantics_and_order() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.add_fact(atom("p", vec![c("b")])).unwrap());
        assert!(kb.add_fact(atom("p", vec![c("a")])).unwrap());
        assert!(!kb.add_fact(atom("p", vec![c("b")])).unwrap());
        let names: Vec<String> = kb.facts().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["p(b)", "p(a)"]);
    }

    #[test]
    fn test_fact_must_be_ground_constants() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.add_fact(atom("p", vec![v("x")])).is_err());
        assert!(kb.add_fact(atom("p", vec![Term::null("n").unwrap()])).is_err());
    }

    #[test]
    fn test_arity_consistency() {
        let mut kb = KnowledgeBase::new();
        kb.add_fact(atom("p", vec![c("a")])).unwrap();
        let err = kb.add_fact(atom("p", vec![c("a"), c("b")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityMismatch);

        let bad = rule(vec![atom("q", vec![v("x")])], vec![atom("p", vec![v("x"), v("y")])]);
        assert!(kb.add_rule(bad).is_err());

        kb.remove_fact(&atom("p", vec![c("a")])).unwrap();
        assert!(kb.add_fact(atom("p", vec![c("a"), c("b")])).is_ok());
    }

    #[test]
    fn test_predicate_roles() {
        let kb = mixed_kb();
        let p = Predicate::new("p", 1).unwrap();
        let q = Predicate::new("q", 1).unwrap();
        assert_eq!(kb.predicate_role(&p), Some(PredicateRole::Mixed));
        assert_eq!(kb.predicate_role(&q), Some(PredicateRole::Extensional));
        assert_eq!(kb.predicate_role(&Predicate::new("r", 1).unwrap()), None);
        assert_eq!(kb.mixed_predicates(), vec![p]);
    }

    #[test]
    fn test_separation_reject() {
        let kb = mixed_kb();
        let err = kb.check_separation(SeparationPolicy::Reject).unwrap_err();
        assert_eq!(err.code, ErrorCode::SeparationViolation);
        assert!(err.message.contains("p/1"));
        assert!(kb.prepare(SeparationPolicy::Reject).is_err());
    }

    #[test]
    fn test_separation_merge() {
        let kb = mixed_kb();
        let program = kb.prepare(SeparationPolicy::Merge).unwrap();
        assert_eq!(program.facts.len(), 2);
        assert_eq!(program.rules.len(), 1);
    }

    #[test]
    fn test_separation_rewrite() {
        let kb = mixed_kb();
        let program = kb.prepare(SeparationPolicy::Rewrite).unwrap();
        let facts: Vec<String> = program.facts.iter().map(|f| f.to_string()).collect();
        assert!(facts.contains(&"p__edb(a)".to_string()));
        assert!(!facts.contains(&"p(a)".to_string()));
        assert_eq!(program.rules.len(), 2);
        assert_eq!(program.rules[1].to_string(), "p(?x1) :- p__edb(?x1) .");
    }

    #[test]
    fn test_data_source_makes_predicate_supplied() {
        let mut kb = KnowledgeBase::new();
        let p = Predicate::new("p", 1).unwrap();
        let source = InMemoryDataSource::from_constants("s", &[vec!["a"], vec!["b"]]).unwrap();
        kb.add_data_source(p.clone(), Arc::new(source)).unwrap();
        assert_eq!(kb.predicate_role(&p), Some(PredicateRole::Extensional));

        kb.add_rule(rule(vec![atom("p", vec![v("x")])], vec![atom("q", vec![v("x")])]))
            .unwrap();
        assert!(kb.check_separation(SeparationPolicy::Reject).is_err());

        let program = kb.prepare(SeparationPolicy::Merge).unwrap();
        assert_eq!(program.facts.len(), 2);
    }

    #[test]
    fn test_sealed_rejects_mutation() {
        let mut kb = KnowledgeBase::new();
        kb.seal();
        let err = kb.add_fact(atom("p", vec![c("a")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalReasonerState);
        kb.unseal();
        assert!(kb.add_fact(atom("p", vec![c("a")])).is_ok());
    }
}

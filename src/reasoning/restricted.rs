//! Restricted chase
//!
//! A trigger fires only if no extension of its frontier bindings already maps
//! the rule head into the current facts. Existential variables of a firing
//! trigger receive fresh labelled nulls.

use crate::config::ChaseAlgorithm;
use crate::store::FactStore;
use crate::term::{Bindings, Literal, Term};

use super::strategy::{ChaseStrategy, Trigger};

/// Restricted chase strategy
#[derive(Debug, Default)]
pub struct RestrictedChase {
    next_null: usize,
}

impl RestrictedChase {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_null(&mut self) -> Term {
        let null = Term::NamedNull(format!("n{}", self.next_null).into());
        self.next_null += 1;
        null
    }
}

impl ChaseStrategy for RestrictedChase {
    fn name(&self) -> &str {
        "restricted"
    }

    fn algorithm(&self) -> ChaseAlgorithm {
        ChaseAlgorithm::Restricted
    }

    fn instantiate(&mut self, trigger: &Trigger<'_>, store: &FactStore) -> Option<Bindings> {
        let head: Vec<&Literal> = trigger.rule.head().iter().collect();
        if store.satisfies(&head, trigger.bindings) {
            return None;
        }
        let mut bindings = trigger.bindings.clone();
        for var in trigger.rule.existential_variables() {
            let null = self.fresh_null();
            bindings.insert(var, null);
        }
        Some(bindings)
    }

    fn nulls_introduced(&self) -> usize {
        self.next_null
    }

    fn reset(&mut self) {
        self.next_null = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Rule;

    #[test]
    fn test_satisfied_head_is_skipped() {
        let x = Term::universal("x").unwrap();
        let y = Term::existential("y").unwrap();
        let a = Term::constant("a").unwrap();
        let rule = Rule::new(
            vec![Literal::atom("q", vec![x.clone(), y]).unwrap()],
            vec![Literal::atom("p", vec![x.clone()]).unwrap()],
        )
        .unwrap();

        let mut bindings = Bindings::default();
        bindings.insert(x, a.clone());
        let trigger = Trigger {
            rule_index: 0,
            rule: &rule,
            bindings: &bindings,
        };

        let mut store = FactStore::new();
        let mut chase = RestrictedChase::new();
        let fired = chase.instantiate(&trigger, &store).unwrap();
        assert_eq!(fired.len(), 2);
        assert_eq!(chase.nulls_introduced(), 1);

        let q = Literal::atom("q", vec![a, Term::constant("b").unwrap()]).unwrap();
        store.add_literal(&q, 0);
        assert!(chase.instantiate(&trigger, &store).is_none());
    }
}

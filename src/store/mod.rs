//! Materialized fact storage
//!
//! A store holds ground facts grouped by predicate and supports pattern
//! matching. Every row remembers the chase round that added it, which lets
//! the chase restrict a match to facts that are new since the previous round.

use std::fmt;
use std::ops::ControlFlow;

use indexmap::{IndexMap, IndexSet};

use crate::term::{Bindings, Literal, Predicate, Term};

/// Which rows of a relation a pattern may match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    /// Every stored row
    All,
    /// Rows added strictly before the given round
    Before(u32),
    /// Rows added in exactly the given round
    Exactly(u32),
}

/// Rows of one predicate, in insertion order, with nondecreasing rounds
#[derive(Clone, Default)]
struct Relation {
    rows: IndexSet<Vec<Term>>,
    rounds: Vec<u32>,
}

impl Relation {
    fn range(&self, window: Window) -> (usize, usize) {
        let len = self.rows.len();
        match window {
            Window::All => (0, len),
            Window::Before(round) => (0, self.rounds.partition_point(|&r| r < round)),
            Window::Exactly(round) => (
                self.rounds.partition_point(|&r| r < round),
                self.rounds.partition_point(|&r| r <= round),
            ),
        }
    }

    fn rows(&self, window: Window) -> impl Iterator<Item = &[Term]> + '_ {
        let (start, end) = self.range(window);
        (start..end).map(move |i| self.rows[i].as_slice())
    }
}

/// A set of ground facts
#[derive(Clone, Default)]
pub struct FactStore {
    relations: IndexMap<Predicate, Relation>,
    len: usize,
    last_round: u32,
}

impl FactStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row for a predicate in the given round; returns false for duplicates
    ///
    /// Rounds must not decrease between calls.
    pub fn add(&mut self, predicate: &Predicate, row: Vec<Term>, round: u32) -> bool {
        debug_assert_eq!(predicate.arity(), row.len());
        debug_assert!(round >= self.last_round);
        let relation = self.relations.entry(predicate.clone()).or_default();
        if !relation.rows.insert(row) {
            return false;
        }
        relation.rounds.push(round);
        self.len += 1;
        self.last_round = round;
        true
    }

    /// Add a ground positive literal
    pub fn add_literal(&mut self, literal: &Literal, round: u32) -> bool {
        debug_assert!(literal.is_ground() && !literal.is_negated());
        self.add(literal.predicate(), literal.arguments().to_vec(), round)
    }

    /// Check if the store contains a row
    pub fn contains(&self, predicate: &Predicate, row: &[Term]) -> bool {
        self.relations
            .get(predicate)
            .map_or(false, |r| r.rows.contains(row))
    }

    /// Check if the store contains the atom of a ground literal
    pub fn contains_literal(&self, literal: &Literal) -> bool {
        self.contains(literal.predicate(), literal.arguments())
    }

    /// Rows of a predicate visible through a window
    pub fn rows<'a>(
        &'a self,
        predicate: &Predicate,
        window: Window,
    ) -> Box<dyn Iterator<Item = &'a [Term]> + 'a> {
        match self.relations.get(predicate) {
            Some(relation) => Box::new(relation.rows(window)),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Number of rows stored for a predicate
    pub fn count(&self, predicate: &Predicate) -> usize {
        self.relations.get(predicate).map_or(0, |r| r.rows.len())
    }

    /// Number of rows a predicate has in a window
    pub fn count_in(&self, predicate: &Predicate, window: Window) -> usize {
        self.relations.get(predicate).map_or(0, |r| {
            let (start, end) = r.range(window);
            end - start
        })
    }

    /// Get the number of facts
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Predicates with at least one row
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.relations.keys()
    }

    /// Iterate over all facts as literals
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.relations.iter().flat_map(|(predicate, relation)| {
            relation
                .rows
                .iter()
                .map(move |row| Literal::from_row(predicate.clone(), row.clone()))
        })
    }

    /// Clear all facts
    pub fn clear(&mut self) {
        self.relations.clear();
        self.len = 0;
        self.last_round = 0;
    }

    /// Enumerate every extension of `bindings` that maps all `patterns` into the store
    ///
    /// `windows[i]` restricts the rows `patterns[i]` may match. Both universal
    /// and existential variables are treated as matchable. `bindings` is
    /// restored before returning.
    pub fn for_each_match<B>(
        &self,
        patterns: &[&Literal],
        windows: &[Window],
        bindings: &mut Bindings,
        visit: &mut dyn FnMut(&Bindings) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let Some((first, rest)) = patterns.split_first() else {
            return visit(bindings);
        };
        let Some(relation) = self.relations.get(first.predicate()) else {
            return ControlFlow::Continue(());
        };

        let mut bound = Vec::new();
        for row in relation.rows(windows[0]) {
            let matched = bind_row(first.arguments(), row, bindings, &mut bound);
            let flow = if matched {
                self.for_each_match(rest, &windows[1..], bindings, visit)
            } else {
                ControlFlow::Continue(())
            };
            for var in bound.drain(..) {
                bindings.remove(&var);
            }
            if let ControlFlow::Break(b) = flow {
                return ControlFlow::Break(b);
            }
        }
        ControlFlow::Continue(())
    }

    /// Collect every extension of `bindings` matching all patterns against all rows
    pub fn match_all(&self, patterns: &[&Literal], bindings: &Bindings) -> Vec<Bindings> {
        let windows = vec![Window::All; patterns.len()];
        let mut results = Vec::new();
        let mut scratch = bindings.clone();
        let _ = self.for_each_match::<()>(patterns, &windows, &mut scratch, &mut |b| {
            results.push(b.clone());
            ControlFlow::Continue(())
        });
        results
    }

    /// Check whether some extension of `bindings` maps all patterns into the store
    pub fn satisfies(&self, patterns: &[&Literal], bindings: &Bindings) -> bool {
        let windows = vec![Window::All; patterns.len()];
        let mut scratch = bindings.clone();
        self.for_each_match(patterns, &windows, &mut scratch, &mut |_| ControlFlow::Break(()))
            .is_break()
    }
}

/// Extend `bindings` so that `pattern` equals `row`; newly bound variables are pushed to `bound`
pub(crate) fn bind_row(
    pattern: &[Term],
    row: &[Term],
    bindings: &mut Bindings,
    bound: &mut Vec<Term>,
) -> bool {
    for (pat, value) in pattern.iter().zip(row) {
        if pat.is_variable() {
            match bindings.get(pat) {
                Some(existing) => {
                    if existing != value {
                        return false;
                    }
                }
                None => {
                    bindings.insert(pat.clone(), value.clone());
                    bound.push(pat.clone());
                }
            }
        } else if pat != value {
            return false;
        }
    }
    true
}

impl fmt::Debug for FactStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FactStore {{")?;
        for literal in self.literals() {
            writeln!(f, "  {} .", literal)?;
        }
        write!(f, "}}")
    }
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

    fn pred(name: &str, arity: usize) -> Predicate {
        Predicate::new(name, arity).unwrap()
    }

    #[test]
    fn test_add_and_contains() {
        let mut store = FactStore::new();
        let knows = pred("knows", 2);
        assert!(store.add(&knows, vec![c("alice"), c("bob")], 0));
        assert!(store.contains(&knows, &[c("alice"), c("bob")]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_no_duplicates() {
        let mut store = FactStore::new();
        let p = pred("p", 1);
        assert!(store.add(&p, vec![c("a")], 0));
        assert!(!store.add(&p, vec![c("a")], 1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.count_in(&p, Window::Exactly(1)), 0);
    }

    #[test]
    fn test_windows() {
        let mut store = FactStore::new();
        let p = pred("p", 1);
        store.add(&p, vec![c("a")], 0);
        store.add(&p, vec![c("b")], 1);
        store.add(&p, vec![c("c")], 1);
        store.add(&p, vec![c("d")], 2);

        assert_eq!(store.count_in(&p, Window::All), 4);
        assert_eq!(store.count_in(&p, Window::Before(1)), 1);
        assert_eq!(store.count_in(&p, Window::Before(2)), 3);
        assert_eq!(store.count_in(&p, Window::Exactly(1)), 2);
        let delta: Vec<&[Term]> = store.rows(&p, Window::Exactly(2)).collect();
        assert_eq!(delta, vec![&[c("d")][..]]);
    }

    #[test]
    fn test_conjunctive_match() {
        let mut store = FactStore::new();
        let knows = pred("knows", 2);
        store.add(&knows, vec![c("alice"), c("bob")], 0);
        store.add(&knows, vec![c("bob"), c("charlie")], 0);
        store.add(&knows, vec![c("alice"), c("dave")], 0);

        // knows(alice, ?x), knows(?x, ?y)
        let first = Literal::atom("knows", vec![c("alice"), v("x")]).unwrap();
        let second = Literal::atom("knows", vec![v("x"), v("y")]).unwrap();
        let results = store.match_all(&[&first, &second], &Bindings::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(&v("y")), Some(&c("charlie")));
    }

    #[test]
    fn test_repeated_variable() {
        let mut store = FactStore::new();
        let e = pred("e", 2);
        store.add(&e, vec![c("a"), c("a")], 0);
        store.add(&e, vec![c("a"), c("b")], 0);

        let loop_pattern = Literal::atom("e", vec![v("x"), v("x")]).unwrap();
        assert_eq!(store.match_all(&[&loop_pattern], &Bindings::default()).len(), 1);
    }

    #[test]
    fn test_satisfies_restores_bindings() {
        let mut store = FactStore::new();
        store.add(&pred("p", 1), vec![c("a")], 0);
        let pattern = Literal::atom("p", vec![v("x")]).unwrap();
        let bindings = Bindings::default();
        assert!(store.satisfies(&[&pattern], &bindings));
        assert!(bindings.is_empty());

        let mut bound = Bindings::default();
        bound.insert(v("x"), c("b"));
        assert!(!store.satisfies(&[&pattern], &bound));
    }
}

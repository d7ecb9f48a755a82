//! Piece-unifier search between a rule head and a rule body
//!
//! Both rules must be variable-disjoint (see the renamer). Terms are grouped
//! into equivalence classes with a small union-find; a unifier is valid when
//! every class containing an existential variable of the producing rule holds
//! nothing but variables of the consuming rule.

use std::collections::BTreeSet;
use std::fmt;

use fnv::{FnvHashMap, FnvHashSet};

use crate::term::{Bindings, Literal, Rule, Term};

/// Union-find over terms
#[derive(Debug, Clone, Default)]
pub(crate) struct Partition {
    parent: FnvHashMap<Term, Term>,
}

impl Partition {
    pub(crate) fn find(&self, term: &Term) -> Term {
        let mut current = term;
        while let Some(next) = self.parent.get(current) {
            current = next;
        }
        current.clone()
    }

    pub(crate) fn union(&mut self, a: &Term, b: &Term) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    /// Unify two literals argument-wise; predicates must already agree
    pub(crate) fn unify_literals(&mut self, a: &Literal, b: &Literal) {
        for (x, y) in a.arguments().iter().zip(b.arguments()) {
            self.union(x, y);
        }
    }

    /// Members of every class touched so far, keyed by root
    fn classes<'a>(&self, terms: impl Iterator<Item = &'a Term>) -> FnvHashMap<Term, BTreeSet<Term>> {
        let mut classes: FnvHashMap<Term, BTreeSet<Term>> = FnvHashMap::default();
        for term in terms {
            classes.entry(self.find(term)).or_default().insert(term.clone());
        }
        classes
    }
}

/// Which terms of the producing rule may not share a class with its existentials
pub(crate) struct Producer<'a> {
    pub rule: &'a Rule,
    universals: FnvHashSet<Term>,
    existentials: FnvHashSet<Term>,
}

impl<'a> Producer<'a> {
    pub(crate) fn new(rule: &'a Rule) -> Self {
        Producer {
            rule,
            universals: rule.universal_variables().into_iter().collect(),
            existentials: rule.existential_variables().into_iter().collect(),
        }
    }
}

/// Result of checking the classes of a partition
struct Classification {
    /// Class representative for every term
    sigma: Bindings,
    /// Variables of the consuming rule that stand for a fresh witness
    witnessed: FnvHashSet<Term>,
}

fn classify<'a>(
    partition: &Partition,
    producer: &Producer<'_>,
    terms: impl Iterator<Item = &'a Term>,
) -> Option<Classification> {
    let mut sigma = Bindings::default();
    let mut witnessed = FnvHashSet::default();

    for members in partition.classes(terms).into_values() {
        let constants: Vec<&Term> = members.iter().filter(|t| !t.is_variable()).collect();
        if constants.len() > 1 {
            return None;
        }
        let existentials: Vec<&Term> = members
            .iter()
            .filter(|t| producer.existentials.contains(*t))
            .collect();

        let representative = match (constants.first(), existentials.as_slice()) {
            (Some(c), []) => (*c).clone(),
            (None, [e]) => {
                if members.iter().any(|t| producer.universals.contains(t)) {
                    return None;
                }
                witnessed.extend(members.iter().filter(|t| *t != *e).cloned());
                (*e).clone()
            }
            (None, []) => match members.iter().next() {
                Some(first) => first.clone(),
                None => continue,
            },
            _ => return None,
        };

        for member in members {
            if member.is_variable() {
                sigma.insert(member, representative.clone());
            }
        }
    }

    Some(Classification { sigma, witnessed })
}

/// A piece-unifier found between the head of one rule and the body of another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelianceWitness {
    /// Pairs (head literal index of the producer, body literal index of the consumer)
    pub pairs: Vec<(usize, usize)>,
    /// Class representative of every variable involved, over the renamed rules
    pub substitution: Vec<(Term, Term)>,
}

impl fmt::Display for RelianceWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, term)) in self.substitution.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", var, term)?;
        }
        write!(f, "}}")
    }
}

/// Search for a unifier showing that `consumer` may rely on `producer`
///
/// The rules must be variable-disjoint.
pub(crate) fn find_positive(producer: &Rule, consumer: &Rule) -> Option<RelianceWitness> {
    let producer = Producer::new(producer);
    let body: Vec<(usize, &Literal)> = consumer
        .body()
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_negated())
        .collect();
    let mut pairs = Vec::new();
    search(&producer, consumer, &body, 0, &Partition::default(), &mut pairs)
}

fn search(
    producer: &Producer<'_>,
    consumer: &Rule,
    body: &[(usize, &Literal)],
    next: usize,
    partition: &Partition,
    pairs: &mut Vec<(usize, usize)>,
) -> Option<RelianceWitness> {
    let Some(&(body_idx, literal)) = body.get(next) else {
        return check_leaf(producer, consumer, partition, pairs);
    };

    for (head_idx, head) in producer.rule.head().iter().enumerate() {
        if head.predicate() != literal.predicate() {
            continue;
        }
        let mut extended = partition.clone();
        extended.unify_literals(head, literal);
        let touched = head.arguments().iter().chain(literal.arguments());
        if classify(&extended, producer, touched).is_none() {
            continue;
        }
        pairs.push((head_idx, body_idx));
        let found = search(producer, consumer, body, next + 1, &extended, pairs);
        pairs.pop();
        if found.is_some() {
            return found;
        }
    }

    // leave this body literal to be matched by existing facts
    search(producer, consumer, body, next + 1, partition, pairs)
}

fn check_leaf(
    producer: &Producer<'_>,
    consumer: &Rule,
    partition: &Partition,
    pairs: &[(usize, usize)],
) -> Option<RelianceWitness> {
    if pairs.is_empty() {
        return None;
    }
    let head = producer.rule.head();
    let body = consumer.body();

    let mapped: Vec<&Literal> = pairs.iter().map(|&(_, b)| &body[b]).collect();
    let terms = pairs
        .iter()
        .flat_map(|&(h, b)| head[h].arguments().iter().chain(body[b].arguments()));
    let Classification { sigma, witnessed } = classify(partition, producer, terms)?;

    let mapped_idx: FnvHashSet<usize> = pairs.iter().map(|&(_, b)| b).collect();
    let unmapped: Vec<&Literal> = body
        .iter()
        .enumerate()
        .filter(|(i, l)| !l.is_negated() && !mapped_idx.contains(i))
        .map(|(_, l)| l)
        .collect();

    // a fresh witness cannot occur in facts that existed before the application
    if unmapped
        .iter()
        .any(|l| l.arguments().iter().any(|t| witnessed.contains(t)))
    {
        return None;
    }

    let existing: FnvHashSet<Literal> = producer
        .rule
        .positive_body()
        .chain(unmapped.iter().copied())
        .map(|l| l.substitute(&sigma))
        .collect();
    if mapped.iter().all(|l| existing.contains(&l.substitute(&sigma))) {
        return None;
    }

    let holding: FnvHashSet<Literal> = head
        .iter()
        .chain(producer.rule.positive_body())
        .chain(consumer.positive_body())
        .map(|l| l.substitute(&sigma))
        .collect();
    if consumer
        .negative_body()
        .any(|l| holding.contains(&l.to_positive().substitute(&sigma)))
    {
        return None;
    }

    let mut substitution: Vec<(Term, Term)> = sigma.into_iter().collect();
    substitution.sort();
    Some(RelianceWitness {
        pairs: pairs.to_vec(),
        substitution,
    })
}

/// Check whether some head literal of `producer` unifies with a negated body literal of `consumer`
///
/// The rules must be variable-disjoint.
pub(crate) fn find_negative(producer: &Rule, consumer: &Rule) -> bool {
    let producer = Producer::new(producer);
    consumer.negative_body().any(|negated| {
        producer.rule.head().iter().any(|head| {
            if head.predicate() != negated.predicate() {
                return false;
            }
            let mut partition = Partition::default();
            partition.unify_literals(head, negated);
            let terms = head.arguments().iter().chain(negated.arguments());
            classify(&partition, &producer, terms).is_some()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reliance::renamer::rename_rule;
    use crate::term::Predicate;

    fn c(name: &str) -> Term {
        Term::constant(name).unwrap()
    }

    fn v(name: &str) -> Term {
        Term::universal(name).unwrap()
    }

    fn e(name: &str) -> Term {
        Term::existential(name).unwrap()
    }

    fn atom(name: &str, args: Vec<Term>) -> Literal {
        Literal::atom(name, args).unwrap()
    }

    fn neg(name: &str, args: Vec<Term>) -> Literal {
        Literal::negative(Predicate::new(name, args.len()).unwrap(), args).unwrap()
    }

    fn rule(head: Vec<Literal>, body: Vec<Literal>) -> Rule {
        Rule::new(head, body).unwrap()
    }

    fn relies(a: &Rule, b: &Rule) -> bool {
        find_positive(&rename_rule(a, 1), &rename_rule(b, 2)).is_some()
    }

    #[test]
    fn test_partition() {
        let mut p = Partition::default();
        p.union(&v("x"), &v("y"));
        p.union(&v("y"), &c("a"));
        assert_eq!(p.find(&v("x")), p.find(&c("a")));
        assert_ne!(p.find(&v("z")), p.find(&c("a")));
    }

    #[test]
    fn test_simple_chain() {
        // q(?x) :- p(?x)   and   r(?x) :- q(?x)
        let a = rule(vec![atom("q", vec![v("x")])], vec![atom("p", vec![v("x")])]);
        let b = rule(vec![atom("r", vec![v("x")])], vec![atom("q", vec![v("x")])]);
        assert!(relies(&a, &b));
        assert!(!relies(&b, &a));
    }

    #[test]
    fn test_constant_clash() {
        let a = rule(vec![atom("q", vec![c("a")])], vec![atom("p", vec![v("x")])]);
        let b = rule(vec![atom("r", vec![v("x")])], vec![atom("q", vec![c("b")])]);
        assert!(!relies(&a, &b));
    }

    #[test]
    fn test_existential_cannot_meet_constant() {
        let a = rule(vec![atom("q", vec![v("x"), e("y")])], vec![atom("p", vec![v("x")])]);
        let b = rule(vec![atom("r", vec![v("x")])], vec![atom("q", vec![v("x"), c("c")])]);
        assert!(!relies(&a, &b));
    }

    #[test]
    fn test_piece_condition() {
        // A: q(?x, !y) :- p(?x)
        // B1: r(?u) :- q(?u, ?w), s(?w)    fresh witness would have to be in s
        // B2: r(?u) :- q(?u, ?w), s(?u)    fine
        let a = rule(vec![atom("q", vec![v("x"), e("y")])], vec![atom("p", vec![v("x")])]);
        let b1 = rule(
            vec![atom("r", vec![v("u")])],
            vec![atom("q", vec![v("u"), v("w")]), atom("s", vec![v("w")])],
        );
        let b2 = rule(
            vec![atom("r", vec![v("u")])],
            vec![atom("q", vec![v("u"), v("w")]), atom("s", vec![v("u")])],
        );
        assert!(!relies(&a, &b1));
        assert!(relies(&a, &b2));
    }

    #[test]
    fn test_existential_joined_piece() {
        // A: q(?x, !y), s(!y) :- p(?x)   the whole piece is produced together
        let a = rule(
            vec![atom("q", vec![v("x"), e("y")]), atom("s", vec![e("y")])],
            vec![atom("p", vec![v("x")])],
        );
        let b = rule(
            vec![atom("r", vec![v("u")])],
            vec![atom("q", vec![v("u"), v("w")]), atom("s", vec![v("w")])],
        );
        let witness = find_positive(&rename_rule(&a, 1), &rename_rule(&b, 2)).unwrap();
        assert_eq!(witness.pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_existential_meets_frontier() {
        // A: q(?x, !y) :- p(?x)     B: r(?u) :- q(?u, ?u)
        let a = rule(vec![atom("q", vec![v("x"), e("y")])], vec![atom("p", vec![v("x")])]);
        let b = rule(vec![atom("r", vec![v("u")])], vec![atom("q", vec![v("u"), v("u")])]);
        assert!(!relies(&a, &b));
    }

    #[test]
    fn test_redundant_application() {
        // A: p(?x) :- p(?x), q(?x) only re-derives what it read
        let a = rule(
            vec![atom("p", vec![v("x")])],
            vec![atom("p", vec![v("x")]), atom("q", vec![v("x")])],
        );
        let b = rule(vec![atom("r", vec![v("x")])], vec![atom("p", vec![v("x")])]);
        assert!(!relies(&a, &b));
    }

    #[test]
    fn test_blocked_by_negation() {
        // A: q(?x), s(?x) :- p(?x)     B: r(?x) :- q(?x), ~s(?x)
        let a = rule(
            vec![atom("q", vec![v("x")]), atom("s", vec![v("x")])],
            vec![atom("p", vec![v("x")])],
        );
        let b = rule(
            vec![atom("r", vec![v("x")])],
            vec![atom("q", vec![v("x")]), neg("s", vec![v("x")])],
        );
        assert!(!relies(&a, &b));
    }

    #[test]
    fn test_negative_reliance() {
        let a = rule(vec![atom("s", vec![v("x")])], vec![atom("p", vec![v("x")])]);
        let b = rule(
            vec![atom("r", vec![v("x")])],
            vec![atom("q", vec![v("x")]), neg("s", vec![v("x")])],
        );
        assert!(find_negative(&rename_rule(&a, 1), &rename_rule(&b, 2)));
        assert!(!find_negative(&rename_rule(&b, 1), &rename_rule(&a, 2)));
    }
}

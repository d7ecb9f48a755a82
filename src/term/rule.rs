//! Rule representation: body conjunction => head conjunction

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::{Literal, Term};
use crate::error::{ChaseError, ChaseResult, ErrorCode};

/// An existential rule `head :- body`
///
/// Invariants checked at construction:
/// - the head is non-empty and contains only positive literals
/// - existential variables occur only in the head
/// - every universal variable of the head occurs in the body
/// - one predicate name is used with one arity throughout the rule
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    head: Vec<Literal>,
    body: Vec<Literal>,
}

impl Rule {
    /// Create a new rule
    pub fn new(head: Vec<Literal>, body: Vec<Literal>) -> ChaseResult<Self> {
        if head.is_empty() {
            return Err(ChaseError::invalid_argument("rule head cannot be empty"));
        }
        for literal in &head {
            literal.ensure_positive("head")?;
        }

        let mut arities: HashMap<&str, usize> = HashMap::new();
        for literal in head.iter().chain(body.iter()) {
            let p = literal.predicate();
            match arities.insert(p.name(), p.arity()) {
                Some(seen) if seen != p.arity() => {
                    return Err(ChaseError::arity_mismatch(p.name(), seen, p.arity()));
                }
                _ => {}
            }
        }

        let mut body_vars = BTreeSet::new();
        for literal in &body {
            for term in literal.arguments() {
                if term.is_existential() {
                    return Err(ChaseError::new(
                        ErrorCode::ExistentialInBody,
                        format!("existential variable {} occurs in body literal {}", term, literal),
                    ));
                }
                if term.is_universal() {
                    body_vars.insert(term.clone());
                }
            }
        }

        for literal in &head {
            if let Some(unbound) = literal
                .variables()
                .find(|t| t.is_universal() && !body_vars.contains(*t))
            {
                return Err(ChaseError::new(
                    ErrorCode::RangeRestriction,
                    format!("head variable {} does not occur in the body", unbound),
                ));
            }
        }

        Ok(Rule { head, body })
    }

    pub fn head(&self) -> &[Literal] {
        &self.head
    }

    pub fn body(&self) -> &[Literal] {
        &self.body
    }

    /// Non-negated body literals
    pub fn positive_body(&self) -> impl Iterator<Item = &Literal> {
        self.body.iter().filter(|l| !l.is_negated())
    }

    /// Negated body literals
    pub fn negative_body(&self) -> impl Iterator<Item = &Literal> {
        self.body.iter().filter(|l| l.is_negated())
    }

    pub fn has_negation(&self) -> bool {
        self.body.iter().any(Literal::is_negated)
    }

    /// Universal variables occurring anywhere in the rule
    pub fn universal_variables(&self) -> BTreeSet<Term> {
        self.body
            .iter()
            .chain(self.head.iter())
            .flat_map(|l| l.arguments())
            .filter(|t| t.is_universal())
            .cloned()
            .collect()
    }

    /// Existential variables of the head
    pub fn existential_variables(&self) -> BTreeSet<Term> {
        self.head
            .iter()
            .flat_map(|l| l.arguments())
            .filter(|t| t.is_existential())
            .cloned()
            .collect()
    }

    /// Body variables shared with the head
    pub fn frontier(&self) -> BTreeSet<Term> {
        let head_vars: BTreeSet<&Term> = self
            .head
            .iter()
            .flat_map(|l| l.arguments())
            .filter(|t| t.is_universal())
            .collect();
        self.body
            .iter()
            .flat_map(|l| l.arguments())
            .filter(|t| head_vars.contains(t))
            .cloned()
            .collect()
    }

    /// A fact is a rule with an empty body and a single variable-free head literal
    pub fn is_fact(&self) -> bool {
        self.body.is_empty() && self.head.len() == 1 && self.head[0].is_ground()
    }

    /// Rebuild this rule with every term transformed; used by renaming passes
    pub(crate) fn map_terms(&self, mut f: impl FnMut(&Term) -> Term) -> Rule {
        Rule {
            head: self.head.iter().map(|l| l.map_terms(&mut f)).collect(),
            body: self.body.iter().map(|l| l.map_terms(&mut f)).collect(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, literal) in self.head.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", literal)?;
        }
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, literal) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", literal)?;
            }
        }
        write!(f, " .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_frontier() {
        // r(?x, !y), s(?z) :- p(?x, ?w), q(?z)
        let rule = Rule::new(
            vec![atom("r", vec![v("x"), e("y")]), atom("s", vec![v("z")])],
            vec![atom("p", vec![v("x"), v("w")]), atom("q", vec![v("z")])],
        )
        .unwrap();

        let frontier: Vec<String> = rule.frontier().iter().map(|t| t.to_string()).collect();
        assert_eq!(frontier, vec!["?x", "?z"]);
        assert_eq!(rule.existential_variables().len(), 1);
        assert_eq!(rule.universal_variables().len(), 3);
    }

    #[test]
    fn test_structural_equality() {
        let build = || {
            Rule::new(
                vec![atom("q", vec![v("x")])],
                vec![atom("p", vec![v("x")])],
            )
            .unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(build().frontier(), build().frontier());
    }

    #[test]
    fn test_range_restriction() {
        let err = Rule::new(vec![atom("q", vec![v("y")])], vec![atom("p", vec![v("x")])])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeRestriction);
    }

    #[test]
    fn test_existential_in_body_rejected() {
        let err = Rule::new(vec![atom("q", vec![c("a")])], vec![atom("p", vec![e("y")])])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExistentialInBody);
    }

    #[test]
    fn test_negated_head_rejected() {
        let p = Predicate::new("p", 1).unwrap();
        let neg = Literal::negative(p, vec![v("x")]).unwrap();
        assert!(Rule::new(vec![neg], vec![atom("q", vec![v("x")])]).is_err());
        assert!(Rule::new(vec![], vec![atom("q", vec![v("x")])]).is_err());
    }

    #[test]
    fn test_arity_conflict_rejected() {
        let err = Rule::new(
            vec![atom("p", vec![v("x"), v("x")])],
            vec![atom("p", vec![v("x")])],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityMismatch);
    }

    #[test]
    fn test_negated_variable_counts_for_range_restriction() {
        let p = Predicate::new("p", 1).unwrap();
        let rule = Rule::new(
            vec![atom("q", vec![v("x")])],
            vec![Literal::negative(p, vec![v("x")]).unwrap()],
        )
        .unwrap();
        assert!(rule.has_negation());
        assert_eq!(rule.positive_body().count(), 0);
        assert_eq!(rule.to_string(), "q(?x) :- ~p(?x) .");
    }

    #[test]
    fn test_is_fact() {
        let fact = Rule::new(vec![atom("p", vec![c("a")])], vec![]).unwrap();
        assert!(fact.is_fact());
        let witness = Rule::new(vec![atom("p", vec![e("y")])], vec![]).unwrap();
        assert!(!witness.is_fact());
    }
}

//! Literal representation: a possibly negated atom

use std::fmt;

use super::{substitute, Bindings, Predicate, Term};
use crate::error::{ChaseError, ChaseResult, ErrorCode};

/// An atom `p(t1, ..., tn)`, possibly negated
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    predicate: Predicate,
    arguments: Vec<Term>,
    negated: bool,
}

impl Literal {
    fn build(predicate: Predicate, arguments: Vec<Term>, negated: bool) -> ChaseResult<Self> {
        if arguments.len() != predicate.arity() {
            return Err(ChaseError::arity_mismatch(
                predicate.name(),
                predicate.arity(),
                arguments.len(),
            ));
        }
        Ok(Literal {
            predicate,
            arguments,
            negated,
        })
    }

    /// Create a positive literal
    pub fn positive(predicate: Predicate, arguments: Vec<Term>) -> ChaseResult<Self> {
        Self::build(predicate, arguments, false)
    }

    /// Create a negated literal
    pub fn negative(predicate: Predicate, arguments: Vec<Term>) -> ChaseResult<Self> {
        Self::build(predicate, arguments, true)
    }

    /// Create a fact: a positive literal whose arguments are all constants
    pub fn fact(predicate: Predicate, arguments: Vec<Term>) -> ChaseResult<Self> {
        if let Some(bad) = arguments.iter().find(|t| !matches!(t, Term::Constant(_))) {
            return Err(ChaseError::invalid_argument(format!(
                "fact arguments must be constants, found {}",
                bad
            ))
            .with_context("predicate", predicate.to_string()));
        }
        Self::build(predicate, arguments, false)
    }

    /// Build a positive literal from a stored row whose length already matches the arity
    pub(crate) fn from_row(predicate: Predicate, arguments: Vec<Term>) -> Self {
        debug_assert_eq!(predicate.arity(), arguments.len());
        Literal {
            predicate,
            arguments,
            negated: false,
        }
    }

    /// Shorthand for building a literal from a predicate name
    pub fn atom(name: &str, arguments: Vec<Term>) -> ChaseResult<Self> {
        let predicate = Predicate::new(name, arguments.len())?;
        Self::positive(predicate, arguments)
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn arguments(&self) -> &[Term] {
        &self.arguments
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Check if no argument is a variable
    pub fn is_ground(&self) -> bool {
        self.arguments.iter().all(Term::is_ground)
    }

    /// Variables of this literal in order of first occurrence
    pub fn variables(&self) -> impl Iterator<Item = &Term> {
        self.arguments.iter().filter(|t| t.is_variable())
    }

    /// The positive literal with the same atom
    pub fn to_positive(&self) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            arguments: self.arguments.clone(),
            negated: false,
        }
    }

    /// Apply bindings to every argument
    pub fn substitute(&self, bindings: &Bindings) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            arguments: self.arguments.iter().map(|t| substitute(t, bindings)).collect(),
            negated: self.negated,
        }
    }

    /// Rebuild this literal with transformed arguments, keeping predicate and polarity
    pub(crate) fn map_terms(&self, mut f: impl FnMut(&Term) -> Term) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            arguments: self.arguments.iter().map(&mut f).collect(),
            negated: self.negated,
        }
    }

    /// Fails unless this literal is positive
    pub(crate) fn ensure_positive(&self, role: &str) -> ChaseResult<()> {
        if self.negated {
            return Err(ChaseError::new(
                ErrorCode::NegatedLiteral,
                format!("{} literal {} must be positive", role, self),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~")?;
        }
        write!(f, "{}(", self.predicate.name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

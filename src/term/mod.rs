//! Term, literal and rule representations
//!
//! This module defines the core value types of the rule language:
//! - Terms (constants, universally/existentially quantified variables, nulls)
//! - Predicates (name plus arity)
//! - Literals (possibly negated atoms)
//! - Rules (body conjunction => head conjunction)
//!
//! All types are immutable once constructed and compare structurally, so two
//! independently built rules with the same literals are equal.

use std::fmt;
use std::sync::Arc;

use fnv::FnvHashMap;

use crate::error::{ChaseError, ChaseResult};

mod literal;
mod predicate;
mod rule;

pub use literal::Literal;
pub use predicate::Predicate;
pub use rule::Rule;

/// The kind of a term, without its name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    Constant,
    UniversalVariable,
    ExistentialVariable,
    NamedNull,
}

/// A term of the rule language
///
/// Identity is `(kind, name)`: a universal and an existential variable with
/// the same name are different terms.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// A named individual
    Constant(Arc<str>),
    /// A variable bound by the rule body (`?x`)
    UniversalVariable(Arc<str>),
    /// A variable asserting the existence of a witness (`!y`), head only
    ExistentialVariable(Arc<str>),
    /// A witness introduced by the chase (`_:n`)
    NamedNull(Arc<str>),
}

fn checked_name(name: impl Into<String>, what: &str) -> ChaseResult<Arc<str>> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(ChaseError::blank_name(what));
    }
    Ok(Arc::from(name))
}

impl Term {
    /// Create a constant
    pub fn constant(name: impl Into<String>) -> ChaseResult<Self> {
        Ok(Term::Constant(checked_name(name, "constant")?))
    }

    /// Create a universal variable
    pub fn universal(name: impl Into<String>) -> ChaseResult<Self> {
        Ok(Term::UniversalVariable(checked_name(name, "variable")?))
    }

    /// Create an existential variable
    pub fn existential(name: impl Into<String>) -> ChaseResult<Self> {
        Ok(Term::ExistentialVariable(checked_name(name, "variable")?))
    }

    /// Create a named null
    pub fn null(name: impl Into<String>) -> ChaseResult<Self> {
        Ok(Term::NamedNull(checked_name(name, "null")?))
    }

    /// Get the name of this term
    pub fn name(&self) -> &str {
        match self {
            Term::Constant(n)
            | Term::UniversalVariable(n)
            | Term::ExistentialVariable(n)
            | Term::NamedNull(n) => n,
        }
    }

    /// Get the kind of this term
    pub fn kind(&self) -> TermKind {
        match self {
            Term::Constant(_) => TermKind::Constant,
            Term::UniversalVariable(_) => TermKind::UniversalVariable,
            Term::ExistentialVariable(_) => TermKind::ExistentialVariable,
            Term::NamedNull(_) => TermKind::NamedNull,
        }
    }

    /// Check if this term is a variable of either quantification
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::UniversalVariable(_) | Term::ExistentialVariable(_))
    }

    /// Check if this term is ground (contains no variables)
    pub fn is_ground(&self) -> bool {
        !self.is_variable()
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, Term::UniversalVariable(_))
    }

    pub fn is_existential(&self) -> bool {
        matches!(self, Term::ExistentialVariable(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Term::NamedNull(_))
    }

    /// Rebuild this term with the same kind and a different name
    pub(crate) fn with_name(&self, name: impl Into<Arc<str>>) -> Term {
        let name = name.into();
        match self {
            Term::Constant(_) => Term::Constant(name),
            Term::UniversalVariable(_) => Term::UniversalVariable(name),
            Term::ExistentialVariable(_) => Term::ExistentialVariable(name),
            Term::NamedNull(_) => Term::NamedNull(name),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(n) => write!(f, "{}", n),
            Term::UniversalVariable(n) => write!(f, "?{}", n),
            Term::ExistentialVariable(n) => write!(f, "!{}", n),
            Term::NamedNull(n) => write!(f, "_:{}", n),
        }
    }
}

/// Bindings from variables to terms
pub type Bindings = FnvHashMap<Term, Term>;

/// Apply bindings to a term, substituting variables
pub fn substitute(term: &Term, bindings: &Bindings) -> Term {
    if term.is_variable() {
        bindings.get(term).cloned().unwrap_or_else(|| term.clone())
    } else {
        term.clone()
    }
}

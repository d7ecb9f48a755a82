//! Predicate representation

use std::fmt;
use std::sync::Arc;

use crate::error::{ChaseError, ChaseResult};

/// A predicate symbol with a fixed arity
///
/// Two predicates are equal iff both name and arity match.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    name: Arc<str>,
    arity: usize,
}

impl Predicate {
    /// Create a predicate; the name must not be blank and the arity must be positive
    pub fn new(name: impl Into<String>, arity: usize) -> ChaseResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChaseError::blank_name("predicate"));
        }
        if arity == 0 {
            return Err(ChaseError::invalid_argument(format!(
                "predicate {} must have positive arity",
                name
            )));
        }
        Ok(Predicate {
            name: Arc::from(name),
            arity,
        })
    }

    /// Get the predicate name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the predicate arity
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_equality() {
        let p1 = Predicate::new("p", 1).unwrap();
        let p2 = Predicate::new("p", 1).unwrap();
        let p3 = Predicate::new("p", 2).unwrap();
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }

    #[test]
    fn test_invalid_predicates() {
        assert!(Predicate::new("", 1).is_err());
        assert!(Predicate::new("p", 0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Predicate::new("edge", 2).unwrap().to_string(), "edge/2");
    }
}

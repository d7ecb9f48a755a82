//! Direct queries over materialized facts

use std::fmt;

use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::store::{bind_row, FactStore, Window};
use crate::term::{Bindings, Literal, Term};

/// One answer to a query: the query's arguments under a matching substitution
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryResult {
    terms: Vec<Term>,
}

impl QueryResult {
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<Term> {
        self.terms
    }

    /// Check whether a generated witness occurs in this answer
    pub fn has_nulls(&self) -> bool {
        self.terms.iter().any(Term::is_null)
    }
}

impl From<Vec<Term>> for QueryResult {
    fn from(terms: Vec<Term>) -> Self {
        QueryResult { terms }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, "]")
    }
}

/// Lazy sequence of query answers
///
/// Every stored fact is visited at most once and facts are distinct, so no
/// answer is produced twice.
pub struct QueryAnswers<'a> {
    rows: Box<dyn Iterator<Item = &'a [Term]> + 'a>,
    pattern: Vec<Term>,
    include_nulls: bool,
    scratch: Bindings,
    bound: Vec<Term>,
}

impl<'a> QueryAnswers<'a> {
    pub(crate) fn new(store: &'a FactStore, query: &Literal, include_nulls: bool) -> ChaseResult<Self> {
        validate(query)?;
        Ok(QueryAnswers {
            rows: store.rows(query.predicate(), Window::All),
            pattern: query.arguments().to_vec(),
            include_nulls,
            scratch: Bindings::default(),
            bound: Vec::new(),
        })
    }
}

impl Iterator for QueryAnswers<'_> {
    type Item = QueryResult;

    fn next(&mut self) -> Option<QueryResult> {
        for row in self.rows.by_ref() {
            self.scratch.clear();
            self.bound.clear();
            if !bind_row(&self.pattern, row, &mut self.scratch, &mut self.bound) {
                continue;
            }
            if !self.include_nulls && row.iter().any(Term::is_null) {
                continue;
            }
            return Some(QueryResult {
                terms: row.to_vec(),
            });
        }
        None
    }
}

/// Reject queries that cannot be answered from positive facts
fn validate(query: &Literal) -> ChaseResult<()> {
    if query.is_negated() {
        return Err(ChaseError::invalid_argument(format!(
            "query {} is negated; only positive literals can be queried",
            query
        ))
        .with_code(ErrorCode::NegatedLiteral));
    }
    if let Some(var) = query.arguments().iter().find(|t| t.is_existential()) {
        return Err(ChaseError::invalid_argument(format!(
            "query {} contains existential variable {}",
            query, var
        ))
        .with_code(ErrorCode::InvalidQuery)
        .with_hint("use a universal variable (?x) to ask for any value"));
    }
    Ok(())
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

    fn store() -> FactStore {
        let mut store = FactStore::new();
        let r = Predicate::new("r", 2).unwrap();
        store.add(&r, vec![c("a"), c("a")], 0);
        store.add(&r, vec![c("a"), c("b")], 0);
        store.add(&r, vec![c("b"), Term::null("n0").unwrap()], 1);
        store
    }

    #[test]
    fn test_repeated_variable() {
        let store = store();
        let query = Literal::atom("r", vec![v("x"), v("x")]).unwrap();
        let answers: Vec<QueryResult> = QueryAnswers::new(&store, &query, true).unwrap().collect();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].to_string(), "[a, a]");
    }

    #[test]
    fn test_constant_filter() {
        let store = store();
        let query = Literal::atom("r", vec![c("a"), v("y")]).unwrap();
        assert_eq!(QueryAnswers::new(&store, &query, true).unwrap().count(), 2);
    }

    #[test]
    fn test_exclude_nulls() {
        let store = store();
        let query = Literal::atom("r", vec![v("x"), v("y")]).unwrap();
        assert_eq!(QueryAnswers::new(&store, &query, true).unwrap().count(), 3);
        let without: Vec<_> = QueryAnswers::new(&store, &query, false).unwrap().collect();
        assert_eq!(without.len(), 2);
        assert!(without.iter().all(|r| !r.has_nulls()));
    }

    #[test]
    fn test_unknown_predicate_is_empty() {
        let store = store();
        let query = Literal::atom("r", vec![v("x")]).unwrap();
        assert_eq!(QueryAnswers::new(&store, &query, true).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_queries() {
        let store = store();
        let negated =
            Literal::negative(Predicate::new("r", 2).unwrap(), vec![v("x"), v("y")]).unwrap();
        let err = QueryAnswers::new(&store, &negated, true).err().unwrap();
        assert_eq!(err.code, ErrorCode::NegatedLiteral);

        let existential =
            Literal::atom("r", vec![v("x"), Term::existential("y").unwrap()]).unwrap();
        let err = QueryAnswers::new(&store, &existential, true).err().unwrap();
        assert!(err.is(ErrorCode::InvalidArgument));
    }
}

//! In-memory data source

use crate::core::DataSource;
use crate::error::{ChaseError, ChaseResult};
use crate::term::{Literal, Predicate, Term};

/// A data source holding its rows in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    name: String,
    rows: Vec<Vec<Term>>,
}

impl InMemoryDataSource {
    /// Create an empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn add_row(&mut self, row: Vec<Term>) {
        self.rows.push(row);
    }

    /// Builder form of [`add_row`](Self::add_row)
    pub fn with_row(mut self, row: Vec<Term>) -> Self {
        self.rows.push(row);
        self
    }

    /// Build a source from constant names, one inner vector per row
    pub fn from_constants<S: AsRef<str>>(
        name: impl Into<String>,
        rows: &[Vec<S>],
    ) -> ChaseResult<Self> {
        let mut source = Self::new(name);
        for row in rows {
            let terms = row
                .iter()
                .map(|c| Term::constant(c.as_ref()))
                .collect::<ChaseResult<Vec<_>>>()?;
            source.add_row(terms);
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl DataSource for InMemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, _predicate: &Predicate) -> ChaseResult<Vec<Vec<Term>>> {
        Ok(self.rows.clone())
    }
}

/// Turn rows supplied by a source into facts, rejecting malformed rows
pub(crate) fn rows_to_facts(
    source: &dyn DataSource,
    predicate: &Predicate,
    rows: Vec<Vec<Term>>,
) -> ChaseResult<Vec<Literal>> {
    rows.into_iter()
        .map(|row| {
            Literal::fact(predicate.clone(), row).map_err(|e| {
                ChaseError::invalid_argument(format!(
                    "data source {} supplied a malformed row for {}",
                    source.name(),
                    predicate
                ))
                .with_cause(e.message)
                .with_context("source", source.name())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_constants() {
        let source = InMemoryDataSource::from_constants("people", &[vec!["alice"], vec!["bob"]])
            .unwrap();
        let p = Predicate::new("person", 1).unwrap();
        let rows = source.load(&p).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Term::constant("alice").unwrap());
    }

    #[test]
    fn test_rows_to_facts_rejects_bad_rows() {
        let p = Predicate::new("p", 2).unwrap();
        let source = InMemoryDataSource::new("bad")
            .with_row(vec![Term::constant("a").unwrap()]);
        let rows = source.load(&p).unwrap();
        let err = rows_to_facts(&source, &p, rows).unwrap_err();
        assert_eq!(err.context_field("source"), Some("bad"));

        let nulls = InMemoryDataSource::new("nulls").with_row(vec![
            Term::constant("a").unwrap(),
            Term::null("n").unwrap(),
        ]);
        let rows = nulls.load(&p).unwrap();
        assert!(rows_to_facts(&nulls, &p, rows).is_err());
    }
}

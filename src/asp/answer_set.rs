//! Answer sets and the solver output reader
//!
//! The solver prints a stream of lines. The reader classifies each trimmed
//! line:
//! - `SATISFIABLE`, `UNSATISFIABLE`, `INTERRUPTED` set the outcome
//! - `Answer: ` announces that the next line lists the true atoms of a model
//! - anything else is a diagnostic and is skipped
//!
//! Atoms are integers resolved through a [`LiteralTable`]. Reading stops at
//! the first terminal marker, so a solver that keeps running after printing
//! its result is never waited on.

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::reasoner::QueryResult;
use crate::store::bind_row;
use crate::term::{Bindings, Literal};

/// Overall result of an answer-set computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspOutcome {
    Satisfiable,
    Unsatisfiable,
    Interrupted,
    /// The solver output could not be read or announced no result
    Error,
}

impl fmt::Display for AspOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AspOutcome::Satisfiable => "SATISFIABLE",
            AspOutcome::Unsatisfiable => "UNSATISFIABLE",
            AspOutcome::Interrupted => "INTERRUPTED",
            AspOutcome::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Bidirectional map between ground literals and solver atoms `1..=len`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralTable {
    literals: IndexSet<Literal>,
}

impl LiteralTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atom of `literal`, allocating the next one on first use
    pub fn insert(&mut self, literal: Literal) -> usize {
        self.literals.insert_full(literal).0 + 1
    }

    pub fn index_of(&self, literal: &Literal) -> Option<usize> {
        self.literals.get_index_of(literal).map(|i| i + 1)
    }

    /// Literal of atom `index`; atoms start at 1
    pub fn get(&self, index: usize) -> Option<&Literal> {
        index.checked_sub(1).and_then(|i| self.literals.get_index(i))
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// `(atom, literal)` pairs in atom order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Literal)> {
        self.literals.iter().enumerate().map(|(i, l)| (i + 1, l))
    }
}

impl FromIterator<Literal> for LiteralTable {
    fn from_iter<I: IntoIterator<Item = Literal>>(iter: I) -> Self {
        LiteralTable {
            literals: iter.into_iter().collect(),
        }
    }
}

/// One stable model: a truth value for every literal of the table
#[derive(Clone)]
pub struct AnswerSet {
    table: Arc<LiteralTable>,
    truth: Vec<bool>,
}

impl AnswerSet {
    /// Parse a model line of space-separated atoms
    ///
    /// A positive atom is true, a negative one false. Atoms outside the
    /// table are skipped with a warning.
    pub fn parse(line: &str, table: Arc<LiteralTable>) -> Self {
        let mut truth = vec![false; table.len()];
        for token in line.split_whitespace() {
            match token.parse::<i64>() {
                Ok(0) => {}
                Ok(atom) => {
                    let index = atom.unsigned_abs() as usize;
                    if index <= truth.len() {
                        truth[index - 1] = atom > 0;
                    } else {
                        warn!(atom, "answer set refers to an unknown atom");
                    }
                }
                Err(_) => warn!(token, "skipping malformed answer set token"),
            }
        }
        AnswerSet { table, truth }
    }

    /// Check whether `literal` is true in this model
    pub fn is_true(&self, literal: &Literal) -> bool {
        self.table
            .index_of(literal)
            .map_or(false, |atom| self.truth[atom - 1])
    }

    /// Literals true in this model, in atom order
    pub fn true_literals(&self) -> impl Iterator<Item = &Literal> + '_ {
        self.table
            .iter()
            .filter(move |(atom, _)| self.truth[atom - 1])
            .map(|(_, literal)| literal)
    }

    /// Number of true literals
    pub fn len(&self) -> usize {
        self.truth.iter().filter(|t| **t).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arguments of every true literal matching a positive query
    pub fn query<'a>(&'a self, query: &'a Literal) -> impl Iterator<Item = QueryResult> + 'a {
        self.true_literals().filter_map(move |literal| {
            if literal.predicate() != query.predicate() || query.is_negated() {
                return None;
            }
            let mut bindings = Bindings::default();
            let mut bound = Vec::new();
            bind_row(query.arguments(), literal.arguments(), &mut bindings, &mut bound)
                .then(|| QueryResult::from(literal.arguments().to_vec()))
        })
    }
}

impl fmt::Debug for AnswerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.true_literals()).finish()
    }
}

impl PartialEq for AnswerSet {
    fn eq(&self, other: &Self) -> bool {
        self.true_literals().eq(other.true_literals())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Looking for markers and answer blocks
    Reading,
    /// A terminal marker, the answer limit or the end of the stream was reached
    Done,
}

/// Lazy sequence of answer sets read from solver output
pub struct AnswerSetIter<R> {
    reader: Option<R>,
    table: Arc<LiteralTable>,
    phase: Phase,
    outcome: Option<AspOutcome>,
    pending: VecDeque<AnswerSet>,
    seen: usize,
    limit: usize,
}

impl<R: BufRead> AnswerSetIter<R> {
    /// Read answer sets from `reader`; `limit = 0` reads all of them
    pub fn new(reader: R, table: Arc<LiteralTable>, limit: usize) -> Self {
        AnswerSetIter {
            reader: Some(reader),
            table,
            phase: Phase::Reading,
            outcome: None,
            pending: VecDeque::new(),
            seen: 0,
            limit,
        }
    }

    /// An empty sequence with outcome `ERROR`
    pub fn error(table: Arc<LiteralTable>) -> Self {
        AnswerSetIter {
            reader: None,
            table,
            phase: Phase::Done,
            outcome: Some(AspOutcome::Error),
            pending: VecDeque::new(),
            seen: 0,
            limit: 0,
        }
    }

    /// The overall outcome, reading ahead only until it is known
    pub fn outcome(&mut self) -> AspOutcome {
        while self.outcome.is_none() && self.phase == Phase::Reading {
            if let Some(answer) = self.advance() {
                self.pending.push_back(answer);
            }
        }
        self.outcome.unwrap_or(AspOutcome::Error)
    }

    /// Number of answer sets read from the stream so far
    pub fn answers_read(&self) -> usize {
        self.seen
    }

    fn finish(&mut self, outcome: AspOutcome) {
        self.outcome.get_or_insert(outcome);
        self.phase = Phase::Done;
        // Dropping the reader releases the solver process
        self.reader = None;
        debug!(outcome = %self.outcome.unwrap_or(outcome), answers = self.seen, "answer-set stream closed");
    }

    fn read_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                if self.outcome.is_none() {
                    warn!(answers = self.seen, "solver output ended without an outcome marker");
                }
                self.finish(AspOutcome::Error);
                None
            }
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "cannot read solver output");
                self.outcome = Some(AspOutcome::Error);
                self.finish(AspOutcome::Error);
                None
            }
        }
    }

    /// Consume lines until an answer set or the end of the stream
    fn advance(&mut self) -> Option<AnswerSet> {
        while self.phase == Phase::Reading {
            let line = self.read_line()?;
            if line.starts_with("SATISFIABLE") {
                self.outcome = Some(AspOutcome::Satisfiable);
                if self.seen > 0 {
                    self.finish(AspOutcome::Satisfiable);
                }
            } else if line.starts_with("UNSATISFIABLE") {
                self.outcome = Some(AspOutcome::Unsatisfiable);
                self.finish(AspOutcome::Unsatisfiable);
            } else if line.starts_with("INTERRUPTED") {
                self.outcome = Some(AspOutcome::Interrupted);
                self.finish(AspOutcome::Interrupted);
            } else if line.starts_with("Answer: ") {
                let model = self.read_line()?;
                self.seen += 1;
                let answer = AnswerSet::parse(&model, self.table.clone());
                if self.limit > 0 && self.seen >= self.limit {
                    self.finish(AspOutcome::Satisfiable);
                }
                return Some(answer);
            }
        }
        None
    }
}

impl<R: BufRead> Iterator for AnswerSetIter<R> {
    type Item = AnswerSet;

    fn next(&mut self) -> Option<AnswerSet> {
        if let Some(answer) = self.pending.pop_front() {
            return Some(answer);
        }
        self.advance()
    }
}

impl<R> fmt::Debug for AnswerSetIter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerSetIter")
            .field("phase", &self.phase)
            .field("outcome", &self.outcome)
            .field("answers_read", &self.seen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    use crate::term::Term;

    fn lit(name: &str, arg: &str) -> Literal {
        Literal::atom(name, vec![Term::constant(arg).unwrap()]).unwrap()
    }

    fn table() -> Arc<LiteralTable> {
        Arc::new([lit("p", "a"), lit("q", "b")].into_iter().collect())
    }

    fn iter(input: &str) -> AnswerSetIter<Cursor<Vec<u8>>> {
        AnswerSetIter::new(Cursor::new(input.as_bytes().to_vec()), table(), 0)
    }

    #[test]
    fn test_satisfiable_before_answer() {
        let mut answers = iter("SATISFIABLE\nAnswer: 1\n1 2\n");
        assert_eq!(answers.outcome(), AspOutcome::Satisfiable);
        let all: Vec<AnswerSet> = answers.collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_true(&lit("p", "a")));
        assert!(all[0].is_true(&lit("q", "b")));
    }

    #[test]
    fn test_solver_style_output() {
        let input = "clingo version 5.6.2\nReading from stdin\nSolving...\n\
                     Answer: 1\n1\nAnswer: 2\n2\nSATISFIABLE\n\nModels       : 2\n";
        let mut answers = iter(input);
        let all: Vec<AnswerSet> = answers.by_ref().collect();
        assert_eq!(all.len(), 2);
        assert!(all[0].is_true(&lit("p", "a")));
        assert!(!all[0].is_true(&lit("q", "b")));
        assert_eq!(all[1].true_literals().collect::<Vec<_>>(), vec![&lit("q", "b")]);
        assert_eq!(answers.outcome(), AspOutcome::Satisfiable);
    }

    #[test]
    fn test_truncated_stream_is_error() {
        let mut answers = iter("Answer: 1\n1\n");
        assert_eq!(answers.outcome(), AspOutcome::Error);
        assert_eq!(answers.answers_read(), 1);
        assert_eq!(answers.count(), 1);
    }

    #[test]
    fn test_answer_marker_needs_space() {
        let mut answers = iter("Answer:1\n1\nSATISFIABLE\n");
        assert_eq!(answers.next(), None);
        assert_eq!(answers.outcome(), AspOutcome::Satisfiable);
        assert_eq!(answers.answers_read(), 0);
    }

    #[test]
    fn test_unsatisfiable() {
        let mut answers = iter("UNSATISFIABLE\n");
        assert_eq!(answers.outcome(), AspOutcome::Unsatisfiable);
        assert_eq!(answers.count(), 0);
    }

    #[test]
    fn test_interrupted() {
        let mut answers = iter("INTERRUPTED\n");
        assert_eq!(answers.outcome(), AspOutcome::Interrupted);
        assert!(answers.next().is_none());
    }

    #[test]
    fn test_empty_input_is_error() {
        let mut answers = iter("");
        assert_eq!(answers.outcome(), AspOutcome::Error);
        assert!(answers.next().is_none());
    }

    #[test]
    fn test_garbage_is_error() {
        let mut answers = iter("segmentation fault\n");
        assert_eq!(answers.outcome(), AspOutcome::Error);
    }

    #[test]
    fn test_limit_stops_reading() {
        let mut answers = AnswerSetIter::new(
            Cursor::new(b"Answer: 1\n1\nAnswer: 2\n2\nSATISFIABLE\n".to_vec()),
            table(),
            1,
        );
        assert_eq!(answers.next().map(|a| a.len()), Some(1));
        assert!(answers.next().is_none());
        assert_eq!(answers.outcome(), AspOutcome::Satisfiable);
        assert_eq!(answers.answers_read(), 1);
    }

    #[test]
    fn test_unknown_atoms_are_skipped() {
        let answer = AnswerSet::parse("1 7 -2 x", table());
        assert_eq!(answer.len(), 1);
        assert!(answer.is_true(&lit("p", "a")));
        assert!(!answer.is_true(&lit("r", "c")));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "solver died"))
        }
    }

    #[test]
    fn test_read_failure_is_error() {
        let mut answers = AnswerSetIter::new(io::BufReader::new(FailingReader), table(), 0);
        assert_eq!(answers.outcome(), AspOutcome::Error);
        assert_eq!(answers.count(), 0);
    }

    #[test]
    fn test_query() {
        let answer = AnswerSet::parse("1 2", table());
        let query = Literal::atom("p", vec![Term::universal("x").unwrap()]).unwrap();
        let results: Vec<QueryResult> = answer.query(&query).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].to_string(), "[a]");
    }
}

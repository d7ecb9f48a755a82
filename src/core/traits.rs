//! Collaborator trait abstractions for chasekit
//!
//! This module defines the seams where external components plug in:
//! - Data sources supplying facts for a predicate at load time
//! - Answer-set solvers consuming a ground program
//! - Observable chase hooks

use std::fmt::Debug;
use std::io::BufRead;

use crate::error::ChaseResult;
use crate::term::{Literal, Predicate, Rule, Term};

// ============================================================================
// Data Sources
// ============================================================================

/// A supplier of facts for one predicate
///
/// A data source is bound to a predicate in the knowledge base and read once
/// when materialization starts. Every row must have the predicate's arity and
/// contain only constants; the knowledge base validates this on load.
pub trait DataSource: Send + Sync + Debug {
    /// Short description used in logs and errors
    fn name(&self) -> &str;

    /// All rows this source supplies for `predicate`
    fn load(&self, predicate: &Predicate) -> ChaseResult<Vec<Vec<Term>>>;
}

// ============================================================================
// Answer-Set Solving
// ============================================================================

/// An external answer-set solver
///
/// `solve` receives a ground program in the solver's input format and returns
/// the solver's textual output as a stream. The stream is read incrementally;
/// implementations backed by a child process must tolerate the reader
/// dropping the stream before the process exits.
pub trait AnswerSetSolver: Send + Sync {
    /// Name of this solver
    fn name(&self) -> &str;

    /// Start solving; `max_models = 0` asks for every model
    fn solve(&self, program: &str, max_models: usize) -> ChaseResult<Box<dyn BufRead + Send>>;
}

// ============================================================================
// Chase Observation
// ============================================================================

/// Callbacks invoked by the chase engine during materialization
///
/// All methods default to no-ops, so implementors only override the events
/// they care about.
pub trait ChaseHook: Send + Sync {
    /// Called when a rule application adds a new fact
    fn on_fact_derived(&self, _fact: &Literal, _rule: &Rule) {}

    /// Called when a round of a stratum finishes
    fn on_round_complete(&self, _stratum: usize, _round: u32, _new_facts: usize) {}

    /// Called once when materialization stops
    fn on_finished(&self, _total_facts: usize, _interrupted: bool) {}
}

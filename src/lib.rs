//! chasekit - chase-based reasoning for existential rules
//!
//! Materializes the consequences of facts and existential rules with the
//! restricted or skolem chase, answers queries over the result, and hands
//! programs with non-stratified negation to an answer-set solver.
//!
//! # Architecture
//!
//! The crate is organized around a few seams:
//!
//! - [`core::DataSource`] - Supplier of facts for a predicate at load time
//! - [`core::AnswerSetSolver`] - External solver consuming a ground program
//! - [`core::ChaseHook`] - Observer of derived facts and chase rounds
//! - [`reasoning::ChaseStrategy`] - Per-trigger policy of a chase variant
//!
//! # Features
//!
//! - Restricted and skolem chase with semi-naive evaluation
//! - EDB/IDB separation with configurable conflict policy
//! - Rule reliance analysis and stratified negation
//! - Cooperative timeouts reported as `INTERRUPTED`
//! - Answer-set extraction through clingo
//!
//! # Example
//!
//! ```rust
//! use chasekit::{KnowledgeBase, Literal, Reasoner, ReasoningState, Rule, Term};
//!
//! let x = Term::universal("x").unwrap();
//! let mut kb = KnowledgeBase::new();
//! kb.add_fact(Literal::atom("human", vec![Term::constant("socrates").unwrap()]).unwrap())
//!     .unwrap();
//! kb.add_rule(
//!     Rule::new(
//!         vec![Literal::atom("mortal", vec![x.clone()]).unwrap()],
//!         vec![Literal::atom("human", vec![x.clone()]).unwrap()],
//!     )
//!     .unwrap(),
//! )
//! .unwrap();
//!
//! let mut reasoner = Reasoner::new(kb);
//! assert_eq!(reasoner.reason().unwrap(), ReasoningState::Materialized);
//!
//! let query = Literal::atom("mortal", vec![x]).unwrap();
//! assert_eq!(reasoner.count_query_answers(&query, true).unwrap(), 1);
//! ```

pub mod asp;
pub mod config;
pub mod core;
pub mod error;
pub mod kb;
pub mod reasoner;
pub mod reasoning;
pub mod reliance;
pub mod store;
pub mod term;

// Re-export collaborator traits
pub use crate::core::{AnswerSetSolver, ChaseHook, DataSource};

// Re-export term types
pub use term::{substitute, Bindings, Literal, Predicate, Rule, Term, TermKind};

// Re-export knowledge base types
pub use kb::{InMemoryDataSource, KnowledgeBase, PredicateRole, Program, EDB_SUFFIX};

// Re-export store types
pub use store::{FactStore, Window};

// Re-export chase types
pub use reasoning::{
    ChaseEngine, ChaseOutcome, ChaseStats, ChaseStrategy, Materialization, RestrictedChase,
    SkolemChase, SkolemTable,
};

// Re-export reliance types
pub use reliance::{RelianceAnalyzer, RelianceGraph, RelianceWitness, VariableRenamer};

// Re-export reasoner types
pub use reasoner::{QueryAnswers, QueryResult, Reasoner, ReasoningState};

// Re-export answer-set types
pub use asp::{
    AnswerSet, AnswerSetIter, AspOutcome, AspReasoner, ClingoSolver, GroundProgram, LiteralTable,
};

// Re-export configuration types
pub use config::{
    ChaseAlgorithm, ChaseConfig, ConfigError, GeneralConfig, LogLevel, ReasoningConfig,
    SeparationPolicy, SolverConfig,
};

// Re-export error types
pub use error::{ChaseError, ChaseResult, ErrorCode, ErrorContext};

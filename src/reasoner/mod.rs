//! Reasoner state machine
//!
//! A `Reasoner` owns a knowledge base for one reasoning session:
//! - `reason()` checks the EDB/IDB separation, seals the knowledge base and
//!   runs the chase
//! - the resulting state tells a fixpoint apart from a timeout or a fault
//! - queries are answered only from a complete materialization
//! - `reset()` discards the result and makes the knowledge base editable again

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ReasoningConfig;
use crate::core::ChaseHook;
use crate::error::{ChaseError, ChaseResult};
use crate::kb::KnowledgeBase;
use crate::reasoning::{ChaseEngine, ChaseOutcome, ChaseStats};
use crate::store::FactStore;
use crate::term::Literal;

mod query;

pub use query::{QueryAnswers, QueryResult};

/// Lifecycle of a reasoning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasoningState {
    /// `reason()` has not been called since creation or the last reset
    NotStarted,
    /// Materialization is running
    Materializing,
    /// The chase reached a fixpoint
    Materialized,
    /// The timeout expired before a fixpoint
    Interrupted,
    /// A reasoning fault aborted materialization
    Error,
    /// The answer-set solver found no model
    Unsatisfiable,
}

impl ReasoningState {
    /// Check whether reasoning has stopped in this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReasoningState::NotStarted | ReasoningState::Materializing)
    }

    /// Check whether results may be queried
    pub fn is_complete(&self) -> bool {
        matches!(self, ReasoningState::Materialized)
    }
}

impl fmt::Display for ReasoningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReasoningState::NotStarted => "NOT_STARTED",
            ReasoningState::Materializing => "MATERIALIZING",
            ReasoningState::Materialized => "MATERIALIZED",
            ReasoningState::Interrupted => "INTERRUPTED",
            ReasoningState::Error => "ERROR",
            ReasoningState::Unsatisfiable => "UNSATISFIABLE",
        };
        f.write_str(name)
    }
}

/// Chase-based reasoner over a knowledge base
pub struct Reasoner {
    kb: KnowledgeBase,
    config: ReasoningConfig,
    hook: Option<Arc<dyn ChaseHook>>,
    state: ReasoningState,
    store: FactStore,
    stats: ChaseStats,
    last_error: Option<ChaseError>,
}

impl fmt::Debug for Reasoner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reasoner")
            .field("state", &self.state)
            .field("facts", &self.kb.fact_count())
            .field("rules", &self.kb.rule_count())
            .field("materialized", &self.store.len())
            .finish()
    }
}

impl Reasoner {
    /// Create a reasoner with default settings
    pub fn new(kb: KnowledgeBase) -> Self {
        Self::with_config(kb, ReasoningConfig::default())
    }

    /// Create a reasoner with custom settings
    pub fn with_config(kb: KnowledgeBase, config: ReasoningConfig) -> Self {
        Reasoner {
            kb,
            config,
            hook: None,
            state: ReasoningState::NotStarted,
            store: FactStore::new(),
            stats: ChaseStats::default(),
            last_error: None,
        }
    }

    /// Observe the chase of subsequent `reason()` calls
    pub fn with_hook(mut self, hook: Arc<dyn ChaseHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    pub fn state(&self) -> ReasoningState {
        self.state
    }

    /// The fault that moved the reasoner to `ERROR`, if any
    pub fn last_error(&self) -> Option<&ChaseError> {
        self.last_error.as_ref()
    }

    /// Statistics of the last materialization
    pub fn stats(&self) -> &ChaseStats {
        &self.stats
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Mutable access; additions fail while the knowledge base is sealed
    pub fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    pub fn into_knowledge_base(mut self) -> KnowledgeBase {
        self.kb.unseal();
        self.kb
    }

    /// Materialize the knowledge base
    ///
    /// Only allowed in `NOT_STARTED`. A separation violation or a failing
    /// data source leaves the state unchanged. A reasoning fault moves the
    /// reasoner to `ERROR`; the error is returned and kept in `last_error`.
    pub fn reason(&mut self) -> ChaseResult<ReasoningState> {
        if self.state != ReasoningState::NotStarted {
            return Err(ChaseError::illegal_state("reason", self.state)
                .with_hint("call reset() before reasoning again"));
        }

        let program = self.kb.prepare(self.config.separation_policy)?;
        self.kb.seal();
        self.state = ReasoningState::Materializing;
        debug!(
            facts = program.facts.len(),
            rules = program.rules.len(),
            algorithm = self.config.algorithm.as_str(),
            "reasoning started"
        );

        let mut engine = ChaseEngine::new(&self.config);
        if let Some(hook) = &self.hook {
            engine = engine.with_hook(hook.clone());
        }

        match engine.run(&program) {
            Ok(result) => {
                self.state = match result.outcome {
                    ChaseOutcome::Fixpoint => ReasoningState::Materialized,
                    ChaseOutcome::Interrupted => ReasoningState::Interrupted,
                };
                self.store = result.store;
                self.stats = result.stats;
                info!(state = %self.state, facts = self.store.len(), "reasoning finished");
                Ok(self.state)
            }
            Err(err) => {
                warn!(error = %err, "reasoning failed");
                self.state = ReasoningState::Error;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Discard the materialization and make the knowledge base editable
    pub fn reset(&mut self) {
        debug!(state = %self.state, "reasoner reset");
        self.state = ReasoningState::NotStarted;
        self.store.clear();
        self.stats = ChaseStats::default();
        self.last_error = None;
        self.kb.unseal();
    }

    fn ensure_materialized(&self, operation: &str) -> ChaseResult<()> {
        if self.state.is_complete() {
            Ok(())
        } else {
            Err(ChaseError::illegal_state(operation, self.state))
        }
    }

    /// Answers to a positive query literal, lazily
    ///
    /// With `include_nulls = false`, answers containing generated witnesses
    /// are skipped.
    pub fn answer_query(&self, query: &Literal, include_nulls: bool) -> ChaseResult<QueryAnswers<'_>> {
        self.ensure_materialized("answer a query")?;
        QueryAnswers::new(&self.store, query, include_nulls)
    }

    /// Answers to a query, with nulls as the configuration's `include_nulls` says
    pub fn query(&self, query: &Literal) -> ChaseResult<QueryAnswers<'_>> {
        self.answer_query(query, self.config.include_nulls)
    }

    /// Number of answers to a query
    pub fn count_query_answers(&self, query: &Literal, include_nulls: bool) -> ChaseResult<usize> {
        Ok(self.answer_query(query, include_nulls)?.count())
    }

    /// Every materialized fact
    pub fn materialized_facts(&self) -> ChaseResult<impl Iterator<Item = Literal> + '_> {
        self.ensure_materialized("list materialized facts")?;
        Ok(self.store.literals())
    }
}

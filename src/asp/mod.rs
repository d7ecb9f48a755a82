//! Answer-set reasoning for rules with negation
//!
//! The `AspReasoner` handles programs whose negation is not meant to be
//! stratified:
//! 1. Drop negated body literals to get a positive over-approximation
//! 2. Materialize it with the skolem chase
//! 3. Ground the original rules over that materialization
//! 4. Hand the ground program to an answer-set solver
//!
//! Queries are answered from the cautious consequences, the literals true in
//! every answer set.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ChaseAlgorithm, ChaseConfig};
use crate::core::AnswerSetSolver;
use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::kb::{KnowledgeBase, Program};
use crate::reasoner::{QueryAnswers, ReasoningState};
use crate::reasoning::{ChaseEngine, ChaseOutcome, ChaseStats, SkolemChase};
use crate::store::FactStore;
use crate::term::{Literal, Rule};

mod answer_set;
mod grounding;
mod solver;

pub use answer_set::{AnswerSet, AnswerSetIter, AspOutcome, LiteralTable};
pub use grounding::{GroundProgram, GroundRule};
pub use solver::ClingoSolver;

/// Answer sets streamed from a solver
pub type SolverAnswerSets = AnswerSetIter<Box<dyn std::io::BufRead + Send>>;

/// `rule` without its negated body literals
fn positive_rule(rule: &Rule) -> ChaseResult<Rule> {
    Rule::new(rule.head().to_vec(), rule.positive_body().cloned().collect()).map_err(|e| {
        ChaseError::reasoning(format!(
            "rule {} needs its negated literals to bind head variables",
            rule
        ))
        .with_code(ErrorCode::UnsafeNegation)
        .with_context("rule", rule.to_string())
        .with_cause(e.message)
    })
}

/// The positive over-approximation of a program, rule order preserved
pub(crate) fn positive_program(program: &Program) -> ChaseResult<Program> {
    Ok(Program {
        facts: program.facts.clone(),
        rules: program
            .rules
            .iter()
            .map(positive_rule)
            .collect::<ChaseResult<Vec<_>>>()?,
    })
}

/// Reasoner computing answer sets through an external solver
pub struct AspReasoner {
    kb: KnowledgeBase,
    config: ChaseConfig,
    solver: Arc<dyn AnswerSetSolver>,
    state: ReasoningState,
    ground: Option<GroundProgram>,
    table: Arc<LiteralTable>,
    cautious: FactStore,
    stats: ChaseStats,
    last_error: Option<ChaseError>,
}

impl fmt::Debug for AspReasoner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspReasoner")
            .field("solver", &self.solver.name())
            .field("state", &self.state)
            .field("atoms", &self.table.len())
            .field("cautious", &self.cautious.len())
            .finish()
    }
}

impl AspReasoner {
    /// Create a reasoner using clingo with default settings
    pub fn new(kb: KnowledgeBase) -> Self {
        let config = ChaseConfig::default();
        let solver = Arc::new(ClingoSolver::from_config(&config.solver));
        Self::with_solver(kb, config, solver)
    }

    /// Create a reasoner with custom settings and solver
    pub fn with_solver(
        kb: KnowledgeBase,
        config: ChaseConfig,
        solver: Arc<dyn AnswerSetSolver>,
    ) -> Self {
        AspReasoner {
            kb,
            config,
            solver,
            state: ReasoningState::NotStarted,
            ground: None,
            table: Arc::new(LiteralTable::new()),
            cautious: FactStore::new(),
            stats: ChaseStats::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> ReasoningState {
        self.state
    }

    pub fn last_error(&self) -> Option<&ChaseError> {
        self.last_error.as_ref()
    }

    /// Statistics of the over-approximation chase
    pub fn stats(&self) -> &ChaseStats {
        &self.stats
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    /// The ground program of the last successful grounding
    pub fn ground_program(&self) -> Option<&GroundProgram> {
        self.ground.as_ref()
    }

    /// The knowledge base with every negated body literal removed
    pub fn datalog_knowledge_base(&self) -> ChaseResult<KnowledgeBase> {
        let program = positive_program(&self.kb.prepare(self.config.reasoning.separation_policy)?)?;
        let mut kb = KnowledgeBase::new();
        kb.add_facts(program.facts)?;
        kb.add_rules(program.rules)?;
        Ok(kb)
    }

    /// Ground the program and ask the solver whether it has a model
    ///
    /// On `MATERIALIZED` the cautious consequences are computed as well.
    pub fn reason(&mut self) -> ChaseResult<ReasoningState> {
        if self.state != ReasoningState::NotStarted {
            return Err(ChaseError::illegal_state("reason", self.state)
                .with_hint("call reset() before reasoning again"));
        }
        let program = self.kb.prepare(self.config.reasoning.separation_policy)?;
        self.kb.seal();
        self.state = ReasoningState::Materializing;

        match self.solve(&program) {
            Ok(state) => {
                self.state = state;
                info!(state = %state, atoms = self.table.len(), cautious = self.cautious.len(), "answer-set reasoning finished");
                Ok(state)
            }
            Err(err) => {
                warn!(error = %err, "answer-set reasoning failed");
                self.state = ReasoningState::Error;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn solve(&mut self, program: &Program) -> ChaseResult<ReasoningState> {
        let over = positive_program(program)?;
        let engine = ChaseEngine::new(&self.config.reasoning).with_algorithm(ChaseAlgorithm::Skolem);
        let mut chase = SkolemChase::new();
        let materialization = engine.run_with(&over, &mut chase)?;
        self.stats = materialization.stats;
        if materialization.outcome == ChaseOutcome::Interrupted {
            return Ok(ReasoningState::Interrupted);
        }

        let mut skolem = chase.into_table();
        let ground = GroundProgram::ground(program, &materialization.store, &mut skolem)?;
        debug!(atoms = ground.atom_count(), rules = ground.rule_count(), "program grounded");
        self.table = Arc::new(ground.table().clone());
        self.ground = Some(ground);

        let mut first = self.run_solver(1);
        match first.outcome() {
            AspOutcome::Satisfiable => {}
            AspOutcome::Unsatisfiable => return Ok(ReasoningState::Unsatisfiable),
            AspOutcome::Interrupted => return Ok(ReasoningState::Interrupted),
            AspOutcome::Error => {
                return Err(ChaseError::upstream(format!(
                    "solver `{}` reported no result",
                    self.solver.name()
                )))
            }
        }
        drop(first);

        let mut all = self.run_solver(0);
        let cautious = cautious_of(all.by_ref(), &self.table);
        match all.outcome() {
            AspOutcome::Satisfiable => {
                self.cautious = cautious;
                Ok(ReasoningState::Materialized)
            }
            AspOutcome::Interrupted => Ok(ReasoningState::Interrupted),
            AspOutcome::Error => Err(ChaseError::upstream(format!(
                "solver `{}` stopped after {} answer set(s) without reporting a result",
                self.solver.name(),
                all.answers_read()
            ))
            .with_hint("the solver output was truncated; its models are incomplete")),
            outcome => Err(ChaseError::upstream(format!(
                "solver `{}` changed its answer to {} while enumerating",
                self.solver.name(),
                outcome
            ))),
        }
    }

    fn run_solver(&self, limit: usize) -> SolverAnswerSets {
        let Some(ground) = &self.ground else {
            return AnswerSetIter::error(self.table.clone());
        };
        match self.solver.solve(&ground.to_aspif(), limit) {
            Ok(reader) => AnswerSetIter::new(reader, self.table.clone(), limit),
            Err(e) => {
                warn!(error = %e, solver = self.solver.name(), "solver unavailable");
                AnswerSetIter::error(self.table.clone())
            }
        }
    }

    /// Every answer set
    pub fn answer_sets(&self) -> ChaseResult<SolverAnswerSets> {
        self.answer_sets_limited(self.config.solver.max_answer_sets)
    }

    /// At most `maximum` answer sets; `0` means unbounded
    ///
    /// A solver failure shows up as the `ERROR` outcome of the sequence.
    pub fn answer_sets_limited(&self, maximum: usize) -> ChaseResult<SolverAnswerSets> {
        match self.state {
            ReasoningState::Materialized | ReasoningState::Unsatisfiable => {
                Ok(self.run_solver(maximum))
            }
            state => Err(ChaseError::illegal_state("enumerate answer sets", state)),
        }
    }

    /// Literals true in every answer set
    pub fn cautious_consequences(&self) -> ChaseResult<impl Iterator<Item = Literal> + '_> {
        self.ensure_materialized("list cautious consequences")?;
        Ok(self.cautious.literals())
    }

    /// Answers to a query among the cautious consequences
    pub fn answer_query(&self, query: &Literal, include_nulls: bool) -> ChaseResult<QueryAnswers<'_>> {
        self.ensure_materialized("answer a query")?;
        QueryAnswers::new(&self.cautious, query, include_nulls)
    }

    /// Answers among the cautious consequences, with nulls as configured
    pub fn query(&self, query: &Literal) -> ChaseResult<QueryAnswers<'_>> {
        self.answer_query(query, self.config.reasoning.include_nulls)
    }

    fn ensure_materialized(&self, operation: &str) -> ChaseResult<()> {
        if self.state.is_complete() {
            Ok(())
        } else {
            Err(ChaseError::illegal_state(operation, self.state))
        }
    }

    /// Discard results and make the knowledge base editable
    pub fn reset(&mut self) {
        self.state = ReasoningState::NotStarted;
        self.ground = None;
        self.table = Arc::new(LiteralTable::new());
        self.cautious.clear();
        self.stats = ChaseStats::default();
        self.last_error = None;
        self.kb.unseal();
    }
}

/// Intersection of all answer sets, as facts
fn cautious_of(answers: impl Iterator<Item = AnswerSet>, table: &LiteralTable) -> FactStore {
    let mut common: Option<Vec<bool>> = None;
    for answer in answers {
        let truth: Vec<bool> = table.iter().map(|(_, l)| answer.is_true(l)).collect();
        common = Some(match common {
            None => truth,
            Some(prev) => prev.iter().zip(&truth).map(|(a, b)| *a && *b).collect(),
        });
    }

    let mut store = FactStore::new();
    if let Some(common) = common {
        for ((_, literal), keep) in table.iter().zip(common) {
            if keep {
                store.add_literal(literal, 0);
            }
        }
    }
    store
}

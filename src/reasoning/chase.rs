//! Chase engine
//!
//! Materializes a program by semi-naive evaluation, one stratum at a time:
//! 1. Order the rules into strata using the reliance graph
//! 2. Evaluate every rule of a stratum once against all known facts
//! 3. Re-evaluate rules only on matches that use a fact from the previous round
//! 4. Stop at a fixpoint, on a reasoning fault, or when the timeout expires

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashSet;
use tracing::{debug, info, info_span, trace, warn};

use crate::config::{ChaseAlgorithm, ReasoningConfig};
use crate::core::ChaseHook;
use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::kb::Program;
use crate::reliance::{RelianceAnalyzer, RelianceGraph};
use crate::store::{FactStore, Window};
use crate::term::{Bindings, Literal, Rule};

use super::strategy::{strategy_for, ChaseStats, ChaseStrategy, Trigger};

/// How a chase run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseOutcome {
    /// No trigger can add a fact
    Fixpoint,
    /// The timeout expired first; the facts are a partial result
    Interrupted,
}

/// The facts computed by a chase run
#[derive(Debug, Clone)]
pub struct Materialization {
    pub store: FactStore,
    pub outcome: ChaseOutcome,
    pub stats: ChaseStats,
}

/// Drives a chase strategy to a fixpoint
#[derive(Clone)]
pub struct ChaseEngine {
    algorithm: ChaseAlgorithm,
    timeout: Option<Duration>,
    use_reliances: bool,
    hook: Option<Arc<dyn ChaseHook>>,
}

impl fmt::Debug for ChaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaseEngine")
            .field("algorithm", &self.algorithm)
            .field("timeout", &self.timeout)
            .field("use_reliances", &self.use_reliances)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Default for ChaseEngine {
    fn default() -> Self {
        Self::new(&ReasoningConfig::default())
    }
}

impl ChaseEngine {
    /// Create an engine from reasoning settings
    pub fn new(config: &ReasoningConfig) -> Self {
        ChaseEngine {
            algorithm: config.algorithm,
            timeout: config.timeout(),
            use_reliances: config.use_reliances,
            hook: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: ChaseAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the timeout; `None` lets the chase run until a fixpoint
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reliances(mut self, use_reliances: bool) -> Self {
        self.use_reliances = use_reliances;
        self
    }

    /// Install a hook observing derived facts
    pub fn with_hook(mut self, hook: Arc<dyn ChaseHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn algorithm(&self) -> ChaseAlgorithm {
        self.algorithm
    }

    /// Materialize a program with the configured variant
    pub fn run(&self, program: &Program) -> ChaseResult<Materialization> {
        let mut strategy = strategy_for(self.algorithm);
        self.run_with(program, strategy.as_mut())
    }

    /// Materialize a program with an explicit strategy
    ///
    /// Fails with `UnstratifiableNegation` before any rule fires, or with
    /// `UnsafeNegation` at the first trigger of a rule whose negated literal
    /// is not bound by the positive body.
    pub fn run_with(
        &self,
        program: &Program,
        strategy: &mut dyn ChaseStrategy,
    ) -> ChaseResult<Materialization> {
        let started = Instant::now();
        let span = info_span!(
            "chase",
            strategy = strategy.name(),
            rules = program.rules.len(),
            facts = program.facts.len()
        );
        let _guard = span.enter();

        let mut store = FactStore::new();
        for fact in &program.facts {
            store.add_literal(fact, 0);
        }

        let graph = RelianceAnalyzer::new().graph(&program.rules);
        let strata = graph.strata().map_err(|e| {
            warn!(error = %e, "cannot stratify rule set");
            e
        })?;
        info!(strata = strata.len(), initial_facts = store.len(), "materialization started");

        let mut run = ChaseRun {
            program,
            graph: &graph,
            strategy,
            hook: self.hook.as_deref(),
            use_reliances: self.use_reliances,
            deadline: self.timeout.map(|t| started + t),
            store,
            stats: ChaseStats::default(),
            round: 0,
        };

        let mut halted = None;
        for (index, stratum) in strata.iter().enumerate() {
            if let Err(halt) = run.stratum(index, stratum) {
                halted = Some(halt);
                break;
            }
        }

        let outcome = match halted {
            None => ChaseOutcome::Fixpoint,
            Some(Halt::Interrupted) => {
                warn!(
                    timeout_ms = self.timeout.map_or(0, |t| t.as_millis() as u64),
                    facts = run.store.len(),
                    "materialization interrupted by timeout"
                );
                ChaseOutcome::Interrupted
            }
            Some(Halt::Fault(err)) => {
                warn!(error = %err, "reasoning fault");
                return Err(err);
            }
        };

        let mut stats = run.stats;
        stats.nulls_introduced = run.strategy.nulls_introduced();
        stats.elapsed = started.elapsed();
        let store = run.store;

        if let Some(hook) = &self.hook {
            hook.on_finished(store.len(), outcome == ChaseOutcome::Interrupted);
        }
        info!(
            facts = store.len(),
            derived = stats.facts_derived,
            rounds = stats.rounds,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            ?outcome,
            "materialization finished"
        );

        Ok(Materialization {
            store,
            outcome,
            stats,
        })
    }
}

enum Halt {
    Interrupted,
    Fault(ChaseError),
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.map_or(false, |d| Instant::now() >= d)
}

struct ChaseRun<'a> {
    program: &'a Program,
    graph: &'a RelianceGraph,
    strategy: &'a mut dyn ChaseStrategy,
    hook: Option<&'a dyn ChaseHook>,
    use_reliances: bool,
    deadline: Option<Instant>,
    store: FactStore,
    stats: ChaseStats,
    round: u32,
}

impl<'a> ChaseRun<'a> {
    fn stratum(&mut self, index: usize, rules: &[usize]) -> Result<(), Halt> {
        self.stats.strata += 1;
        debug!(stratum = index, rules = rules.len(), "evaluating stratum");
        let members: FnvHashSet<usize> = rules.iter().copied().collect();

        let mut active = rules.to_vec();
        let mut first = true;
        loop {
            self.round += 1;
            self.stats.rounds += 1;
            let round = self.round;

            let mut producers = Vec::new();
            let mut new_facts = 0;
            for &rule in &active {
                if expired(self.deadline) {
                    return Err(Halt::Interrupted);
                }
                let derived = self.apply_rule(rule, round, first)?;
                if derived > 0 {
                    producers.push(rule);
                    new_facts += derived;
                }
            }

            if let Some(hook) = self.hook {
                hook.on_round_complete(index, round, new_facts);
            }
            trace!(stratum = index, round, new_facts, "round complete");
            if new_facts == 0 {
                return Ok(());
            }

            active = if self.use_reliances {
                let next: BTreeSet<usize> = producers
                    .iter()
                    .flat_map(|&p| self.graph.dependents_of(p).iter().copied())
                    .filter(|r| members.contains(r))
                    .collect();
                self.stats.rules_skipped += rules.len() - next.len();
                next.into_iter().collect()
            } else {
                rules.to_vec()
            };
            if active.is_empty() {
                return Ok(());
            }
            first = false;
        }
    }

    fn apply_rule(&mut self, index: usize, round: u32, first: bool) -> Result<usize, Halt> {
        let program = self.program;
        let rule = &program.rules[index];
        let positive: Vec<&Literal> = rule.positive_body().collect();

        let matches = self.collect_matches(&positive, round, first)?;
        let mut derived = 0;
        for bindings in &matches {
            if expired(self.deadline) {
                return Err(Halt::Interrupted);
            }
            derived += self.fire(index, rule, bindings, round)?;
        }
        Ok(derived)
    }

    /// Matches of the positive body that were not seen in an earlier round
    fn collect_matches(
        &self,
        positive: &[&Literal],
        round: u32,
        first: bool,
    ) -> Result<Vec<Bindings>, Halt> {
        let deadline = self.deadline;
        let mut found = Vec::new();
        let mut visit = |b: &Bindings| {
            if expired(deadline) {
                return ControlFlow::Break(());
            }
            found.push(b.clone());
            ControlFlow::Continue(())
        };

        if first {
            let windows = vec![Window::Before(round); positive.len()];
            let flow =
                self.store
                    .for_each_match(positive, &windows, &mut Bindings::default(), &mut visit);
            if flow.is_break() {
                return Err(Halt::Interrupted);
            }
        } else {
            let previous = round - 1;
            for pivot in 0..positive.len() {
                if self.store.count_in(positive[pivot].predicate(), Window::Exactly(previous)) == 0 {
                    continue;
                }
                let windows: Vec<Window> = (0..positive.len())
                    .map(|j| match j.cmp(&pivot) {
                        Ordering::Less => Window::Before(previous),
                        Ordering::Equal => Window::Exactly(previous),
                        Ordering::Greater => Window::Before(round),
                    })
                    .collect();
                let flow = self.store.for_each_match(
                    positive,
                    &windows,
                    &mut Bindings::default(),
                    &mut visit,
                );
                if flow.is_break() {
                    return Err(Halt::Interrupted);
                }
            }
        }
        Ok(found)
    }

    fn fire(
        &mut self,
        index: usize,
        rule: &Rule,
        bindings: &Bindings,
        round: u32,
    ) -> Result<usize, Halt> {
        self.stats.triggers_considered += 1;

        for negated in rule.negative_body() {
            let atom = negated.to_positive().substitute(bindings);
            if !atom.is_ground() {
                let err = ChaseError::reasoning(format!(
                    "negated literal {} is not bound by the positive body of {}",
                    negated, rule
                ))
                .with_code(ErrorCode::UnsafeNegation)
                .with_context("rule", rule.to_string());
                return Err(Halt::Fault(err));
            }
            if self.store.contains_literal(&atom) {
                self.stats.triggers_blocked += 1;
                return Ok(0);
            }
        }

        let trigger = Trigger {
            rule_index: index,
            rule,
            bindings,
        };
        let Some(full) = self.strategy.instantiate(&trigger, &self.store) else {
            self.stats.triggers_satisfied += 1;
            return Ok(0);
        };
        self.stats.triggers_applied += 1;

        let mut derived = 0;
        for head in rule.head() {
            let fact = head.substitute(&full);
            if self.store.add_literal(&fact, round) {
                derived += 1;
                if let Some(hook) = self.hook {
                    hook.on_fact_derived(&fact, rule);
                }
            }
        }
        self.stats.facts_derived += derived;
        Ok(derived)
    }
}

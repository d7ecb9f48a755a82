//! Chase variants for existential rules
//!
//! This module provides the materialization machinery shared by the
//! reasoners:
//!
//! # Available Strategies
//!
//! - `RestrictedChase`: fires a trigger only when its head is not yet
//!   satisfied and invents fresh labelled nulls (default)
//! - `SkolemChase`: fires every trigger and invents deterministic skolem terms
//!
//! # Usage
//!
//! ```ignore
//! use chasekit::{ChaseEngine, ChaseAlgorithm, ReasoningConfig};
//!
//! let engine = ChaseEngine::new(&ReasoningConfig::default())
//!     .with_algorithm(ChaseAlgorithm::Skolem);
//! let result = engine.run(&program)?;
//! println!("{} facts", result.store.len());
//! ```
//!
//! # Architecture
//!
//! `ChaseEngine` owns the evaluation loop (strata, semi-naive rounds,
//! timeout, negation) and delegates the per-trigger decision to a
//! `ChaseStrategy`, so the two variants share everything except the
//! firing condition and the choice of witnesses.

pub mod chase;
mod restricted;
mod skolem;
mod strategy;

pub use crate::config::ChaseAlgorithm;
pub use chase::{ChaseEngine, ChaseOutcome, Materialization};
pub use restricted::RestrictedChase;
pub use skolem::{SkolemChase, SkolemTable};
pub use strategy::{strategy_for, ChaseStats, ChaseStrategy, Trigger};

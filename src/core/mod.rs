//! Core abstractions for chasekit
//!
//! This module provides:
//! - `traits`: collaborator interfaces (DataSource, AnswerSetSolver, ChaseHook)

pub mod traits;

pub use traits::*;

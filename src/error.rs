//! Structured error handling for chasekit
//!
//! Provides a unified error type with:
//! - Error codes for programmatic handling
//! - Structured, JSON-friendly error values
//! - Context preservation through error chains
//!
//! # Error Categories
//!
//! - `InvalidArgument` - malformed term, literal, rule or query construction
//! - `SeparationViolation` - a predicate is both extensional and intensional
//! - `IllegalReasonerState` - operation invoked in a state that does not support it
//! - `ReasoningFault` - malformed rule instantiation found during the chase
//! - `UpstreamIo` - a data source or external solver could not be read
//! - `Config` - configuration issues
//!
//! # Example
//!
//! ```rust
//! use chasekit::error::{ChaseError, ErrorCode};
//!
//! fn check_name(name: &str) -> Result<(), ChaseError> {
//!     if name.trim().is_empty() {
//!         return Err(ChaseError::invalid_argument("name cannot be blank")
//!             .with_context("name", name));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(check_name(" ").unwrap_err().code, ErrorCode::InvalidArgument);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Construction errors (1xxx)
    /// Generic malformed argument
    InvalidArgument = 1000,
    /// Blank term or predicate name
    BlankName = 1001,
    /// Argument count does not match predicate arity
    ArityMismatch = 1002,
    /// Existential variable outside a rule head
    ExistentialInBody = 1003,
    /// Universal head variable missing from the body
    RangeRestriction = 1004,
    /// Negated literal where only positive literals are allowed
    NegatedLiteral = 1005,
    /// Malformed query literal
    InvalidQuery = 1006,

    // Knowledge base errors (2xxx)
    /// A predicate is both extensional and intensional
    SeparationViolation = 2000,

    // State errors (3xxx)
    /// Operation not supported in the current reasoner state
    IllegalReasonerState = 3000,

    // Reasoning errors (4xxx)
    /// Generic reasoning fault
    ReasoningFault = 4000,
    /// A negated body variable is not bound by the positive body
    UnsafeNegation = 4001,
    /// Negation occurs inside a recursive cycle
    UnstratifiableNegation = 4002,

    // Upstream errors (5xxx)
    /// A data source or solver process failed
    UpstreamIo = 5000,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "Invalid argument",
            ErrorCode::BlankName => "Blank name",
            ErrorCode::ArityMismatch => "Arity mismatch",
            ErrorCode::ExistentialInBody => "Existential variable in rule body",
            ErrorCode::RangeRestriction => "Head variable not bound by body",
            ErrorCode::NegatedLiteral => "Unexpected negated literal",
            ErrorCode::InvalidQuery => "Invalid query",

            ErrorCode::SeparationViolation => "EDB/IDB separation violated",

            ErrorCode::IllegalReasonerState => "Illegal reasoner state",

            ErrorCode::ReasoningFault => "Reasoning fault",
            ErrorCode::UnsafeNegation => "Unsafe negation",
            ErrorCode::UnstratifiableNegation => "Unstratifiable negation",

            ErrorCode::UpstreamIo => "Upstream I/O failure",

            ErrorCode::ConfigError => "Configuration error",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Category of this code, i.e. the code rounded down to its thousand
    pub fn category(&self) -> ErrorCode {
        match self.code() / 1000 {
            1 => ErrorCode::InvalidArgument,
            2 => ErrorCode::SeparationViolation,
            3 => ErrorCode::IllegalReasonerState,
            4 => ErrorCode::ReasoningFault,
            5 => ErrorCode::UpstreamIo,
            7 => ErrorCode::ConfigError,
            _ => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location (file:line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the context
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for chasekit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaseError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ChaseError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Create a blank name error
    pub fn blank_name(what: &str) -> Self {
        Self::new(ErrorCode::BlankName, format!("{} name cannot be blank", what))
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(predicate: &str, expected: usize, found: usize) -> Self {
        Self::new(
            ErrorCode::ArityMismatch,
            format!(
                "predicate {} expects {} argument(s), found {}",
                predicate, expected, found
            ),
        )
    }

    /// Create a separation violation listing the offending predicates
    pub fn separation(predicates: &[String]) -> Self {
        Self::new(
            ErrorCode::SeparationViolation,
            format!(
                "predicate(s) both supplied as facts and derived by rules: {}",
                predicates.join(", ")
            ),
        )
        .with_hint("use the merge or rewrite separation policy to accept mixed predicates")
    }

    /// Create an illegal state error
    pub fn illegal_state(operation: &str, state: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::IllegalReasonerState,
            format!("cannot {} while reasoner is {}", operation, state),
        )
    }

    /// Create a reasoning fault
    pub fn reasoning(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReasoningFault, message)
    }

    /// Create an upstream I/O error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamIo, message)
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Look up a context field
    pub fn context_field(&self, key: &str) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.fields.get(key))
            .map(String::as_str)
    }

    /// Check whether this error belongs to the given category
    pub fn is(&self, category: ErrorCode) -> bool {
        self.code.category() == category
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }
}

impl fmt::Display for ChaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for ChaseError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for ChaseError {
    fn from(err: std::io::Error) -> Self {
        ChaseError::upstream(err.to_string()).with_context("io_kind", format!("{:?}", err.kind()))
    }
}

impl From<toml::de::Error> for ChaseError {
    fn from(err: toml::de::Error) -> Self {
        ChaseError::config(err.to_string())
    }
}

impl From<crate::config::ConfigError> for ChaseError {
    fn from(err: crate::config::ConfigError) -> Self {
        ChaseError::config(err.to_string())
    }
}

/// A Result type using ChaseError
pub type ChaseResult<T> = Result<T, ChaseError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create a ChaseError with context from the current location
#[macro_export]
macro_rules! chase_error {
    ($code:expr, $msg:expr) => {
        $crate::error::ChaseError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::ChaseError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! chase_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::chase_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::chase_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! chase_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::chase_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::chase_bail!($code, $fmt, $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ChaseError::invalid_argument("bad literal");
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.message, "bad literal");
    }

    #[test]
    fn test_error_categories() {
        assert!(ChaseError::blank_name("term").is(ErrorCode::InvalidArgument));
        assert!(ChaseError::arity_mismatch("p", 1, 2).is(ErrorCode::InvalidArgument));
        assert!(ChaseError::new(ErrorCode::UnsafeNegation, "x").is(ErrorCode::ReasoningFault));
        assert!(!ChaseError::upstream("x").is(ErrorCode::ReasoningFault));
    }

    #[test]
    fn test_error_with_context() {
        let err = ChaseError::reasoning("unsafe")
            .with_context("rule", "q(?x) :- ~p(?x) .")
            .with_context("variable", "?x");

        assert_eq!(err.context_field("rule"), Some("q(?x) :- ~p(?x) ."));
        assert_eq!(err.context_field("variable"), Some("?x"));
        assert_eq!(err.context_field("missing"), None);
    }

    #[test]
    fn test_separation_error_lists_predicates() {
        let err = ChaseError::separation(&["p/1".to_string(), "q/2".to_string()]);
        assert_eq!(err.code, ErrorCode::SeparationViolation);
        assert!(err.message.contains("p/1, q/2"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_error_display() {
        let err = ChaseError::upstream("solver exited")
            .at("asp/solver.rs:10")
            .with_cause("broken pipe")
            .with_hint("check that clingo is installed");

        let display = err.to_string();
        assert!(display.contains("[5000]"));
        assert!(display.contains("solver exited"));
        assert!(display.contains("asp/solver.rs:10"));
        assert!(display.contains("broken pipe"));
        assert!(display.contains("check that clingo is installed"));
    }

    #[test]
    fn test_error_to_json() {
        let err = ChaseError::illegal_state("answer queries", "NOT_STARTED");
        let json = err.to_json();
        assert!(json.contains("ILLEGAL_REASONER_STATE"));
        assert!(json.contains("answer queries"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ChaseError = io.into();
        assert_eq!(err.code, ErrorCode::UpstreamIo);
        assert_eq!(err.context_field("io_kind"), Some("BrokenPipe"));
    }

    #[test]
    fn test_macros_record_location() {
        fn fails() -> ChaseResult<()> {
            chase_ensure!(1 + 1 == 3, ErrorCode::InternalError, "math is {}", "broken");
            Ok(())
        }
        let err = fails().unwrap_err();
        assert_eq!(err.message, "math is broken");
        let location = err.context.unwrap().location.unwrap();
        assert!(location.contains("error.rs"));
    }
}

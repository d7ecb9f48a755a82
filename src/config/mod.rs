//! Configuration System for chasekit
//!
//! Provides a configuration layer supporting:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./chasekit.toml` - Project-local configuration
//! 2. `~/.config/chasekit/config.toml` - User configuration (XDG)
//! 3. `~/.chasekit/config.toml` - User configuration (legacy)
//! 4. `/etc/chasekit/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `CHASEKIT_ALGORITHM` - Chase variant (restricted, skolem)
//! - `CHASEKIT_TIMEOUT_MS` - Materialization timeout in milliseconds (0 = none)
//! - `CHASEKIT_INCLUDE_NULLS` - Default for nulls in query answers (true/false)
//! - `CHASEKIT_USE_RELIANCES` - Skip rules no recent derivation can trigger (true/false)
//! - `CHASEKIT_SEPARATION` - EDB/IDB conflict policy (reject, merge, rewrite)
//! - `CHASEKIT_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `CHASEKIT_SOLVER` - Answer-set solver command
//! - `CHASEKIT_MAX_ANSWER_SETS` - Default answer-set limit (0 = unbounded)
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "normal"
//!
//! [reasoning]
//! algorithm = "restricted"
//! timeout_ms = 60000
//! use_reliances = true
//! separation_policy = "reject"
//!
//! [solver]
//! command = "clingo"
//! args = []
//! max_answer_sets = 0
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChaseConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Materialization settings
    pub reasoning: ReasoningConfig,
    /// Answer-set solver settings
    pub solver: SolverConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level
    pub log_level: LogLevel,
}

impl GeneralConfig {
    /// The `tracing` filter matching the configured log level
    ///
    /// chasekit never installs a subscriber itself; hosts pass this to the
    /// one they install.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.level_filter()
    }
}

/// Materialization configuration options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Chase variant
    pub algorithm: ChaseAlgorithm,
    /// Timeout in milliseconds, 0 disables it
    pub timeout_ms: u64,
    /// Use rule reliances to skip rules that cannot fire
    pub use_reliances: bool,
    /// How to treat predicates that are both supplied and derived
    pub separation_policy: SeparationPolicy,
    /// Whether query answers may contain nulls by default
    pub include_nulls: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            algorithm: ChaseAlgorithm::Restricted,
            timeout_ms: 0,
            use_reliances: true,
            separation_policy: SeparationPolicy::Reject,
            include_nulls: true,
        }
    }
}

impl ReasoningConfig {
    /// The timeout as a duration, if one is set
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Set the timeout; `None` disables it
    ///
    /// Precision is one millisecond; a non-zero timeout shorter than that
    /// becomes one millisecond rather than none.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1));
        self
    }

    /// Set whether query answers may contain nulls when not stated per query
    pub fn with_include_nulls(mut self, include_nulls: bool) -> Self {
        self.include_nulls = include_nulls;
        self
    }

    pub fn with_algorithm(mut self, algorithm: ChaseAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_separation_policy(mut self, policy: SeparationPolicy) -> Self {
        self.separation_policy = policy;
        self
    }
}

/// Answer-set solver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver executable
    pub command: String,
    /// Extra arguments passed before the model count
    pub args: Vec<String>,
    /// Default answer-set limit, 0 = unbounded
    pub max_answer_sets: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            command: "clingo".to_string(),
            args: Vec::new(),
            max_answer_sets: 0,
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "error" => Some(LogLevel::Quiet),
            "normal" | "n" | "info" => Some(LogLevel::Normal),
            "verbose" | "v" => Some(LogLevel::Verbose),
            "debug" | "d" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// The `tracing` filter a host application should install for this level
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::ERROR,
            LogLevel::Normal => LevelFilter::INFO,
            LogLevel::Verbose => LevelFilter::DEBUG,
            LogLevel::Debug => LevelFilter::TRACE,
        }
    }
}

/// Chase variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChaseAlgorithm {
    /// Fire a trigger only if its head is not already satisfied
    #[default]
    Restricted,
    /// Fire every trigger once, naming witnesses by skolem terms
    Skolem,
}

impl ChaseAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaseAlgorithm::Restricted => "restricted",
            ChaseAlgorithm::Skolem => "skolem",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "restricted" | "standard" => Some(ChaseAlgorithm::Restricted),
            "skolem" => Some(ChaseAlgorithm::Skolem),
            _ => None,
        }
    }
}

/// Policy for predicates that are both supplied by facts and derived by rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeparationPolicy {
    /// Refuse to materialize
    #[default]
    Reject,
    /// Treat supplied facts as initial facts of the derived predicate
    Merge,
    /// Load supplied facts under an auxiliary predicate joined by a bridging rule
    Rewrite,
}

impl SeparationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeparationPolicy::Reject => "reject",
            SeparationPolicy::Merge => "merge",
            SeparationPolicy::Rewrite => "rewrite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reject" | "strict" => Some(SeparationPolicy::Reject),
            "merge" => Some(SeparationPolicy::Merge),
            "rewrite" => Some(SeparationPolicy::Rewrite),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl ChaseConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from default locations, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                break;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<string>"), e.to_string()))
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./chasekit.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chasekit").join("config.toml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".chasekit").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/chasekit/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored with a warning
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn ignored(key: &str, val: &str) {
            tracing::warn!(key, value = val, "ignoring unparsable configuration override");
        }

        if let Some(val) = lookup("CHASEKIT_ALGORITHM") {
            match ChaseAlgorithm::from_str(&val) {
                Some(algorithm) => self.reasoning.algorithm = algorithm,
                None => ignored("CHASEKIT_ALGORITHM", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => self.reasoning.timeout_ms = ms,
                Err(_) => ignored("CHASEKIT_TIMEOUT_MS", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_INCLUDE_NULLS") {
            match parse_bool(&val) {
                Some(flag) => self.reasoning.include_nulls = flag,
                None => ignored("CHASEKIT_INCLUDE_NULLS", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_USE_RELIANCES") {
            match parse_bool(&val) {
                Some(flag) => self.reasoning.use_reliances = flag,
                None => ignored("CHASEKIT_USE_RELIANCES", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_SEPARATION") {
            match SeparationPolicy::from_str(&val) {
                Some(policy) => self.reasoning.separation_policy = policy,
                None => ignored("CHASEKIT_SEPARATION", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_LOG_LEVEL") {
            match LogLevel::from_str(&val) {
                Some(level) => self.general.log_level = level,
                None => ignored("CHASEKIT_LOG_LEVEL", &val),
            }
        }

        if let Some(val) = lookup("CHASEKIT_SOLVER") {
            if !val.trim().is_empty() {
                self.solver.command = val;
            }
        }

        if let Some(val) = lookup("CHASEKIT_MAX_ANSWER_SETS") {
            match val.parse::<usize>() {
                Ok(max) => self.solver.max_answer_sets = max,
                Err(_) => ignored("CHASEKIT_MAX_ANSWER_SETS", &val),
            }
        }
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Write configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# chasekit configuration file

[general]
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

[reasoning]
# Chase variant: restricted, skolem
algorithm = "restricted"
# Materialization timeout in milliseconds (0 = none)
timeout_ms = 0
# Skip rules that no recent derivation can trigger
use_reliances = true
# Predicates both supplied and derived: reject, merge, rewrite
separation_policy = "reject"
# Include nulls in answers of queries that do not say otherwise
include_nulls = true

[solver]
# Answer-set solver executable
command = "clingo"
# Extra arguments
args = []
# Default answer-set limit (0 = unbounded)
max_answer_sets = 0
"#
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error reading/writing config file
    #[error("IO error reading {path}: {1}", path = .0.display())]
    Io(PathBuf, String),
    /// Parse error in config file
    #[error("Parse error in {path}: {1}", path = .0.display())]
    Parse(PathBuf, String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ChaseConfig::default();
        assert_eq!(config.reasoning.algorithm, ChaseAlgorithm::Restricted);
        assert_eq!(config.reasoning.separation_policy, SeparationPolicy::Reject);
        assert!(config.reasoning.use_reliances);
        assert_eq!(config.reasoning.timeout(), None);
        assert_eq!(config.solver.command, "clingo");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[general]
log_level = "debug"

[reasoning]
algorithm = "skolem"
timeout_ms = 5000
separation_policy = "rewrite"

[solver]
args = ["--warn=none"]
"#;
        let config = ChaseConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.log_level, LogLevel::Debug);
        assert_eq!(config.reasoning.algorithm, ChaseAlgorithm::Skolem);
        assert_eq!(config.reasoning.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.reasoning.separation_policy, SeparationPolicy::Rewrite);
        assert!(config.reasoning.use_reliances);
        assert_eq!(config.solver.args, vec!["--warn=none".to_string()]);
    }

    #[test]
    fn test_default_content_parses() {
        let config = ChaseConfig::load_from_str(ChaseConfig::default_config_content()).unwrap();
        assert_eq!(config, ChaseConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = ChaseConfig::load_from_str("[reasoning]\nalgorithm = \"magic\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
        assert!(err.to_string().contains("<string>"));
    }

    #[test]
    fn test_from_str_helpers() {
        assert_eq!(ChaseAlgorithm::from_str("SKOLEM"), Some(ChaseAlgorithm::Skolem));
        assert_eq!(SeparationPolicy::from_str("merge"), Some(SeparationPolicy::Merge));
        assert_eq!(LogLevel::from_str("v"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Quiet.level_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHASEKIT_ALGORITHM", "skolem"),
            ("CHASEKIT_TIMEOUT_MS", "1500"),
            ("CHASEKIT_INCLUDE_NULLS", "no"),
            ("CHASEKIT_LOG_LEVEL", "debug"),
            ("CHASEKIT_USE_RELIANCES", "off"),
            ("CHASEKIT_SEPARATION", "merge"),
            ("CHASEKIT_MAX_ANSWER_SETS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ChaseConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.reasoning.algorithm, ChaseAlgorithm::Skolem);
        assert_eq!(config.reasoning.timeout(), Some(Duration::from_millis(1500)));
        assert!(!config.reasoning.include_nulls);
        assert_eq!(config.general.level_filter(), LevelFilter::TRACE);
        assert!(!config.reasoning.use_reliances);
        assert_eq!(config.reasoning.separation_policy, SeparationPolicy::Merge);
        assert_eq!(config.solver.max_answer_sets, 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = ChaseConfig::default();
        config.reasoning.algorithm = ChaseAlgorithm::Skolem;
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("algorithm = \"skolem\""));
        assert_eq!(ChaseConfig::load_from_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_sub_second_timeout_is_kept() {
        let config = ReasoningConfig::default().with_timeout(Some(Duration::from_millis(200)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(200)));
        let config = config.with_timeout(Some(Duration::from_millis(1500)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        let config = config.with_timeout(Some(Duration::from_micros(10)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));
        assert_eq!(config.with_timeout(None).timeout(), None);
    }

    #[test]
    fn test_config_paths() {
        let paths = ChaseConfig::config_paths();
        assert_eq!(paths[0], PathBuf::from("./chasekit.toml"));
    }
}

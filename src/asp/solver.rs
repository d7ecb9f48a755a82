//! Answer-set solver process boundary

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::core::AnswerSetSolver;
use crate::error::{ChaseError, ChaseResult};

/// Runs clingo as a child process
///
/// The ground program is written to the solver's stdin in aspif format and
/// the solver is asked for `max_models` models (`0` for all of them).
#[derive(Debug, Clone)]
pub struct ClingoSolver {
    command: String,
    args: Vec<String>,
}

impl Default for ClingoSolver {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl ClingoSolver {
    pub fn new(command: impl Into<String>) -> Self {
        ClingoSolver {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        ClingoSolver {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Add an argument passed before the model count
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl AnswerSetSolver for ClingoSolver {
    fn name(&self) -> &str {
        &self.command
    }

    fn solve(&self, program: &str, max_models: usize) -> ChaseResult<Box<dyn BufRead + Send>> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(max_models.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ChaseError::upstream(format!("cannot start answer-set solver `{}`", self.command))
                    .with_cause(e.to_string())
                    .with_hint("install clingo or set solver.command in the configuration")
            })?;
        debug!(solver = %self.command, pid = child.id(), max_models, "solver started");

        let written = match child.stdin.take() {
            // stdin is closed when dropped at the end of this arm
            Some(mut stdin) => stdin.write_all(program.as_bytes()),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "solver stdin unavailable")),
        };
        if let Err(e) = written {
            reap(&mut child);
            return Err(
                ChaseError::upstream(format!("cannot send program to `{}`", self.command))
                    .with_cause(e.to_string()),
            );
        }

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(ChaseError::upstream(format!(
                "cannot read output of `{}`",
                self.command
            )));
        };
        Ok(Box::new(SolverOutput {
            reader: BufReader::new(stdout),
            child,
        }))
    }
}

fn reap(child: &mut Child) {
    // The process may already have exited
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!(error = %e, "cannot reap solver process");
    }
}

/// Solver stdout; dropping it kills and reaps the process
struct SolverOutput {
    reader: BufReader<ChildStdout>,
    child: Child,
}

impl Read for SolverOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for SolverOutput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Drop for SolverOutput {
    fn drop(&mut self) {
        reap(&mut self.child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_missing_solver() {
        let solver = ClingoSolver::new("chasekit-no-such-solver");
        let err = solver.solve("asp 1 0 0\n0\n", 1).err().unwrap();
        assert_eq!(err.code, ErrorCode::UpstreamIo);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_from_config() {
        let config = SolverConfig {
            command: "/opt/clingo".to_string(),
            args: vec!["--quiet=0".to_string()],
            max_answer_sets: 3,
        };
        let solver = ClingoSolver::from_config(&config).arg("--verbose=0");
        assert_eq!(solver.command(), "/opt/clingo");
        assert_eq!(solver.args, vec!["--quiet=0", "--verbose=0"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_output_is_streamed() {
        // `cat` echoes the program back, standing in for a solver
        let solver = ClingoSolver::new("sh").arg("-c").arg("cat; echo UNSATISFIABLE").arg("solver");
        let mut output = solver.solve("Answer: 1\n", 0).unwrap();
        let mut text = String::new();
        output.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Answer: 1\nUNSATISFIABLE\n");
    }
}

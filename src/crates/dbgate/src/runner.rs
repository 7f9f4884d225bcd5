//! Test runner handoff
//!
//! Spawns the downstream test runner once the gate is open. Arguments are
//! passed through verbatim and stdio is inherited.

use crate::error::{GateError, Result};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::info;

/// External program invoked after the gate opens
#[derive(Debug, Clone)]
pub struct TestRunner {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl TestRunner {
    /// Create a runner for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append arguments, uninterpreted
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Run the program to completion and return its process exit code
    ///
    /// # Errors
    /// [`GateError::Runner`] if the program cannot be spawned.
    pub async fn run(&self) -> Result<i32> {
        info!(program = %self.program, args = ?self.args, "Handing off to test runner");

        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| GateError::Runner {
                program: self.program.clone(),
                source,
            })?;

        let code = exit_code(status);
        info!(program = %self.program, code, "Test runner finished");
        Ok(code)
    }
}

/// Map a child exit status to a process exit code
///
/// Signal termination maps to `128 + signal` on unix, `1` elsewhere.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

//! Child-process boundary
//!
//! Everything the manager executes — hook `--config` probes, hook runs,
//! `enabled` scripts — goes through [`CommandExecutor`], so tests can
//! substitute a deterministic stub for real child processes.

use std::path::Path;
use std::process::Command;

use crate::error::Result;

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an executable to completion and captures its output
pub trait CommandExecutor: Send + Sync {
    fn run(
        &self,
        program: &Path,
        args: &[&str],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput>;
}

/// The real executor: spawns a child process and waits for it
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn run(
        &self,
        program: &Path,
        args: &[&str],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()?;

        Ok(CommandOutput {
            // a missing code means the child was killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

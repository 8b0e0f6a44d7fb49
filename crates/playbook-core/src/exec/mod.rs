//! Subprocess invocation: the executor seam, the local runner and tool lookup.

mod runner;

pub use runner::CommandRunner;

use crate::error::ExecError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A shell command line plus the environment changes to run it with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub env_remove: Vec<String>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs shell command lines. Calls are awaited to completion; there is no
/// timeout and no kill on cancellation.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutput, ExecError>;
}

/// Executor backed by `sh -c` through tokio's process API.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellExecutor;

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutput, ExecError> {
        log::debug!("Running `{}`", request.command);
        let mut command = tokio::process::Command::new("sh");
        command.arg("-c").arg(&request.command);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }
        for key in &request.env_remove {
            command.env_remove(key);
        }
        command.envs(&request.env);

        let output = command.output().await.map_err(|source| ExecError::Spawn {
            command: request.command.clone(),
            source,
        })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Find an executable on the host: `command -v` first, then `whereis`.
pub async fn locate_executable(executor: &dyn CommandExecutor, name: &str) -> Option<String> {
    if let Ok(output) = executor
        .execute(&CommandRequest::new(format!("command -v {name}")))
        .await
    {
        let found = output.stdout.trim();
        if output.success() && !found.is_empty() {
            return Some(found.to_string());
        }
    }
    let output = executor
        .execute(&CommandRequest::new(format!("whereis {name}")))
        .await
        .ok()?;
    let (_, locations) = output.stdout.split_once(':')?;
    locations.split_whitespace().next().map(str::to_string)
}

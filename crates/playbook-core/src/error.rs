//! Error types for the engine subsystems

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while launching a subprocess.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The execution environment is not available")]
    EnvironmentUnavailable,
}

/// Errors raised while setting up or using the execution environment.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Container engine not found. Install podman or docker, or disable the execution environment")]
    EngineNotFound,

    #[error("Container engine '{0}' is not available on this host")]
    EngineMissing(String),

    #[error("Failed to pull image {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("Failed to resolve the id of image {image}")]
    ImageId { image: String },

    #[error("Failed to start container {name}: {reason}")]
    ContainerStart { name: String, reason: String },

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("Plugin doc cache error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the lint validator.
#[derive(Error, Debug)]
pub enum LintError {
    #[error("{tool} is not installed or not found on PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    Invocation {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not parse the {tool} report: {source}")]
    Report {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not load lint config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors raised while resolving the tool configuration.
#[derive(Error, Debug)]
pub enum ToolConfigError {
    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors raised while reading module documentation.
#[derive(Error, Debug)]
pub enum DocsError {
    #[error("No DOCUMENTATION block in {0}")]
    MissingDocumentation(PathBuf),

    #[error("Invalid documentation in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

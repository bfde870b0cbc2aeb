//! Error taxonomy for the virtualenv executor.
//!
//! `ConfigError` is raised at construction, before any subprocess exists.
//! `VenvError` covers everything that can go wrong while an invocation runs.
//! Nothing here is retried; every variant is terminal for its invocation.

use std::fmt;
use thiserror::Error;

use crate::runner::CommandFailure;

/// Invalid executor configuration. Raised by `VirtualenvExecutor::new`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` is not a valid Python function name")]
    InvalidName(String),

    #[error("lambdas are not supported; define the callable with `def`")]
    Lambda,

    #[error("source does not define a plain function named `{0}`")]
    NotAFunction(String),

    #[error("source does not contain a top-level `def`")]
    NoFunctionDefinition,

    #[error("`{0}` looks like a method (first parameter is `{1}`); only plain functions are supported")]
    Method(String, String),

    #[error("`{0}` is an async function; only plain functions are supported")]
    AsyncFunction(String),

    #[error("If using dill, dill must be in the environment either via system_site_packages or requirements")]
    DillNotAvailable,

    #[error("Passing positional or keyword arguments is not supported across different Python major versions (host {host}, target {target}). Use string args.")]
    CrossVersionArguments { host: u32, target: u32 },

    #[error("invalid python version `{0}` (expected MAJOR or MAJOR.MINOR)")]
    InvalidPythonVersion(String),
}

/// Which provisioning command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    CreateEnv,
    InstallDeps,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateEnv => write!(f, "environment creation"),
            Self::InstallDeps => write!(f, "dependency installation"),
        }
    }
}

/// Failure of one invocation.
#[derive(Debug, Error)]
pub enum VenvError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("{stage} failed: {failure}")]
    Setup {
        stage: SetupStage,
        #[source]
        failure: CommandFailure,
    },

    #[error("callable execution failed: {0}")]
    Execution(#[source] CommandFailure),

    #[error("failed to serialize arguments with {codec}: {message}")]
    Serialization { codec: &'static str, message: String },

    #[error("failed to deserialize result with {codec}: {message} (result deserialization is not supported across major Python versions)")]
    Deserialization { codec: &'static str, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl VenvError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short machine-readable kind, used in the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Setup { .. } => "setup",
            Self::Execution(_) => "execution",
            Self::Serialization { .. } => "serialization",
            Self::Deserialization { .. } => "deserialization",
            Self::Io { .. } => "io",
        }
    }

    /// Output captured from the failing subprocess, if a subprocess failed.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::Setup { failure, .. } | Self::Execution(failure) => failure.output(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_captured_output() {
        let err = VenvError::Execution(CommandFailure::NonZeroExit {
            command: "python script.py".to_string(),
            code: Some(1),
            output: "Traceback ...\nNameError: x".to_string(),
        });
        assert_eq!(err.kind(), "execution");
        assert_eq!(err.captured_output(), Some("Traceback ...\nNameError: x"));

        let cfg: VenvError = ConfigError::Lambda.into();
        assert_eq!(cfg.kind(), "configuration");
        assert!(cfg.captured_output().is_none());
    }

    #[test]
    fn test_setup_error_message_names_stage() {
        let err = VenvError::Setup {
            stage: SetupStage::InstallDeps,
            failure: CommandFailure::NonZeroExit {
                command: "pip install nope".to_string(),
                code: Some(1),
                output: "No matching distribution".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("dependency installation failed"));
        assert!(msg.contains("No matching distribution"));
    }
}

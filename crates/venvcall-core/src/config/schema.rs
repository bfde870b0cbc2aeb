//! Configuration structs grouped by concern, loaded from the environment.

use super::env_keys::{executor as exec_keys, observability as obv_keys};
use super::loader::{env_bool, env_optional, env_or};
use std::path::PathBuf;

/// Default binary for building isolated environments.
pub const DEFAULT_VIRTUALENV_BIN: &str = "virtualenv";

/// Python major version the pickle codec targets when nothing else is configured.
pub const DEFAULT_HOST_PYTHON_MAJOR: u32 = 3;

/// Prefix for per-invocation workspace directories.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "venv";

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::VENVCALL_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::VENVCALL_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "venvcall=info".to_string(),
                ),
                log_json: env_bool(
                    obv_keys::VENVCALL_LOG_JSON,
                    obv_keys::LOG_JSON_ALIASES,
                    false,
                ),
                audit_log: env_optional(
                    obv_keys::VENVCALL_AUDIT_LOG,
                    obv_keys::AUDIT_LOG_ALIASES,
                ),
            }
        })
    }
}

/// Settings shared by every invocation of the virtualenv executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Environment builder binary (name on PATH or absolute path)
    pub virtualenv_bin: String,
    /// Python major version whose pickle protocol the argument codec speaks
    pub host_python_major: u32,
    /// Parent directory of per-invocation workspaces
    pub workspace_root: PathBuf,
    /// Name prefix of per-invocation workspaces
    pub workspace_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            virtualenv_bin: DEFAULT_VIRTUALENV_BIN.to_string(),
            host_python_major: DEFAULT_HOST_PYTHON_MAJOR,
            workspace_root: std::env::temp_dir(),
            workspace_prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Load from environment variables; unset or unparsable values use defaults.
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();

        let host_python_major = env_optional(exec_keys::VENVCALL_HOST_PYTHON_MAJOR, &[])
            .and_then(|s| match s.parse::<u32>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(
                        "Invalid {}: {}, using default ({})",
                        exec_keys::VENVCALL_HOST_PYTHON_MAJOR,
                        s,
                        DEFAULT_HOST_PYTHON_MAJOR
                    );
                    None
                }
            })
            .unwrap_or(defaults.host_python_major);

        Self {
            virtualenv_bin: env_or(
                exec_keys::VENVCALL_VIRTUALENV,
                exec_keys::VIRTUALENV_ALIASES,
                || defaults.virtualenv_bin.clone(),
            ),
            host_python_major,
            workspace_root: env_optional(exec_keys::VENVCALL_TMPDIR, exec_keys::TMPDIR_ALIASES)
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            workspace_prefix: defaults.workspace_prefix,
        }
    }

    pub fn with_virtualenv_bin(mut self, bin: impl Into<String>) -> Self {
        self.virtualenv_bin = bin.into();
        self
    }

    pub fn with_host_python_major(mut self, major: u32) -> Self {
        self.host_python_major = major;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }
}

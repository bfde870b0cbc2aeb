//! Environment variable keys and their aliases.
//!
//! Primary variables use the `VENVCALL_*` prefix. The `PYVENV_*` spellings are
//! still honoured for older deployments.

/// Logging and audit
pub mod observability {
    pub const VENVCALL_QUIET: &str = "VENVCALL_QUIET";
    pub const QUIET_ALIASES: &[&str] = &["PYVENV_QUIET"];

    pub const VENVCALL_LOG_LEVEL: &str = "VENVCALL_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["PYVENV_LOG_LEVEL"];

    pub const VENVCALL_LOG_JSON: &str = "VENVCALL_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &["PYVENV_LOG_JSON"];

    pub const VENVCALL_AUDIT_LOG: &str = "VENVCALL_AUDIT_LOG";
    pub const AUDIT_LOG_ALIASES: &[&str] = &["PYVENV_AUDIT_LOG"];
}

/// Environment provisioning and invocation
pub mod executor {
    /// Binary used to build the isolated environment (default `virtualenv`).
    pub const VENVCALL_VIRTUALENV: &str = "VENVCALL_VIRTUALENV";
    pub const VIRTUALENV_ALIASES: &[&str] = &["PYVENV_VIRTUALENV"];

    /// Python major version the argument codec is compatible with (default 3).
    pub const VENVCALL_HOST_PYTHON_MAJOR: &str = "VENVCALL_HOST_PYTHON_MAJOR";

    /// Parent directory for per-invocation workspaces (default: system temp dir).
    pub const VENVCALL_TMPDIR: &str = "VENVCALL_TMPDIR";
    pub const TMPDIR_ALIASES: &[&str] = &["PYVENV_TMPDIR"];
}

/// Deprecated key → recommended key
pub const DEPRECATED_PAIRS: &[(&str, &str)] = &[
    ("PYVENV_QUIET", "VENVCALL_QUIET"),
    ("PYVENV_LOG_LEVEL", "VENVCALL_LOG_LEVEL"),
    ("PYVENV_LOG_JSON", "VENVCALL_LOG_JSON"),
    ("PYVENV_AUDIT_LOG", "VENVCALL_AUDIT_LOG"),
    ("PYVENV_VIRTUALENV", "VENVCALL_VIRTUALENV"),
    ("PYVENV_TMPDIR", "VENVCALL_TMPDIR"),
];

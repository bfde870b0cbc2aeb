//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for VENVCALL_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call at process startup.
/// When VENVCALL_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "venvcall=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env().audit_log.clone()?;
    if path.is_empty() {
        return None;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

/// Send audit records to `path`, overriding VENVCALL_AUDIT_LOG.
pub fn set_audit_log_path(path: &Path) {
    if let Ok(mut guard) = AUDIT_PATH.lock() {
        *guard = Some(path.to_string_lossy().to_string());
    }
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn invocation_started_record(
    invocation_id: &str,
    callable: &str,
    python_version: Option<&str>,
) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "invocation_started",
        "invocation_id": invocation_id,
        "callable": callable,
        "python_version": python_version,
    })
}

fn script_written_record(invocation_id: &str, script_hash: &str) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "script_written",
        "invocation_id": invocation_id,
        "script_hash": script_hash,
    })
}

fn command_invoked_record(invocation_id: &str, stage: &str, argv: &[String]) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "command_invoked",
        "invocation_id": invocation_id,
        "stage": stage,
        "argv": argv,
    })
}

fn invocation_completed_record(
    invocation_id: &str,
    error_kind: Option<&str>,
    duration_ms: u64,
    result_len: u64,
) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "invocation_completed",
        "invocation_id": invocation_id,
        "success": error_kind.is_none(),
        "error_kind": error_kind,
        "duration_ms": duration_ms,
        "result_len": result_len,
    })
}

/// Audit: invocation_started (first record of every invocation, before any command)
pub fn audit_invocation_started(invocation_id: &str, callable: &str, python_version: Option<&str>) {
    if let Some(path) = get_audit_path() {
        append_jsonl(
            &path,
            &invocation_started_record(invocation_id, callable, python_version),
        );
    }
}

/// Audit: script_written (sha256 of the synthesized program, before it runs)
pub fn audit_script_written(invocation_id: &str, script_hash: &str) {
    if let Some(path) = get_audit_path() {
        append_jsonl(&path, &script_written_record(invocation_id, script_hash));
    }
}

/// Audit: command_invoked (right before spawn)
pub fn audit_command_invoked(invocation_id: &str, stage: &str, argv: &[String]) {
    if let Some(path) = get_audit_path() {
        append_jsonl(&path, &command_invoked_record(invocation_id, stage, argv));
    }
}

/// Audit: invocation_completed. `error_kind` is `None` on success.
pub fn audit_invocation_completed(
    invocation_id: &str,
    error_kind: Option<&str>,
    duration_ms: u64,
    result_len: u64,
) {
    if let Some(path) = get_audit_path() {
        append_jsonl(
            &path,
            &invocation_completed_record(invocation_id, error_kind, duration_ms, result_len),
        );
    }
}

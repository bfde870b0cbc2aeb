//! Subprocess runner: executes provisioning and interpreter commands.
//!
//! The executor never spawns processes itself; it hands a [`CommandLine`] to a
//! [`CommandRunner`]. [`SubprocessRunner`] is the real implementation, tests
//! plug in fakes.

use std::fmt;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::common::wait_with_merged_output;
use crate::info_log;

/// A program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argv: program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .argv()
            .into_iter()
            .map(|part| {
                if part.is_empty() || part.chars().any(char::is_whitespace) {
                    format!("{:?}", part)
                } else {
                    part
                }
            })
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "a signal".to_string(),
    }
}

/// A command that could not be run to a successful exit.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` terminated with {}; output:\n{output}", exit_label(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

impl CommandFailure {
    /// Captured stdout+stderr of the failed process, if it ran at all.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Extension point for command execution.
///
/// Implementations must run the command to completion and return its combined
/// stdout/stderr, or a [`CommandFailure`] carrying that output.
pub trait CommandRunner: Send + Sync {
    /// Runner name for logging and diagnostics.
    fn name(&self) -> &str;

    fn run(&self, cmd: &CommandLine) -> Result<String, CommandFailure>;
}

/// Runs commands as child processes.
///
/// stdin is closed, stderr is merged into the captured stdout, and the child
/// inherits no descriptors beyond stdio (std opens everything close-on-exec).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

impl CommandRunner for SubprocessRunner {
    fn name(&self) -> &str {
        "subprocess"
    }

    fn run(&self, cmd: &CommandLine) -> Result<String, CommandFailure> {
        let command = cmd.to_string();
        info_log!("Executing cmd\n{}", command);

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandFailure::Spawn {
                command: command.clone(),
                source,
            })?;

        let (code, output) =
            wait_with_merged_output(&mut child).map_err(|source| CommandFailure::Wait {
                command: command.clone(),
                source,
            })?;

        if code != Some(0) {
            tracing::warn!("Got error output\n{}", output);
            return Err(CommandFailure::NonZeroExit {
                command,
                code,
                output,
            });
        }

        if !output.is_empty() {
            info_log!("Got output\n{}", output);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_display_quotes_whitespace() {
        let cmd = CommandLine::new("/tmp/venv x/bin/pip")
            .arg("install")
            .args(["requests>=2", ""]);
        assert_eq!(
            cmd.to_string(),
            "\"/tmp/venv x/bin/pip\" install requests>=2 \"\""
        );
        assert_eq!(cmd.argv().len(), 4);
    }

    #[test]
    fn test_spawn_failure_for_missing_program() {
        let cmd = CommandLine::new("venvcall-definitely-not-a-real-binary");
        let err = SubprocessRunner.run(&cmd).unwrap_err();
        assert!(matches!(err, CommandFailure::Spawn { .. }));
        assert!(err.output().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_carries_output() {
        let cmd = CommandLine::new("sh").args(["-c", "echo boom 1>&2; exit 2"]);
        let err = SubprocessRunner.run(&cmd).unwrap_err();
        match err {
            CommandFailure::NonZeroExit { code, ref output, .. } => {
                assert_eq!(code, Some(2));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_output() {
        let cmd = CommandLine::new("sh").args(["-c", "echo hello"]);
        let out = SubprocessRunner.run(&cmd).unwrap();
        assert_eq!(out.trim(), "hello");
    }
}

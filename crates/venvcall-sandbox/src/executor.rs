//! Runs one function in a freshly built virtualenv.
//!
//! Each `execute()` call owns a new workspace and environment; nothing is
//! cached between calls. Stages run strictly in order and the first failure
//! aborts the invocation. The workspace is released on every exit path.

use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use venvcall_core::config::ExecutorConfig;
use venvcall_core::observability;

use crate::args::InvocationArgs;
use crate::callable::CallableSpec;
use crate::codec::{self, Codec, ExecutionResult, WireOptions};
use crate::env::builder::EnvironmentProvisioner;
use crate::env::spec::{EnvironmentSpec, PythonVersion};
use crate::error::{ConfigError, SetupStage, VenvError};
use crate::info_log;
use crate::runner::{CommandFailure, CommandLine, CommandRunner, SubprocessRunner};
use crate::script::render_script;
use crate::workspace::Workspace;

/// Invocation stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ProvisionEnv,
    InstallDeps,
    WriteInputs,
    WriteScript,
    WriteStringArgs,
    Run,
    ReadResult,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::ProvisionEnv => "provision_env",
            Self::InstallDeps => "install_deps",
            Self::WriteInputs => "write_inputs",
            Self::WriteScript => "write_script",
            Self::WriteStringArgs => "write_string_args",
            Self::Run => "run",
            Self::ReadResult => "read_result",
            Self::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// A validated (callable, environment, arguments) triple ready to run.
pub struct VirtualenvExecutor {
    callable: CallableSpec,
    env: EnvironmentSpec,
    python_version: Option<PythonVersion>,
    args: InvocationArgs,
    config: ExecutorConfig,
    provisioner: EnvironmentProvisioner,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for VirtualenvExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualenvExecutor")
            .field("callable", &self.callable.name())
            .field("env", &self.env)
            .field("args", &self.args)
            .field("config", &self.config)
            .field("runner", &self.runner.name())
            .finish()
    }
}

impl VirtualenvExecutor {
    /// Validate and build an executor using configuration from the environment.
    pub fn new(
        callable: CallableSpec,
        env: EnvironmentSpec,
        args: InvocationArgs,
    ) -> Result<Self, ConfigError> {
        Self::with_config(callable, env, args, ExecutorConfig::from_env())
    }

    /// Like [`new`](Self::new) with an explicit configuration.
    pub fn with_config(
        callable: CallableSpec,
        env: EnvironmentSpec,
        args: InvocationArgs,
        config: ExecutorConfig,
    ) -> Result<Self, ConfigError> {
        env.validate()?;
        let python_version = env.parsed_python_version()?;
        if let Some(version) = python_version {
            if version.major != config.host_python_major && args.passes_values() {
                return Err(ConfigError::CrossVersionArguments {
                    host: config.host_python_major,
                    target: version.major,
                });
            }
        }
        let provisioner = EnvironmentProvisioner::from_config(&config);
        Ok(Self {
            callable,
            env,
            python_version,
            args,
            config,
            provisioner,
            runner: Arc::new(SubprocessRunner),
        })
    }

    /// Replace the subprocess runner.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn callable(&self) -> &CallableSpec {
        &self.callable
    }

    pub fn env(&self) -> &EnvironmentSpec {
        &self.env
    }

    fn target_major(&self) -> u32 {
        self.python_version
            .map(|v| v.major)
            .unwrap_or(self.config.host_python_major)
    }

    fn codec(&self) -> Box<dyn Codec> {
        codec::select_codec(
            self.env.use_dill,
            WireOptions::for_major(self.target_major()),
        )
    }

    /// The program that would run inside the environment.
    pub fn render(&self) -> String {
        render_script(
            self.codec().module_name(),
            &self.callable,
            !self.args.resolve().payload.is_empty(),
        )
    }

    /// Run the function and return what it produced.
    pub fn execute(&self) -> Result<ExecutionResult, VenvError> {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "invocation",
            id = %invocation_id,
            callable = %self.callable.name()
        );
        let _enter = span.enter();
        let started = Instant::now();
        observability::audit_invocation_started(
            &invocation_id,
            self.callable.name(),
            self.env.python_version.as_deref(),
        );
        tracing::debug!(stage = %Stage::Init, "Acquiring workspace");

        let outcome =
            Workspace::acquire(&self.config.workspace_root, &self.config.workspace_prefix)
                .and_then(|workspace| {
                    let result = self.run_stages(&invocation_id, &workspace);
                    workspace.release();
                    result
                });

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok((result, result_len)) => {
                observability::audit_invocation_completed(
                    &invocation_id,
                    None,
                    duration_ms,
                    result_len,
                );
                info_log!("Done. Returned value was: {}", describe(&result));
                tracing::debug!(stage = %Stage::Done, duration_ms, "Invocation finished");
                Ok(result)
            }
            Err(e) => {
                observability::audit_invocation_completed(
                    &invocation_id,
                    Some(e.kind()),
                    duration_ms,
                    0,
                );
                tracing::error!(kind = e.kind(), error = %e, "Invocation failed");
                Err(e)
            }
        }
    }

    fn run_command(
        &self,
        invocation_id: &str,
        stage: Stage,
        cmd: &CommandLine,
    ) -> Result<String, CommandFailure> {
        observability::audit_command_invoked(invocation_id, &stage.to_string(), &cmd.argv());
        self.runner.run(cmd)
    }

    fn run_stages(
        &self,
        invocation_id: &str,
        workspace: &Workspace,
    ) -> Result<(ExecutionResult, u64), VenvError> {
        let env_dir = workspace.path();
        let codec = self.codec();

        tracing::debug!(stage = %Stage::ProvisionEnv, path = %env_dir.display());
        let create = self.provisioner.create_command(
            env_dir,
            self.python_version.as_ref(),
            self.env.system_site_packages,
        );
        self.run_command(invocation_id, Stage::ProvisionEnv, &create)
            .map_err(|failure| VenvError::Setup {
                stage: SetupStage::CreateEnv,
                failure,
            })?;

        match self.provisioner.install_command(env_dir, &self.env.requirements) {
            Some(install) => {
                tracing::debug!(stage = %Stage::InstallDeps, count = self.env.requirements.len());
                self.run_command(invocation_id, Stage::InstallDeps, &install)
                    .map_err(|failure| VenvError::Setup {
                        stage: SetupStage::InstallDeps,
                        failure,
                    })?;
            }
            None => tracing::debug!(stage = %Stage::InstallDeps, "No requirements; skipping"),
        }

        tracing::debug!(stage = %Stage::WriteInputs);
        let resolved = self.args.resolve();
        let args_written =
            codec::write_args(codec.as_ref(), &workspace.input_path(), &resolved.payload)?;

        tracing::debug!(stage = %Stage::WriteScript);
        let script = render_script(codec.module_name(), &self.callable, args_written);
        let script_path = workspace.script_path();
        fs::write(&script_path, &script).map_err(|e| {
            VenvError::io(format!("write {}", script_path.display()), e)
        })?;
        observability::audit_script_written(
            invocation_id,
            &hex::encode(Sha256::digest(script.as_bytes())),
        );

        tracing::debug!(stage = %Stage::WriteStringArgs);
        codec::write_string_args(&workspace.string_args_path(), &resolved.string_args)?;

        let run = self.provisioner.python_command(
            env_dir,
            &script_path,
            &workspace.input_path(),
            &workspace.output_path(),
            &workspace.string_args_path(),
        );
        self.run_command(invocation_id, Stage::Run, &run)
            .map_err(VenvError::Execution)?;

        tracing::debug!(stage = %Stage::ReadResult);
        let output_path = workspace.output_path();
        let result_len = fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        let result = codec::read_result(codec.as_ref(), &output_path)?;
        Ok((result, result_len))
    }
}

/// Result as JSON for logging, falling back to the raw pickle value.
fn describe(result: &ExecutionResult) -> String {
    match result.decode::<serde_json::Value>() {
        Ok(Some(json)) => json.to_string(),
        Ok(None) => "None".to_string(),
        Err(_) => format!("{:?}", result.value()),
    }
}

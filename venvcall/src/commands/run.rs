use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use venvcall_core::config::ExecutorConfig;
use venvcall_sandbox::{EnvironmentSpec, InvocationArgs, VirtualenvExecutor};

use crate::cli::{CallArgs, EnvArgs};

fn parse_json(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON for {}: {}", what, raw))
}

/// Build the environment spec from CLI flags.
pub(crate) fn env_spec(env: &EnvArgs) -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new()
        .with_requirements(env.requirements.iter().cloned())
        .with_system_site_packages(!env.no_system_site_packages)
        .with_dill(env.use_dill);
    if let Some(ref version) = env.python_version {
        spec = spec.with_python_version(version.clone());
    }
    spec
}

/// Build invocation arguments from CLI flags.
pub(crate) fn invocation_args(args: &CallArgs) -> Result<InvocationArgs> {
    let mut out = InvocationArgs::new();
    for raw in &args.positional {
        out = out.arg(parse_json(raw, "--arg")?);
    }
    for pair in &args.keyword {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("--kwarg expects KEY=JSON, got: {}", pair);
        };
        out = out.kwarg(key.trim(), parse_json(raw, "--kwarg")?);
    }
    for s in &args.string_args {
        out = out.string_arg(s.clone());
    }
    if let Some(ref raw) = args.templates_dict {
        let Value::Object(map) = parse_json(raw, "--templates-dict")? else {
            bail!("--templates-dict must be a JSON object");
        };
        out = out.with_templates_dict(map);
    }
    Ok(out)
}

pub fn cmd_run(
    source_file: &str,
    function: Option<&str>,
    env: &EnvArgs,
    args: &CallArgs,
) -> Result<()> {
    let callable = super::load_callable(source_file, function)?;
    let mut config = ExecutorConfig::from_env();
    if let Some(ref bin) = env.virtualenv {
        config = config.with_virtualenv_bin(bin.clone());
    }
    let executor =
        VirtualenvExecutor::with_config(callable, env_spec(env), invocation_args(args)?, config)?;

    let result = match executor.execute() {
        Ok(result) => result,
        Err(e) => {
            if let Some(output) = e.captured_output() {
                eprintln!("{}", output.trim_end());
            }
            return Err(e.into());
        }
    };

    match result.decode::<Value>() {
        Ok(Some(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
        Ok(None) => tracing::info!("Function returned no value"),
        Err(e) => {
            tracing::warn!(error = %e, "Result is not JSON-representable; printing raw value");
            let raw = Map::from_iter([(
                "pickle".to_string(),
                Value::String(format!("{:?}", result.value())),
            )]);
            println!("{}", serde_json::to_string_pretty(&Value::Object(raw))?);
        }
    }
    Ok(())
}

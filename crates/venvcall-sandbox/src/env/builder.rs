//! Commands that build an isolated Python environment and run code inside it.
//!
//! Binaries inside the environment are addressed by path, so nothing ever
//! needs to be activated.

use std::path::{Path, PathBuf};

use venvcall_core::config::ExecutorConfig;

use super::spec::PythonVersion;
use crate::runner::CommandLine;

/// Executable locations inside an environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvPaths {
    root: PathBuf,
}

impl VenvPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts")
        } else {
            self.root.join("bin")
        }
    }

    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(exe_name("python"))
    }

    pub fn pip(&self) -> PathBuf {
        self.bin_dir().join(exe_name("pip"))
    }
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Builds provisioning and interpreter command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProvisioner {
    builder: String,
}

impl EnvironmentProvisioner {
    /// Use `builder` as the environment builder. Bare names are looked up on
    /// PATH; if lookup fails the name is kept and spawning reports the error.
    pub fn new(builder: &str) -> Self {
        let resolved = match which::which(builder) {
            Ok(path) => path_arg(&path),
            Err(e) => {
                tracing::debug!(
                    builder = %builder,
                    error = %e,
                    "Environment builder not resolved on PATH"
                );
                builder.to_string()
            }
        };
        Self { builder: resolved }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(&config.virtualenv_bin)
    }

    pub fn builder(&self) -> &str {
        &self.builder
    }

    /// `virtualenv <dir> [--system-site-packages] [--python=python<version>]`
    pub fn create_command(
        &self,
        env_dir: &Path,
        python_version: Option<&PythonVersion>,
        system_site_packages: bool,
    ) -> CommandLine {
        let mut cmd = CommandLine::new(self.builder.as_str()).arg(path_arg(env_dir));
        if system_site_packages {
            cmd = cmd.arg("--system-site-packages");
        }
        if let Some(version) = python_version {
            cmd = cmd.arg(format!("--python=python{}", version));
        }
        cmd
    }

    /// `<dir>/bin/pip install <requirements...>`, or `None` when there is
    /// nothing to install.
    pub fn install_command(&self, env_dir: &Path, requirements: &[String]) -> Option<CommandLine> {
        if requirements.is_empty() {
            return None;
        }
        Some(
            CommandLine::new(path_arg(&VenvPaths::new(env_dir).pip()))
                .arg("install")
                .args(requirements.iter().cloned()),
        )
    }

    /// `<dir>/bin/python <script> <input> <output> <string_args>`; the three
    /// trailing paths are read positionally by the generated program.
    pub fn python_command(
        &self,
        env_dir: &Path,
        script: &Path,
        input: &Path,
        output: &Path,
        string_args: &Path,
    ) -> CommandLine {
        CommandLine::new(path_arg(&VenvPaths::new(env_dir).python())).args([
            path_arg(script),
            path_arg(input),
            path_arg(output),
            path_arg(string_args),
        ])
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn provisioner() -> EnvironmentProvisioner {
        EnvironmentProvisioner {
            builder: "virtualenv".to_string(),
        }
    }

    #[test]
    fn test_create_command_minimal() {
        let cmd = provisioner().create_command(Path::new("/tmp/venvX"), None, false);
        assert_eq!(cmd.argv(), vec!["virtualenv", "/tmp/venvX"]);
    }

    #[test]
    fn test_create_command_full() {
        let version: PythonVersion = "2.7".parse().unwrap();
        let cmd = provisioner().create_command(Path::new("/tmp/venvX"), Some(&version), true);
        assert_eq!(
            cmd.argv(),
            vec![
                "virtualenv",
                "/tmp/venvX",
                "--system-site-packages",
                "--python=python2.7"
            ]
        );
    }

    #[test]
    fn test_install_command_skipped_when_empty() {
        assert!(provisioner()
            .install_command(Path::new("/tmp/venvX"), &[])
            .is_none());
    }

    #[test]
    fn test_install_command_targets_env_pip() {
        let reqs = vec!["dill".to_string(), "requests>=2".to_string()];
        let cmd = provisioner()
            .install_command(Path::new("/tmp/venvX"), &reqs)
            .unwrap();
        assert_eq!(
            cmd.argv(),
            vec!["/tmp/venvX/bin/pip", "install", "dill", "requests>=2"]
        );
    }

    #[test]
    fn test_python_command_argument_order() {
        let dir = Path::new("/tmp/venvX");
        let cmd = provisioner().python_command(
            dir,
            &dir.join("script.py"),
            &dir.join("script.in"),
            &dir.join("script.out"),
            &dir.join("string_args.txt"),
        );
        assert_eq!(
            cmd.argv(),
            vec![
                "/tmp/venvX/bin/python",
                "/tmp/venvX/script.py",
                "/tmp/venvX/script.in",
                "/tmp/venvX/script.out",
                "/tmp/venvX/string_args.txt"
            ]
        );
    }

    #[test]
    fn test_unresolvable_builder_is_kept_verbatim() {
        let p = EnvironmentProvisioner::new("venvcall-no-such-builder");
        assert_eq!(p.builder(), "venvcall-no-such-builder");
    }
}

//! Per-invocation scratch directory.
//!
//! One `Workspace` exists per invocation and owns the four artifacts exchanged
//! with the isolated interpreter. The directory tree is removed when the
//! workspace is released or dropped, whichever happens first.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::VenvError;

pub const INPUT_FILE: &str = "script.in";
pub const OUTPUT_FILE: &str = "script.out";
pub const STRING_ARGS_FILE: &str = "string_args.txt";
pub const SCRIPT_FILE: &str = "script.py";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh `<prefix>XXXXXX` directory under `base`.
    pub fn acquire(base: &Path, prefix: &str) -> Result<Self, VenvError> {
        std::fs::create_dir_all(base).map_err(|e| {
            VenvError::io(format!("create workspace root {}", base.display()), e)
        })?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(base)
            .map_err(|e| {
                VenvError::io(format!("create workspace in {}", base.display()), e)
            })?;
        tracing::debug!(path = %dir.path().display(), "Workspace acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Serialized `{args, kwargs}`; only present when arguments were passed.
    pub fn input_path(&self) -> PathBuf {
        self.path().join(INPUT_FILE)
    }

    /// Serialized return value; zero length means no value.
    pub fn output_path(&self) -> PathBuf {
        self.path().join(OUTPUT_FILE)
    }

    pub fn string_args_path(&self) -> PathBuf {
        self.path().join(STRING_ARGS_FILE)
    }

    pub fn script_path(&self) -> PathBuf {
        self.path().join(SCRIPT_FILE)
    }

    /// Recursively delete the directory. Failure is logged, never returned,
    /// so it cannot mask the invocation's own result.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Workspace released"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove workspace; leaving it behind"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_live_inside_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(tmp.path(), "venv").unwrap();
        assert!(ws.path().starts_with(tmp.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("venv"));
        for p in [
            ws.input_path(),
            ws.output_path(),
            ws.string_args_path(),
            ws.script_path(),
        ] {
            assert_eq!(p.parent().unwrap(), ws.path());
        }
    }

    #[test]
    fn test_release_removes_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(tmp.path(), "venv").unwrap();
        let root = ws.path().to_path_buf();
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin").join("python"), "#!/bin/sh\n").unwrap();

        ws.release();
        assert!(!root.exists());
    }

    #[test]
    fn test_drop_removes_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = {
            let ws = Workspace::acquire(tmp.path(), "venv").unwrap();
            std::fs::write(ws.script_path(), "print(1)\n").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_release_tolerates_external_removal() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(tmp.path(), "venv").unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.release();
    }

    #[test]
    fn test_acquire_creates_missing_base() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("nested").join("root");
        let ws = Workspace::acquire(&base, "venv").unwrap();
        assert!(ws.path().starts_with(&base));
    }
}

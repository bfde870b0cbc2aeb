//! Requested shape of the isolated environment.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Package that provides the extended pickling codec.
pub const DILL_PACKAGE: &str = "dill";

/// Interpreter version as `MAJOR` or `MAJOR.MINOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: Option<u32>,
}

impl FromStr for PythonVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPythonVersion(s.to_string());
        let trimmed = s.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (trimmed, None),
        };
        let parse = |part: &str| -> Result<u32, ConfigError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };
        Ok(Self {
            major: parse(major)?,
            minor: minor.map(parse).transpose()?,
        })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

/// Packages, interpreter and isolation flags for one executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSpec {
    /// pip requirement strings, installed in order
    pub requirements: Vec<String>,
    /// Interpreter for the environment; `None` uses the builder's default
    pub python_version: Option<String>,
    /// Let the environment see globally installed packages
    pub system_site_packages: bool,
    /// Serialize with dill instead of pickle
    pub use_dill: bool,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            requirements: Vec::new(),
            python_version: None,
            system_site_packages: true,
            use_dill: false,
        }
    }
}

impl EnvironmentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(requirements.into_iter().map(Into::into));
        self
    }

    pub fn with_python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = Some(version.into());
        self
    }

    pub fn with_system_site_packages(mut self, enabled: bool) -> Self {
        self.system_site_packages = enabled;
        self
    }

    pub fn with_dill(mut self, enabled: bool) -> Self {
        self.use_dill = enabled;
        self
    }

    /// Parsed interpreter version, if one was requested.
    pub fn parsed_python_version(&self) -> Result<Option<PythonVersion>, ConfigError> {
        self.python_version
            .as_deref()
            .map(str::parse::<PythonVersion>)
            .transpose()
    }

    /// Whether dill will be importable inside the environment.
    pub fn dill_available(&self) -> bool {
        self.system_site_packages
            || self
                .requirements
                .iter()
                .any(|r| r.trim().to_lowercase().starts_with(DILL_PACKAGE))
    }

    /// Checks that need nothing beyond this environment description.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_dill && !self.dill_available() {
            return Err(ConfigError::DillNotAvailable);
        }
        self.parsed_python_version()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_version_parse() {
        assert_eq!(
            "3".parse::<PythonVersion>().unwrap(),
            PythonVersion {
                major: 3,
                minor: None
            }
        );
        assert_eq!(
            "2.7".parse::<PythonVersion>().unwrap(),
            PythonVersion {
                major: 2,
                minor: Some(7)
            }
        );
        assert_eq!("3.11".parse::<PythonVersion>().unwrap().to_string(), "3.11");
    }

    #[test]
    fn test_python_version_rejects_garbage() {
        for bad in ["", "three", "3.", ".7", "3.11.2", "python3", "-3"] {
            assert!(
                bad.parse::<PythonVersion>().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_defaults_match_operator() {
        let spec = EnvironmentSpec::default();
        assert!(spec.system_site_packages);
        assert!(!spec.use_dill);
        assert!(spec.requirements.is_empty());
        assert!(spec.python_version.is_none());
    }

    #[test]
    fn test_dill_without_site_packages_needs_requirement() {
        let spec = EnvironmentSpec::new()
            .with_system_site_packages(false)
            .with_dill(true)
            .with_requirements(["requests"]);
        assert_eq!(spec.validate().unwrap_err(), ConfigError::DillNotAvailable);

        let spec = spec.with_requirements(["Dill==0.3.8"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_dill_with_site_packages_is_fine() {
        let spec = EnvironmentSpec::new().with_dill(true);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_invalid_version_fails_validation() {
        let spec = EnvironmentSpec::new().with_python_version("latest");
        assert_eq!(
            spec.validate().unwrap_err(),
            ConfigError::InvalidPythonVersion("latest".to_string())
        );
    }
}

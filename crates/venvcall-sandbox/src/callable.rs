//! The function to run, carried as source text.
//!
//! Only the `def` text and its name cross into the isolated interpreter. The
//! text is re-executed verbatim in a fresh process with no access to the
//! defining scope; only plain, self-contained functions are accepted.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::script::dedent;

/// Name Python gives every anonymous function.
pub const LAMBDA_NAME: &str = "<lambda>";

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{XID_Start}_]\p{XID_Continue}*$").unwrap())
}

/// Top-level `def` header: (1) async marker, (2) name, (3) first positional
/// parameter. The parameter may sit on a later line than the `def`, with
/// comments in between.
fn def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(async\s+)?def\s+([\p{XID_Start}_]\p{XID_Continue}*)\s*\((?:\s|#[^\n]*)*([\p{XID_Start}_]\p{XID_Continue}*)?",
        )
        .unwrap()
    })
}

fn lambda_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[\p{XID_Start}_]\p{XID_Continue}*\s*=\s*)?lambda\b").unwrap()
    })
}

#[derive(Debug)]
struct FunctionHeader<'a> {
    is_async: bool,
    name: &'a str,
    first_param: Option<&'a str>,
}

/// Top-level statements only: indented lines belong to a body.
fn top_level_lines(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter(|line| {
        !line.is_empty() && !line.starts_with(char::is_whitespace) && !line.starts_with('#')
    })
}

fn function_headers(source: &str) -> Vec<FunctionHeader<'_>> {
    def_re()
        .captures_iter(source)
        .filter_map(|caps| {
            Some(FunctionHeader {
                is_async: caps.get(1).is_some(),
                name: caps.get(2)?.as_str(),
                first_param: caps.get(3).map(|m| m.as_str()),
            })
        })
        .collect()
}

fn is_lambda(source: &str) -> bool {
    top_level_lines(source).any(|line| lambda_re().is_match(line))
}

/// A plain, named, context-free Python function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSpec {
    name: String,
    source: String,
}

impl CallableSpec {
    /// Validate that `source` defines a plain function called `name`.
    ///
    /// Rejects lambdas, methods (first parameter `self` or `cls`), coroutine
    /// functions, and sources with no matching top-level `def` (classes,
    /// assignments, other callables).
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let source = source.into();

        if name == LAMBDA_NAME {
            return Err(ConfigError::Lambda);
        }
        if !identifier_re().is_match(&name) {
            return Err(ConfigError::InvalidName(name));
        }

        let text = dedent(&source);
        let headers = function_headers(&text);
        let Some(header) = headers.iter().find(|h| h.name == name) else {
            if is_lambda(&text) {
                return Err(ConfigError::Lambda);
            }
            return Err(ConfigError::NotAFunction(name));
        };
        if header.is_async {
            return Err(ConfigError::AsyncFunction(name));
        }
        if let Some(param) = header.first_param {
            if param == "self" || param == "cls" {
                return Err(ConfigError::Method(name, param.to_string()));
            }
        }

        Ok(Self { name, source })
    }

    /// Take the name from the first top-level `def` in `source`.
    pub fn from_source(source: impl Into<String>) -> Result<Self, ConfigError> {
        let source = source.into();
        let text = dedent(&source);
        let name = match function_headers(&text).first() {
            Some(header) => header.name.to_string(),
            None if is_lambda(&text) => return Err(ConfigError::Lambda),
            None => return Err(ConfigError::NoFunctionDefinition),
        };
        Self::new(name, source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text exactly as supplied (possibly indented).
    pub fn source(&self) -> &str {
        &self.source
    }
}

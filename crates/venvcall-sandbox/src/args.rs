//! Arguments handed to the function.
//!
//! Positional and keyword values travel through the pickle codec. String args
//! travel as plain text, one per line, and are the only channel that works
//! when the environment runs a different Python major version.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Keyword under which rendered templates reach the function.
pub const TEMPLATES_DICT_KEY: &str = "templates_dict";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationArgs {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
    /// Exposed to the function as the `virtualenv_string_args` global
    pub string_args: Vec<String>,
    /// Rendered templates, merged into `keyword` right before dispatch
    pub templates_dict: Option<Map<String, Value>>,
}

impl InvocationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn string_arg(mut self, value: impl Into<String>) -> Self {
        self.string_args.push(value.into());
        self
    }

    pub fn with_templates_dict(mut self, templates: Map<String, Value>) -> Self {
        self.templates_dict = Some(templates);
        self
    }

    fn merges_templates(&self) -> bool {
        self.templates_dict.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Whether anything has to go through the codec. Templates count, since
    /// they end up as a keyword argument.
    pub fn passes_values(&self) -> bool {
        !self.positional.is_empty() || !self.keyword.is_empty() || self.merges_templates()
    }

    /// Copy with the templates merged into the keyword arguments.
    pub fn resolve(&self) -> ResolvedArgs {
        let mut keyword = self.keyword.clone();
        if let Some(templates) = self.templates_dict.as_ref().filter(|t| !t.is_empty()) {
            keyword.insert(
                TEMPLATES_DICT_KEY.to_string(),
                Value::Object(templates.clone()),
            );
        }
        ResolvedArgs {
            payload: ArgPayload {
                args: self.positional.clone(),
                kwargs: keyword,
            },
            string_args: self.string_args.clone(),
        }
    }
}

/// The `{"args": [...], "kwargs": {...}}` structure written to the input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArgPayload {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

impl ArgPayload {
    pub fn is_empty(&self) -> bool {
        self.args.len() + self.kwargs.len() == 0
    }
}

/// Arguments as they are dispatched for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArgs {
    pub payload: ArgPayload,
    pub string_args: Vec<String>,
}

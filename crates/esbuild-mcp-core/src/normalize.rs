//! Request-to-engine option normalization.
//!
//! Tool requests arrive as flat JSON objects. [`normalize`] turns one into
//! [`NormalizedOptions`]: pattern fields are compiled into [`Pattern`]s and
//! the positional source text is split off. Nothing is defaulted here; each
//! tool applies its own defaults afterwards with
//! [`NormalizedOptions::set_default`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::bundler::EngineOptions;
use crate::pattern::Pattern;
use esbuild_mcp_common::ToolError;

/// Options whose string values are regular expressions.
pub const PATTERN_FIELDS: [&str; 2] = ["mangleProps", "reserveProps"];

/// The field carrying the source text of a `transform` request.
pub const POSITIONAL_FIELD: &str = "code";

/// Engine-facing options produced from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedOptions {
    fields: Map<String, Value>,
    patterns: BTreeMap<String, Pattern>,
}

impl NormalizedOptions {
    /// A plain (non-pattern) option value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A compiled pattern option.
    pub fn pattern(&self, key: &str) -> Option<&Pattern> {
        self.patterns.get(key)
    }

    /// Returns `true` if `key` is present either as a value or a pattern.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.patterns.contains_key(key)
    }

    /// Set `key` unless the request already gave it a non-null value.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        match self.fields.get(key) {
            Some(existing) if !existing.is_null() => {}
            _ if self.patterns.contains_key(key) => {}
            _ => {
                self.fields.insert(key.to_string(), value.into());
            }
        }
    }

    /// Render the options as the engine's JSON object.
    ///
    /// Patterns become their source strings.
    pub fn into_engine_options(self) -> EngineOptions {
        let mut options = self.fields;
        for (key, pattern) in self.patterns {
            options.insert(key, Value::String(pattern.source().to_string()));
        }
        options
    }
}

/// Result of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub options: NormalizedOptions,
    /// The positional source text, if the request carried one.
    pub positional: Option<String>,
}

/// Normalize a raw request object.
///
/// Unknown fields pass through untouched, nested values included. A
/// non-empty string in a pattern field that fails to compile is a
/// [`ToolError::InvalidPattern`]; any other value in those fields is passed
/// through for the engine to judge.
pub fn normalize(mut request: Map<String, Value>) -> Result<Normalized, ToolError> {
    let positional = request.remove(POSITIONAL_FIELD).and_then(|value| match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    });

    let mut patterns = BTreeMap::new();
    for field in PATTERN_FIELDS {
        let Some(Value::String(source)) = request.get(field) else {
            continue;
        };
        if source.is_empty() {
            continue;
        }

        let pattern = Pattern::compile(source).map_err(|source| ToolError::InvalidPattern {
            field: field.to_string(),
            source,
        })?;
        request.remove(field);
        patterns.insert(field.to_string(), pattern);
    }

    Ok(Normalized {
        options: NormalizedOptions {
            fields: request,
            patterns,
        },
        positional,
    })
}

//! Validated name-matching patterns.

use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};

use esbuild_mcp_common::PatternError;

/// A compiled regular expression that remembers its source text.
///
/// Engine options carry patterns as source strings, so a `Pattern`
/// serializes back to exactly the text it was compiled from.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile `source` into a matcher.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        Regex::new(source)
            .map(|regex| Self { regex })
            .map_err(|e| PatternError {
                pattern: source.to_string(),
                reason: describe(&e),
            })
    }

    /// The text this pattern was compiled from.
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` if `name` matches anywhere.
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// First line of a regex error; the rest is an ASCII-art pointer.
fn describe(err: &regex::Error) -> String {
    match err {
        regex::Error::Syntax(text) => text
            .lines()
            .rev()
            .find(|line| line.starts_with("error:"))
            .map_or_else(|| text.clone(), |line| line.trim_start_matches("error: ").to_string()),
        other => other.to_string(),
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source() == other.source()
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.source())
    }
}

//! Structured compiler messages produced by the engine.
//!
//! These types are opaque data as far as esbuild-mcp is concerned: they are
//! deserialized from the engine and serialized back to callers, never
//! interpreted beyond producing a one-line summary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One compiler message (error, warning, or note).
///
/// Every field is optional on input, and fields this type does not name are
/// kept in `extra` so a message survives a round trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Engine-assigned message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Plugin that raised the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,

    #[serde(default)]
    pub text: String,

    /// Source location, if the message points at one.
    #[serde(default)]
    pub location: Option<Location>,

    /// Attached notes, in order.
    #[serde(default)]
    pub notes: Vec<Diagnostic>,

    /// Arbitrary engine payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Source position of a [`Diagnostic`].
///
/// Callers may send partial locations; absent fields stay absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// 1-based line number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 0-based column in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Errors and warnings from one engine call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSet {
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostic {
    /// Create a message with no location and no notes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}:{}:{}: {}",
                loc.file.as_deref().unwrap_or("<unknown>"),
                loc.line.unwrap_or_default(),
                loc.column.unwrap_or_default(),
                self.text
            ),
            None => f.write_str(&self.text),
        }
    }
}

impl fmt::Display for DiagnosticSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(
            f,
            "Build failed with {count} error{}",
            if count == 1 { "" } else { "s" }
        )?;
        for error in self.errors.iter().take(5) {
            write!(f, "\n{error}")?;
        }
        if count > 5 {
            write!(f, "\n...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(text: &str) -> Diagnostic {
        Diagnostic::new(text).with_location(Location {
            file: Some("src/index.ts".into()),
            line: Some(5),
            column: Some(10),
            line_text: Some("import foo from 'foo';".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::new("oops").to_string(), "oops");
        assert_eq!(
            located("Cannot find module 'foo'").to_string(),
            "src/index.ts:5:10: Cannot find module 'foo'"
        );
    }

    #[test]
    fn test_set_summary() {
        let set = DiagnosticSet {
            errors: vec![located("first"), Diagnostic::new("second")],
            warnings: vec![],
        };
        let summary = set.to_string();
        assert!(summary.starts_with("Build failed with 2 errors"));
        assert!(summary.contains("src/index.ts:5:10: first"));
    }

    #[test]
    fn test_deserialize_engine_message() {
        let json = r#"{
            "id": "err001",
            "text": "Cannot find module 'foo'",
            "location": {"file": "src/index.ts", "line": 5, "column": 10, "lineText": "import foo from 'foo';"},
            "notes": [{"text": "see docs", "location": null}]
        }"#;
        let diag: Diagnostic = serde_json::from_str(json).unwrap();

        assert_eq!(diag.id.as_deref(), Some("err001"));
        assert_eq!(
            diag.location.as_ref().unwrap().line_text.as_deref(),
            Some("import foo from 'foo';")
        );
        assert_eq!(diag.notes.len(), 1);
        assert!(diag.notes[0].location.is_none());
    }

    #[test]
    fn test_partial_message_round_trips() {
        let json = serde_json::json!({
            "text": "x",
            "location": {"file": "a.ts", "line": 1},
            "notes": [{"location": null, "kind": "hint"}],
            "pluginData": {"n": 1}
        });
        let diag: Diagnostic = serde_json::from_value(json).unwrap();

        assert_eq!(diag.location.as_ref().unwrap().column, None);
        assert_eq!(diag.notes[0].text, "");
        assert_eq!(diag.extra["pluginData"], serde_json::json!({"n": 1}));
        assert_eq!(diag.to_string(), "a.ts:1:0: x");

        let back = serde_json::to_value(&diag).unwrap();
        assert_eq!(back["location"], serde_json::json!({"file": "a.ts", "line": 1}));
        assert_eq!(back["notes"][0]["kind"], "hint");
        assert_eq!(back["pluginData"]["n"], 1);
    }

    #[test]
    fn test_missing_location_serializes_as_null() {
        let value = serde_json::to_value(Diagnostic::new("x")).unwrap();
        assert!(value["location"].is_null());
        assert_eq!(value["notes"], serde_json::json!([]));
    }
}

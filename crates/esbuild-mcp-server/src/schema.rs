//! Tool declarations advertised through `tools/list`.

use serde::Serialize;
use serde_json::{Map, Value, json};

pub const BUILD: &str = "esbuild_wasm_build";
pub const CONTEXT: &str = "esbuild_wasm_context";
pub const TRANSFORM: &str = "esbuild_wasm_transform";
pub const ANALYZE_METAFILE: &str = "esbuild_wasm_analyze_metafile";
pub const FORMAT_MESSAGES: &str = "esbuild_wasm_format_messages";
pub const STATUS: &str = "esbuild_wasm_status";
pub const INITIALIZE: &str = "esbuild_wasm_initialize";

/// One tool as advertised to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// All tools, in registration order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: BUILD,
            description: "Bundle entry point files using esbuild-wasm. Returns output contents in memory (does not write to disk by default).",
            input_schema: object_schema(&[build_only(), common()], &["entryPoints"]),
        },
        ToolDefinition {
            name: CONTEXT,
            description: "Create an esbuild-wasm context for incremental builds. Returns the build result. The context is disposed after use.",
            input_schema: object_schema(&[build_only(), common()], &["entryPoints"]),
        },
        ToolDefinition {
            name: TRANSFORM,
            description: "Transform source code (TypeScript, JSX, CSS, etc.) to JavaScript or CSS using esbuild-wasm",
            input_schema: object_schema(&[transform_only(), common()], &["code"]),
        },
        ToolDefinition {
            name: ANALYZE_METAFILE,
            description: "Analyze an esbuild metafile and return a human-readable report of bundle contents and sizes",
            input_schema: object_schema(
                &[properties(json!({
                    "metafile": {
                        "type": "string",
                        "description": "The metafile produced by a build, as a JSON string"
                    },
                    "verbose": {
                        "type": "boolean",
                        "description": "Include every input file in the report"
                    }
                }))],
                &["metafile"],
            ),
        },
        ToolDefinition {
            name: FORMAT_MESSAGES,
            description: "Format esbuild error or warning messages into human-readable strings",
            input_schema: object_schema(
                &[properties(json!({
                    "messages": {
                        "type": "array",
                        "description": "Messages as returned in the errors or warnings of a build",
                        "items": message_schema()
                    },
                    "kind": {
                        "type": "string",
                        "enum": ["error", "warning"]
                    },
                    "terminalWidth": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Wrap long lines at this width"
                    }
                }))],
                &["messages", "kind"],
            ),
        },
        ToolDefinition {
            name: STATUS,
            description: "Report the esbuild-wasm engine state: status, version, load options, last error, and load time",
            input_schema: object_schema(&[], &[]),
        },
        ToolDefinition {
            name: INITIALIZE,
            description: "Load or reload the esbuild-wasm engine, optionally from a local module path or remote URL",
            input_schema: object_schema(
                &[properties(json!({
                    "remoteURL": {
                        "type": "string",
                        "format": "uri",
                        "description": "Fetch the engine module from this URL"
                    },
                    "localModulePath": {
                        "type": "string",
                        "description": "Read the engine module from this path"
                    },
                    "useWorker": {
                        "type": "boolean",
                        "description": "Run the engine on a dedicated worker task"
                    }
                }))],
                &[],
            ),
        },
    ]
}

fn object_schema(parts: &[Map<String, Value>], required: &[&str]) -> Value {
    let mut merged = Map::new();
    for part in parts {
        merged.extend(part.clone());
    }

    let mut schema = json!({
        "type": "object",
        "properties": merged,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn properties(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn message_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": {"type": "string"},
            "location": {
                "type": ["object", "null"],
                "properties": {
                    "file": {"type": "string"},
                    "line": {"type": "integer"},
                    "column": {"type": "integer"},
                    "lineText": {"type": "string"}
                }
            },
            "notes": {"type": "array", "items": {"type": "object"}}
        },
        "required": ["text"]
    })
}

fn build_only() -> Map<String, Value> {
    properties(json!({
        "entryPoints": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Entry point files to bundle"
        },
        "bundle": {"type": "boolean", "description": "Inline imported dependencies (default: true)"},
        "outdir": {"type": "string"},
        "outfile": {"type": "string"},
        "platform": {"type": "string", "enum": ["browser", "node", "neutral"]},
        "splitting": {"type": "boolean"},
        "external": {"type": "array", "items": {"type": "string"}},
        "metafile": {"type": "boolean", "description": "Return a metafile describing the bundle"},
        "write": {"type": "boolean", "description": "Write output files to disk (default: false)"}
    }))
}

fn transform_only() -> Map<String, Value> {
    properties(json!({
        "code": {"type": "string", "description": "Source code to transform"},
        "loader": {
            "type": "string",
            "enum": ["js", "jsx", "ts", "tsx", "css", "json", "text"],
            "description": "How to interpret the input (default: ts)"
        },
        "sourcefile": {"type": "string", "description": "File name used in messages and source maps"}
    }))
}

fn common() -> Map<String, Value> {
    properties(json!({
        "format": {"type": "string", "enum": ["iife", "cjs", "esm"]},
        "target": {
            "oneOf": [
                {"type": "string"},
                {"type": "array", "items": {"type": "string"}}
            ]
        },
        "minify": {"type": "boolean"},
        "minifyWhitespace": {"type": "boolean"},
        "minifyIdentifiers": {"type": "boolean"},
        "minifySyntax": {"type": "boolean"},
        "sourcemap": {
            "oneOf": [
                {"type": "boolean"},
                {"type": "string", "enum": ["linked", "inline", "external", "both"]}
            ]
        },
        "define": {"type": "object", "additionalProperties": {"type": "string"}},
        "jsx": {"type": "string", "enum": ["transform", "preserve", "automatic"]},
        "treeShaking": {"type": "boolean"},
        "mangleProps": {
            "type": "string",
            "description": "Regular expression selecting property names to mangle"
        },
        "reserveProps": {
            "type": "string",
            "description": "Regular expression selecting property names never to mangle"
        },
        "mangleCache": {"type": "object", "additionalProperties": {"type": ["string", "boolean"]}}
    }))
}

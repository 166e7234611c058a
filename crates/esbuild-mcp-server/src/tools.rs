//! Tool handlers.
//!
//! Each handler validates its arguments, obtains the engine through the
//! lazy accessor, and returns a [`ToolResponse`]. Argument problems are
//! reported before the engine is touched, so they never trigger a load.

use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use esbuild_mcp_common::{Diagnostic, LoadOptions, ToolError};
use esbuild_mcp_core::{
    AnalyzeOptions, BuildResult, EngineManager, EngineState, FormatOptions, MessageKind, OutputFile,
    TransformResult, normalize,
};

use crate::response::{ToolResponse, to_error_response};
use crate::schema;

/// Arguments of a tool call.
pub type ToolArgs = Map<String, Value>;

/// Run the tool `name`, or `None` if no such tool exists.
pub async fn call_tool(manager: &EngineManager, name: &str, args: ToolArgs) -> Option<ToolResponse> {
    let start = Instant::now();

    let response = match name {
        schema::BUILD => build(manager, args).await,
        schema::CONTEXT => context(manager, args).await,
        schema::TRANSFORM => transform(manager, args).await,
        schema::ANALYZE_METAFILE => analyze_metafile(manager, args).await,
        schema::FORMAT_MESSAGES => format_messages(manager, args).await,
        schema::STATUS => status(manager),
        schema::INITIALIZE => initialize(manager, args).await,
        _ => return None,
    };

    if response.is_error {
        warn!(
            tool = name,
            duration_ms = start.elapsed().as_millis(),
            "Tool call failed"
        );
    } else {
        info!(
            tool = name,
            duration_ms = start.elapsed().as_millis(),
            "Tool call completed"
        );
    }

    Some(response)
}

fn respond<T: Serialize>(result: Result<T, ToolError>) -> ToolResponse {
    match result {
        Ok(payload) => ToolResponse::success_json(&payload),
        Err(err) => to_error_response(err),
    }
}

fn parse_args<T: DeserializeOwned>(args: ToolArgs) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolError::validation(format!("Invalid arguments: {e}")))
}

/// Build output as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildOutput {
    output_files: Vec<OutputFile>,
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metafile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mangle_cache: Option<Map<String, Value>>,
}

impl BuildOutput {
    fn new(result: BuildResult, with_metafile: bool) -> Self {
        Self {
            output_files: result.output_files,
            warnings: result.warnings,
            errors: result.errors,
            metafile: result.metafile.filter(|_| with_metafile),
            mangle_cache: result.mangle_cache,
        }
    }
}

/// Transform output as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransformOutput {
    code: String,
    warnings: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "String::is_empty")]
    map: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mangle_cache: Option<Map<String, Value>>,
}

impl From<TransformResult> for TransformOutput {
    fn from(result: TransformResult) -> Self {
        Self {
            code: result.code,
            warnings: result.warnings,
            map: result.map,
            mangle_cache: result.mangle_cache,
        }
    }
}

/// Normalize build arguments and apply the build defaults.
fn build_options(args: ToolArgs) -> Result<Map<String, Value>, ToolError> {
    let mut options = normalize(args)?.options;
    options.set_default("bundle", true);
    options.set_default("write", false);
    Ok(options.into_engine_options())
}

#[instrument(skip_all, fields(tool = schema::BUILD))]
pub async fn build(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    respond(try_build(manager, args).await)
}

async fn try_build(manager: &EngineManager, args: ToolArgs) -> Result<BuildOutput, ToolError> {
    let options = build_options(args)?;
    let engine = manager.get_engine().await?;
    let result = engine.build(options).await?;
    debug!(
        output_files = result.output_files.len(),
        warnings = result.warnings.len(),
        "Build finished"
    );
    Ok(BuildOutput::new(result, true))
}

#[instrument(skip_all, fields(tool = schema::CONTEXT))]
pub async fn context(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    respond(try_context(manager, args).await)
}

async fn try_context(manager: &EngineManager, args: ToolArgs) -> Result<BuildOutput, ToolError> {
    let options = build_options(args)?;
    let engine = manager.get_engine().await?;
    let mut ctx = engine.context(options).await?;

    let rebuilt = ctx.rebuild().await;
    // Disposal runs whatever the rebuild outcome
    if let Err(e) = ctx.dispose().await {
        warn!(error = %e, "Failed to dispose build context");
    }

    Ok(BuildOutput::new(rebuilt?, false))
}

#[instrument(skip_all, fields(tool = schema::TRANSFORM))]
pub async fn transform(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    respond(try_transform(manager, args).await)
}

async fn try_transform(
    manager: &EngineManager,
    args: ToolArgs,
) -> Result<TransformOutput, ToolError> {
    let normalized = normalize(args)?;
    let code = normalized
        .positional
        .ok_or_else(|| ToolError::validation("Missing required argument 'code'"))?;
    let mut options = normalized.options;
    options.set_default("loader", "ts");

    let engine = manager.get_engine().await?;
    let result = engine
        .transform(&code, options.into_engine_options())
        .await?;
    Ok(TransformOutput::from(result))
}

#[derive(serde::Deserialize)]
struct AnalyzeArgs {
    metafile: String,
    #[serde(default)]
    verbose: Option<bool>,
}

#[instrument(skip_all, fields(tool = schema::ANALYZE_METAFILE))]
pub async fn analyze_metafile(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    // The report is already human-readable text
    match try_analyze_metafile(manager, args).await {
        Ok(report) => ToolResponse::text(report),
        Err(err) => to_error_response(err),
    }
}

async fn try_analyze_metafile(manager: &EngineManager, args: ToolArgs) -> Result<String, ToolError> {
    let args: AnalyzeArgs = parse_args(args)?;
    let metafile: Value = serde_json::from_str(&args.metafile)
        .map_err(|e| ToolError::validation(format!("Invalid JSON in metafile: {e}")))?;

    let engine = manager.get_engine().await?;
    let report = engine
        .analyze_metafile(
            metafile,
            AnalyzeOptions {
                verbose: args.verbose,
            },
        )
        .await?;
    Ok(report)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatArgs {
    messages: Vec<Diagnostic>,
    kind: MessageKind,
    #[serde(default)]
    terminal_width: Option<u32>,
}

#[instrument(skip_all, fields(tool = schema::FORMAT_MESSAGES))]
pub async fn format_messages(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    respond(try_format_messages(manager, args).await)
}

async fn try_format_messages(
    manager: &EngineManager,
    args: ToolArgs,
) -> Result<Vec<String>, ToolError> {
    let args: FormatArgs = parse_args(args)?;
    let options = FormatOptions {
        kind: args.kind,
        color: false,
        terminal_width: args.terminal_width,
    };

    let engine = manager.get_engine().await?;
    Ok(engine.format_messages(args.messages, options).await?)
}

#[instrument(skip_all, fields(tool = schema::STATUS))]
pub fn status(manager: &EngineManager) -> ToolResponse {
    ToolResponse::success_json(&manager.get_state())
}

#[instrument(skip_all, fields(tool = schema::INITIALIZE))]
pub async fn initialize(manager: &EngineManager, args: ToolArgs) -> ToolResponse {
    respond(try_initialize(manager, args).await)
}

async fn try_initialize(
    manager: &EngineManager,
    args: ToolArgs,
) -> Result<EngineState, ToolError> {
    let options: LoadOptions = parse_args(args)?;
    Ok(manager.load(options).await?)
}

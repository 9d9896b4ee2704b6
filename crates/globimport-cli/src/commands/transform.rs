//! `globimport transform` command implementation.

use super::project::ProjectArgs;
use globimport_core::{paths, Config, GlobTransformer, ResolvedGlobSet, SourceMap, TransformOutput};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Transform command action.
#[derive(Debug, Clone)]
pub struct TransformAction {
    pub file: PathBuf,
    pub project: ProjectArgs,
    pub sourcemap: bool,
}

/// Transform result for JSON output.
#[derive(Serialize)]
struct TransformResult {
    ok: bool,
    transformed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<SourceMap>,
    globs: Vec<ResolvedGlobSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pos: Option<usize>,
}

/// Run the transform command.
pub fn run(config: &Config, action: TransformAction) -> Result<()> {
    let project = action.project.resolve(&config.cwd)?;
    let file = if action.file.is_absolute() {
        action.file.clone()
    } else {
        config.cwd.join(&action.file)
    };
    let file = dunce::canonicalize(&file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot open {}", file.display()))?;
    let id = paths::path_to_posix(&file);
    let code = std::fs::read_to_string(&file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {id}"))?;

    let transformer = GlobTransformer::new(&project.root_id, project.options.clone());
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(transformer.transform(&code, &id, &project.resolver));

    match result {
        Ok(output) => {
            if let Some(output) = &output {
                info!(id = %id, globs = output.globs.len(), "transformed");
            }
            print_output(code, output, action.sourcemap, config.json_logs)
        }
        Err(e) => {
            if config.json_logs {
                let result = TransformResult {
                    ok: false,
                    transformed: false,
                    code: None,
                    map: None,
                    globs: Vec::new(),
                    error: Some(ErrorInfo {
                        code: e.code(),
                        message: e.to_string(),
                        pos: e.pos(),
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
                std::process::exit(1);
            }
            Err::<(), _>(e)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to transform {id}"))
        }
    }
}

fn print_output(
    original: String,
    output: Option<TransformOutput>,
    sourcemap: bool,
    json: bool,
) -> Result<()> {
    if json {
        let result = match output {
            Some(output) => TransformResult {
                ok: true,
                transformed: true,
                code: Some(output.code),
                map: sourcemap.then_some(output.map),
                globs: output.globs,
                error: None,
            },
            None => TransformResult {
                ok: true,
                transformed: false,
                code: Some(original),
                map: None,
                globs: Vec::new(),
                error: None,
            },
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        return Ok(());
    }

    if sourcemap {
        warn!("--sourcemap only applies to --json output");
    }
    match output {
        Some(output) => print!("{}", output.code),
        None => print!("{original}"),
    }
    Ok(())
}

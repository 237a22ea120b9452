use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::HookContext;
use super::types::{HookEvent, HookInput, HookName, Verdict};
use super::utils;
use crate::cache::{CachedResult, RESULTS_CACHE_FILE, ResultsCache, TSCONFIG_CACHE_FILE, TsConfigCache};
use crate::error::Result;

fn tsc_error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+)\((\d+),(\d+)\):\s+(error\s+TS\d+):\s+(.+)$").expect("tsc pattern is valid")
    })
}

/// One `file(line,col): error TSxxxx: message` line of tsc output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TscError {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
}

/// Type-check edited `.ts`/`.tsx` files, reusing cached verdicts for
/// unchanged content.
pub async fn handle(ctx: &HookContext, input: &HookInput) -> Result<Verdict> {
    if !input.event_is_or_absent(HookEvent::PostToolUse) {
        return Ok(Verdict::ok());
    }

    let mut messages = Vec::new();
    for tool in input.tool_uses().iter().filter(|t| t.is_edit_or_write()) {
        let file = tool.file_path();
        if !utils::is_typescript_file(file) {
            continue;
        }
        let path = ctx.resolve_file(file);
        if !path.is_file() {
            continue;
        }

        let verdict = check_file(ctx, &path).await?;
        if verdict.is_blocked() {
            return Ok(verdict);
        }
        messages.extend(verdict.message);
    }

    if messages.is_empty() {
        Ok(Verdict::ok())
    } else {
        Ok(Verdict::ok_with(messages.join("\n")))
    }
}

async fn check_file(ctx: &HookContext, path: &Path) -> Result<Verdict> {
    let file = path.to_string_lossy().to_string();
    let name = utils::basename(&file);

    let mut configs = TsConfigCache::load(ctx.state_dir.join(TSCONFIG_CACHE_FILE), &ctx.project_root);
    let Some(config) = configs.find_for_file(&file)? else {
        return Ok(Verdict::ok_with("⚠️ No tsconfig.json found, skipping typecheck"));
    };

    let mut results = ResultsCache::load(ctx.state_dir.join(RESULTS_CACHE_FILE));
    if let Some(cached) = results.get(&file) {
        debug!(file = %file, success = cached.success, "typecheck cache hit");
        return Ok(if cached.success {
            Verdict::ok_with(format!("✅ TypeScript: {} (cached)", name))
        } else {
            let mut verdict = Verdict::blocked(cached.message.clone());
            verdict.details = cached.details.clone();
            verdict
        });
    }

    let ts = &ctx.config.typescript;
    let mut spec = ctx
        .package_manager()
        .exec("tsc", &ctx.project_root, ts.timeout)
        .arg("--noEmit");
    if ts.skip_lib_check {
        spec = spec.arg("--skipLibCheck");
    }
    spec = spec
        .arg("--incremental")
        .arg("--project")
        .arg(config.to_string_lossy());

    let output = match ctx.runner.run(&spec).await {
        Ok(output) => output,
        Err(e) if e.is_tool_unavailable() => {
            warn!(error = %e, "tsc unavailable");
            utils::log_hook_error(&ctx.state_dir, HookName::TypecheckAfterEdit.as_str(), &e.to_string());
            return Ok(Verdict::ok_with(format!("⚠️ TypeScript check failed: {}", e)));
        }
        Err(e) => return Err(e),
    };

    let all_errors = if output.success() {
        Vec::new()
    } else {
        parse_tsc_output(&format!("{}\n{}", output.stdout, output.stderr))
    };

    if !output.success() && all_errors.is_empty() {
        let first = output.combined().lines().next().unwrap_or("").to_string();
        warn!(output = %first, "tsc failed without diagnostics");
        utils::log_hook_error(
            &ctx.state_dir,
            HookName::TypecheckAfterEdit.as_str(),
            &format!("tsc failed without diagnostics: {}", first),
        );
        return Ok(Verdict::ok_with(format!("⚠️ TypeScript check failed: {}", first)));
    }

    let (relevant, dependency): (Vec<TscError>, Vec<TscError>) = all_errors
        .into_iter()
        .partition(|e| refers_to(&e.file, path, &ctx.project_root));

    if relevant.is_empty() {
        let mut message = format!("✅ TypeScript: {}", name);
        if output.success() {
            message.push_str(" (incremental)");
        }
        if !dependency.is_empty() {
            message.push_str(&format!(" [{} errors in dependencies]", dependency.len()));
        }
        results.set(
            &file,
            CachedResult {
                success: true,
                message: message.clone(),
                details: None,
            },
        )?;
        return Ok(Verdict::ok_with(message));
    }

    let mut message = format!("❌ TypeScript errors in {}:\n\n{}", name, format_errors(&relevant));
    if !dependency.is_empty() {
        if ts.show_dependency_errors {
            message.push_str(&format!(
                "\n\n⚠️ {} errors in dependencies:\n\n{}",
                dependency.len(),
                format_errors(&dependency)
            ));
        } else {
            message.push_str(&format!("\n\n⚠️ {} errors in dependencies (hidden)", dependency.len()));
        }
    }

    let details = json!({
        "file": file,
        "errors": relevant,
        "dependencyErrors": dependency.len(),
    });
    results.set(
        &file,
        CachedResult {
            success: false,
            message: message.clone(),
            details: Some(details.clone()),
        },
    )?;

    Ok(Verdict::blocked(message).with_details(details))
}

pub fn parse_tsc_output(output: &str) -> Vec<TscError> {
    output
        .lines()
        .filter_map(|line| tsc_error_re().captures(line.trim_end()))
        .filter_map(|c| {
            Some(TscError {
                file: utils::normalize_path(&c[1]),
                line: c[2].parse().ok()?,
                column: c[3].parse().ok()?,
                code: c[4].to_string(),
                message: c[5].to_string(),
            })
        })
        .collect()
}

/// Whether a path printed by tsc (usually relative to the project root)
/// names `edited`.
fn refers_to(reported: &str, edited: &Path, project_root: &Path) -> bool {
    let reported = reported.trim_start_matches("./");
    let absolute = utils::normalize_path(&edited.to_string_lossy());
    if reported == absolute {
        return true;
    }
    if let Ok(relative) = edited.strip_prefix(project_root)
        && utils::normalize_path(&relative.to_string_lossy()) == reported
    {
        return true;
    }
    absolute.ends_with(&format!("/{}", reported))
}

fn format_errors(errors: &[TscError]) -> String {
    errors
        .iter()
        .map(|e| {
            format!(
                "{}:{}:{}\n  {}: {}",
                utils::basename(&e.file),
                e.line,
                e.column,
                e.code,
                e.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

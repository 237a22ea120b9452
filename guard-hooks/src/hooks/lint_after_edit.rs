use serde_json::json;
use tracing::{info, warn};

use super::HookContext;
use super::types::{HookEvent, HookInput, HookName, Verdict};
use super::utils;
use crate::error::Result;
use crate::runner::CommandOutput;

/// Shell utilities that may create, move or rewrite files.
const FILE_OPERATIONS: [&str; 7] = ["mv", "cp", "rm", "mkdir", "touch", "sed", "awk"];

/// Timeout for the project-wide `lint` script.
const PROJECT_LINT_TIMEOUT_MS: u64 = 60_000;

/// How much ESLint output a blocked verdict carries.
const OUTPUT_EXCERPT_CHARS: usize = 500;

/// Lint edited code files with ESLint, or the whole project after Bash file
/// operations that touched no file through Edit/Write.
pub async fn handle(ctx: &HookContext, input: &HookInput) -> Result<Verdict> {
    if !input.event_is_or_absent(HookEvent::PostToolUse) {
        return Ok(Verdict::ok());
    }

    let uses = input.tool_uses();
    let edited: Vec<&str> = uses
        .iter()
        .filter(|t| t.is_edit_or_write())
        .map(|t| t.file_path())
        .filter(|f| !f.is_empty())
        .collect();
    let bash_file_op = uses
        .iter()
        .filter(|t| t.is_bash())
        .any(|t| FILE_OPERATIONS.iter().any(|op| utils::contains_word(t.command(), op)));

    if edited.is_empty() && !bash_file_op {
        return Ok(Verdict::ok());
    }

    if utils::contains_word(input.prompt(), "skip-lint") {
        return Ok(Verdict::ok_with("⏭️ Lint skipped (skip-lint)"));
    }

    if edited.is_empty() {
        return lint_project(ctx).await;
    }

    let files: Vec<&str> = edited
        .into_iter()
        .filter(|f| utils::is_code_file(f))
        .filter(|f| ctx.resolve_file(f).exists())
        .collect();
    if files.is_empty() {
        return Ok(Verdict::ok());
    }

    lint_files(ctx, &files).await
}

async fn lint_files(ctx: &HookContext, files: &[&str]) -> Result<Verdict> {
    let eslint = &ctx.config.eslint;
    let mut spec = ctx
        .package_manager()
        .exec("eslint", &ctx.project_root, eslint.timeout)
        .args(files.iter().copied());
    if eslint.autofix {
        spec = spec.arg("--fix");
    }

    let output = match ctx.runner.run(&spec).await {
        Ok(output) => output,
        Err(e) if e.is_tool_unavailable() => {
            warn!(error = %e, "eslint unavailable");
            utils::log_hook_error(&ctx.state_dir, HookName::LintAfterEdit.as_str(), &e.to_string());
            return Ok(Verdict::ok_with(format!("⚠️ ESLint not available: {}", e)));
        }
        Err(e) => return Err(e),
    };

    let target = if files.len() == 1 {
        files[0].to_string()
    } else {
        format!("{} files", files.len())
    };

    if output.success() {
        info!(files = files.len(), "lint passed");
        return Ok(Verdict::ok_with(format!("✅ Lint passed: {}", target)));
    }
    Ok(relay_failure(ctx, &output, &target, "ESLint not available or failed to run"))
}

async fn lint_project(ctx: &HookContext) -> Result<Verdict> {
    info!("bash file operation detected, linting the whole project");
    let spec = ctx
        .package_manager()
        .run_script("lint", &ctx.project_root, PROJECT_LINT_TIMEOUT_MS);

    let output = match ctx.runner.run(&spec).await {
        Ok(output) => output,
        Err(e) if e.is_tool_unavailable() => {
            warn!(error = %e, "project lint unavailable");
            utils::log_hook_error(&ctx.state_dir, HookName::LintAfterEdit.as_str(), &e.to_string());
            return Ok(Verdict::ok_with(format!("⚠️ Project lint not available: {}", e)));
        }
        Err(e) => return Err(e),
    };

    if output.success() {
        return Ok(Verdict::ok_with("✅ Lint passed (whole project)"));
    }
    Ok(relay_failure(ctx, &output, "project", "Project lint script failed to run"))
}

/// Lint problems block; any other non-zero exit is reported as a warning.
fn relay_failure(ctx: &HookContext, output: &CommandOutput, target: &str, unavailable: &str) -> Verdict {
    let text = output.combined();
    if !(text.contains("error") || text.contains('✖')) {
        let reason = text.lines().next().unwrap_or("");
        warn!(scope = %target, reason = %reason, "lint did not run");
        utils::log_hook_error(
            &ctx.state_dir,
            HookName::LintAfterEdit.as_str(),
            &format!("{}: {}", unavailable, reason),
        );
        return Verdict::ok_with(format!("⚠️ {}: {}", unavailable, target));
    }

    let (errors, warnings) = count_problems(text);
    let excerpt: String = text.chars().take(OUTPUT_EXCERPT_CHARS).collect();
    Verdict::blocked(format!(
        "❌ ESLint found errors in {}:\n\n{}\n\n💡 Fix the errors before continuing, or add \"skip-lint\" to your message.",
        target, excerpt
    ))
    .with_details(json!({
        "errorCount": errors,
        "warningCount": warnings,
    }))
}

/// Counts ESLint's `N problems (E errors, W warnings)` summary when present,
/// otherwise occurrences of `error`/`warning`.
fn count_problems(text: &str) -> (usize, usize) {
    let summary = regex::Regex::new(r"\((\d+) errors?, (\d+) warnings?\)")
        .ok()
        .and_then(|re| re.captures(text).map(|c| (c[1].parse().ok(), c[2].parse().ok())));
    if let Some((Some(errors), Some(warnings))) = summary {
        return (errors, warnings);
    }
    let lower = text.to_lowercase();
    (lower.matches("error").count(), lower.matches("warning").count())
}

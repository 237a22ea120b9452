//! Runs every guard hook over one tool call and folds the verdicts.
//!
//! Validation hooks are independent and may run concurrently; formatting
//! rewrites files, so it runs afterwards and only when nothing blocked.
//! The first blocked verdict in pipeline order wins.

use std::time::Instant;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use super::dispatcher::{parse_input, run_guarded};
use super::types::{HookInput, HookName, Verdict};
use super::{HookContext, is_enabled, utils};

/// Hooks that only read the workspace.
pub const PARALLEL_GROUP: [HookName; 4] = [
    HookName::CheckDependencies,
    HookName::ValidateImports,
    HookName::TypecheckAfterEdit,
    HookName::LintAfterEdit,
];

/// Hooks that modify files, run one at a time after the parallel group.
pub const SEQUENTIAL_GROUP: [HookName; 1] = [HookName::FormatOnEdit];

/// Parse stdin and run the pipeline. Never blocks on its own errors.
pub async fn orchestrate_stdin(ctx: &HookContext, stdin_json: &str) -> (String, i32) {
    match parse_input(stdin_json) {
        Ok(input) => orchestrate(ctx, &input).await.render(),
        Err(e) => {
            warn!(error = %e, "orchestrator could not parse stdin");
            utils::log_hook_error(&ctx.state_dir, "orchestrator", &e.to_string());
            Verdict::ok_with(format!("Orchestrator error: {}", e)).render()
        }
    }
}

pub async fn orchestrate(ctx: &HookContext, input: &HookInput) -> Verdict {
    let settings = &ctx.config.orchestrator;
    let started = Instant::now();

    let hooks: Vec<HookName> = PARALLEL_GROUP
        .into_iter()
        .filter(|name| is_enabled(*name, &ctx.config))
        .collect();

    let mut results = if settings.parallel {
        join_all(hooks.iter().map(|name| timed(*name, ctx, input))).await
    } else {
        run_in_order(&hooks, ctx, input, settings.stop_on_first_error).await
    };

    let blocked_early = results.iter().any(|(_, v)| v.is_blocked());
    if !(blocked_early && settings.stop_on_first_error) {
        let sequential: Vec<HookName> = SEQUENTIAL_GROUP
            .into_iter()
            .filter(|name| is_enabled(*name, &ctx.config))
            .collect();
        results.extend(run_in_order(&sequential, ctx, input, settings.stop_on_first_error).await);
    }

    if settings.verbose {
        info!(hooks = results.len(), elapsed_ms = started.elapsed().as_millis() as u64, "pipeline finished");
    }

    fold(results, settings.stop_on_first_error)
}

async fn timed(name: HookName, ctx: &HookContext, input: &HookInput) -> (HookName, Verdict) {
    let started = Instant::now();
    let verdict = run_guarded(name, ctx, input).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if ctx.config.orchestrator.verbose {
        info!(hook = %name, status = ?verdict.status, elapsed_ms, "hook finished");
    } else {
        debug!(hook = %name, blocked = verdict.is_blocked(), elapsed_ms, "hook finished");
    }
    (name, verdict)
}

async fn run_in_order(
    hooks: &[HookName],
    ctx: &HookContext,
    input: &HookInput,
    stop_on_block: bool,
) -> Vec<(HookName, Verdict)> {
    let mut results = Vec::with_capacity(hooks.len());
    for name in hooks {
        let (name, verdict) = timed(*name, ctx, input).await;
        let blocked = verdict.is_blocked();
        results.push((name, verdict));
        if blocked && stop_on_block {
            break;
        }
    }
    results
}

/// First blocked verdict in pipeline order, or every blocked verdict
/// combined when `stop_on_first_error` is off. `ok` messages go to stderr.
fn fold(results: Vec<(HookName, Verdict)>, stop_on_first_error: bool) -> Verdict {
    let mut blocked = Vec::new();
    for (name, verdict) in results {
        if verdict.is_blocked() {
            blocked.push((name, verdict));
        } else if let Some(message) = &verdict.message {
            eprintln!("{}", message);
        }
    }

    if blocked.is_empty() {
        return Verdict::ok();
    }
    if stop_on_first_error || blocked.len() == 1 {
        return blocked.swap_remove(0).1;
    }

    let message = blocked
        .iter()
        .map(|(_, v)| v.message.clone().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n\n");
    let hooks: Vec<_> = blocked
        .iter()
        .map(|(name, v)| {
            json!({
                "hook": name.as_str(),
                "message": v.message,
                "details": v.details,
            })
        })
        .collect();
    Verdict::blocked(message).with_details(json!({ "hooks": hooks, "count": blocked.len() }))
}

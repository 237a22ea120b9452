use tracing::{info, warn};

use super::types::{HookInput, HookName, Verdict};
use super::{HookContext, is_enabled, run_hook, utils};

/// Parse stdin into a `HookInput`. Empty input is treated as `{}`.
pub fn parse_input(stdin_json: &str) -> Result<HookInput, serde_json::Error> {
    if stdin_json.trim().is_empty() {
        return Ok(HookInput::default());
    }
    serde_json::from_str(stdin_json)
}

/// Run a single hook end to end.
///
/// - Parses `stdin_json` into a `HookInput`
/// - Disabled hooks return `ok`
/// - On parse or handler error: logs to `.hook-errors.log`, returns `ok` with a
///   warning (fail-open)
/// - Never panics
pub async fn dispatch(name: HookName, ctx: &HookContext, stdin_json: &str) -> (String, i32) {
    let input = match parse_input(stdin_json) {
        Ok(input) => input,
        Err(e) => {
            let message = format!("Failed to parse hook stdin: {}", e);
            warn!(hook = %name, "{}", message);
            utils::log_hook_error(&ctx.state_dir, name.as_str(), &message);
            return Verdict::ok_with(format!("⚠️ {}", message)).render();
        }
    };

    run_guarded(name, ctx, &input).await.render()
}

/// Run `name` against an already parsed input, converting any error into an
/// `ok` verdict carrying a warning.
pub async fn run_guarded(name: HookName, ctx: &HookContext, input: &HookInput) -> Verdict {
    if !is_enabled(name, &ctx.config) {
        info!(hook = %name, "disabled, skipping");
        return Verdict::ok();
    }

    match run_hook(name, ctx, input).await {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(hook = %name, error = %e, "hook failed, allowing");
            utils::log_hook_error(&ctx.state_dir, name.as_str(), &e.to_string());
            Verdict::ok_with(format!("⚠️ {} failed: {}", name, e))
        }
    }
}

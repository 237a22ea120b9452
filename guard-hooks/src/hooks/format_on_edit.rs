use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::HookContext;
use super::types::{HookEvent, HookInput, HookName, Verdict};
use super::utils;
use crate::error::Result;

const FORMATTABLE_EXTENSIONS: [&str; 9] = ["ts", "tsx", "js", "jsx", "json", "css", "scss", "md", "html"];

const SKIP_DIRS: [&str; 5] = ["node_modules", "dist", "build", ".next", "coverage"];

/// Run Prettier over files written by Edit/Write. Never blocks.
pub async fn handle(ctx: &HookContext, input: &HookInput) -> Result<Verdict> {
    if input.event_kind() != Some(HookEvent::PostToolUse) {
        return Ok(Verdict::ok());
    }
    if !has_prettier(&ctx.project_root) {
        return Ok(Verdict::ok_with("Prettier not found in project dependencies, skipping format"));
    }

    let mut messages = Vec::new();
    for tool in input.tool_uses().iter().filter(|t| t.is_edit_or_write()) {
        let file = tool.file_path();
        if file.is_empty() || !ctx.resolve_file(file).is_file() || !should_format(file) {
            continue;
        }
        messages.push(format_file(ctx, file).await);
    }

    if messages.is_empty() {
        Ok(Verdict::ok())
    } else {
        Ok(Verdict::ok_with(messages.join("\n")))
    }
}

async fn format_file(ctx: &HookContext, file: &str) -> String {
    let spec = ctx
        .package_manager()
        .exec("prettier", &ctx.project_root, ctx.config.prettier.timeout)
        .arg("--write")
        .arg(file);

    match ctx.runner.run(&spec).await {
        Ok(output) if output.success() => {
            info!(file = %file, "formatted");
            format!("✓ Formatted: {}", file)
        }
        Ok(output) => {
            let reason = output.combined().lines().next().unwrap_or("").to_string();
            warn!(file = %file, reason = %reason, "prettier failed");
            utils::log_hook_error(
                &ctx.state_dir,
                HookName::FormatOnEdit.as_str(),
                &format!("{}: {}", file, reason),
            );
            format!("⚠️ Failed to format {}: {}", file, reason)
        }
        Err(e) => {
            warn!(file = %file, error = %e, "prettier failed");
            utils::log_hook_error(&ctx.state_dir, HookName::FormatOnEdit.as_str(), &format!("{}: {}", file, e));
            format!("⚠️ Failed to format {}: {}", file, e)
        }
    }
}

/// `prettier` listed in `dependencies` or `devDependencies`.
pub fn has_prettier(project_root: &Path) -> bool {
    let Ok(content) = fs::read_to_string(project_root.join("package.json")) else {
        return false;
    };
    let Ok(pkg) = serde_json::from_str::<Value>(&content) else {
        return false;
    };
    ["dependencies", "devDependencies"]
        .iter()
        .any(|section| pkg.get(section).and_then(|deps| deps.get("prettier")).is_some())
}

/// Formattable extension and not under a build/vendor directory.
pub fn should_format(file: &str) -> bool {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !FORMATTABLE_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    let normalized = format!("/{}", utils::normalize_path(file));
    !SKIP_DIRS
        .iter()
        .any(|dir| normalized.contains(&format!("/{}/", dir)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;
    use crate::runner::testing::{Reply, ScriptedRunner};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(runner: ScriptedRunner, package_json: &str) -> (TempDir, HookContext, Arc<ScriptedRunner>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), package_json).unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "const a=1").unwrap();
        fs::write(dir.path().join("src/logo.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("dist/a.js"), "").unwrap();
        let runner = Arc::new(runner);
        let ctx = HookContext::new(dir.path(), HooksConfig::default(), runner.clone());
        (dir, ctx, runner)
    }

    const WITH_PRETTIER: &str = r#"{"devDependencies": {"prettier": "^3.0.0"}}"#;

    fn write(file: &str) -> HookInput {
        serde_json::from_value(json!({
            "event": "PostToolUse",
            "toolName": "Write",
            "toolInput": {"file_path": file, "content": "x"}
        }))
        .unwrap()
    }

    #[test]
    fn test_should_format() {
        assert!(should_format("src/a.ts"));
        assert!(should_format("/p/README.MD"));
        assert!(should_format("styles/main.scss"));
        assert!(!should_format("src/logo.svg"));
        assert!(!should_format("/p/node_modules/x/index.js"));
        assert!(!should_format("dist/a.js"));
        assert!(!should_format("C:\\p\\.next\\page.js"));
        assert!(!should_format("Makefile"));
    }

    #[test]
    fn test_has_prettier() {
        let dir = TempDir::new().unwrap();
        assert!(!has_prettier(dir.path()));
        fs::write(dir.path().join("package.json"), r#"{"dependencies": {"prettier": "3"}}"#).unwrap();
        assert!(has_prettier(dir.path()));
        fs::write(dir.path().join("package.json"), r#"{"dependencies": {"react": "18"}}"#).unwrap();
        assert!(!has_prettier(dir.path()));
        fs::write(dir.path().join("package.json"), "not json").unwrap();
        assert!(!has_prettier(dir.path()));
    }

    #[tokio::test]
    async fn test_formats_edited_file() {
        let (_dir, ctx, runner) = setup(ScriptedRunner::new(), WITH_PRETTIER);
        let verdict = handle(&ctx, &write("src/a.ts")).await.unwrap();
        assert!(verdict.message.unwrap().contains("Formatted: src/a.ts"));
        assert!(runner.was_called_with("yarn prettier --write src/a.ts"));
        assert_eq!(runner.calls()[0].timeout_ms, 10_000);
    }

    #[tokio::test]
    async fn test_failure_never_blocks() {
        let (_dir, ctx, _runner) = setup(
            ScriptedRunner::new().on("prettier", Reply::Exit(2, "SyntaxError: Unexpected token".to_string())),
            WITH_PRETTIER,
        );
        let verdict = handle(&ctx, &write("src/a.ts")).await.unwrap();
        assert!(!verdict.is_blocked());
        assert!(verdict.message.unwrap().contains("SyntaxError"));
        let log = fs::read_to_string(ctx.state_dir.join(utils::ERROR_LOG)).unwrap();
        assert!(log.contains("format-on-edit: src/a.ts: SyntaxError"));

        let (_dir, ctx, _runner) = setup(ScriptedRunner::new().on("prettier", Reply::Missing), WITH_PRETTIER);
        assert!(!handle(&ctx, &write("src/a.ts")).await.unwrap().is_blocked());
        assert!(ctx.state_dir.join(utils::ERROR_LOG).exists());
    }

    #[tokio::test]
    async fn test_skips() {
        let (_dir, ctx, runner) = setup(ScriptedRunner::new(), WITH_PRETTIER);
        handle(&ctx, &write("src/logo.svg")).await.unwrap();
        handle(&ctx, &write("dist/a.js")).await.unwrap();
        handle(&ctx, &write("src/missing.ts")).await.unwrap();
        let mut pre = write("src/a.ts");
        pre.event = None;
        handle(&ctx, &pre).await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_prettier_dependency() {
        let (_dir, ctx, runner) = setup(ScriptedRunner::new(), r#"{"name": "app"}"#);
        let verdict = handle(&ctx, &write("src/a.ts")).await.unwrap();
        assert!(verdict.message.unwrap().contains("skipping format"));
        assert!(runner.calls().is_empty());
    }
}

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::cache::{RESULTS_CACHE_FILE, ResultsCache};
use crate::config::{HooksConfig, default_config_path};
use crate::error::{GuardError, Result};
use crate::hooks::types::HookName;
use crate::hooks::{HookContext, dispatcher, orchestrator, utils};
use crate::runner::{CommandRunner, SystemRunner};

#[derive(Parser, Debug)]
#[command(name = "guard-hooks", version, about = "Guard hooks for agent tool calls")]
pub struct Cli {
    /// Project root (defaults to the nearest ancestor with a package.json).
    #[arg(long, global = true, env = "GUARD_HOOKS_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Hook config file (defaults to <root>/.claude/hooks/config.json).
    #[arg(long, global = true, env = "GUARD_HOOKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one hook over the JSON on stdin.
    Hook { name: String },
    /// Run the full hook pipeline over the JSON on stdin.
    Orchestrate,
    /// Manage the type-check results cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    Stats,
    Prune,
    Clear,
    Invalidate { file: PathBuf },
}

impl Cli {
    /// Only hook runs take their input from stdin.
    pub fn reads_stdin(&self) -> bool {
        matches!(self.command, Commands::Hook { .. } | Commands::Orchestrate)
    }

    pub fn resolve_project_root(&self) -> PathBuf {
        if let Some(root) = &self.project_root {
            return root.clone();
        }
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        utils::find_project_root(&cwd).unwrap_or(cwd)
    }

    pub fn load_config(&self, project_root: &Path) -> HooksConfig {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| default_config_path(project_root));
        HooksConfig::load_or_default(&path)
    }
}

/// Execute a parsed command with real child processes.
pub async fn run_cli(cli: Cli, stdin: &str) -> Result<(String, i32)> {
    run_cli_with(cli, stdin, Arc::new(SystemRunner)).await
}

/// Execute a parsed command. Returns the stdout text and the exit code.
pub async fn run_cli_with(
    cli: Cli,
    stdin: &str,
    runner: Arc<dyn CommandRunner>,
) -> Result<(String, i32)> {
    let root = cli.resolve_project_root();
    let config = cli.load_config(&root);
    let ctx = HookContext::new(&root, config, runner);

    match &cli.command {
        Commands::Hook { name } => {
            let hook = HookName::from_arg(name).ok_or_else(|| GuardError::UnknownHook(name.clone()))?;
            Ok(dispatcher::dispatch(hook, &ctx, stdin).await)
        }
        Commands::Orchestrate => Ok(orchestrator::orchestrate_stdin(&ctx, stdin).await),
        Commands::Cache { command } => {
            let mut cache = ResultsCache::load(ctx.state_dir.join(RESULTS_CACHE_FILE));
            let out = match command {
                CacheCommands::Stats => serde_json::to_value(cache.stats())?,
                CacheCommands::Prune => json!({ "removed": cache.prune()? }),
                CacheCommands::Clear => json!({ "removed": cache.clear()? }),
                CacheCommands::Invalidate { file } => {
                    let key = ctx.resolve_file(&file.to_string_lossy());
                    json!({ "removed": cache.invalidate(&key.to_string_lossy())? })
                }
            };
            Ok((serde_json::to_string_pretty(&out)?, 0))
        }
        Commands::Config => Ok((serde_json::to_string_pretty(&ctx.config)?, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedResult;
    use crate::runner::testing::ScriptedRunner;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn parse(dir: &TempDir, args: &[&str]) -> Cli {
        let root = dir.path().to_string_lossy().to_string();
        let mut argv = vec!["guard-hooks", "--project-root", root.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    async fn run(dir: &TempDir, args: &[&str], stdin: &str) -> Result<(String, i32)> {
        run_cli_with(parse(dir, args), stdin, Arc::new(ScriptedRunner::new())).await
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["guard-hooks", "hook", "lint"]).unwrap();
        assert!(matches!(cli.command, Commands::Hook { ref name } if name == "lint"));
        assert_eq!(cli.log_level, "warn");

        let cli = Cli::try_parse_from(["guard-hooks", "cache", "invalidate", "src/a.ts"]).unwrap();
        assert!(matches!(cli.command, Commands::Cache { command: CacheCommands::Invalidate { .. } }));

        assert!(Cli::try_parse_from(["guard-hooks", "cache", "explode"]).is_err());
    }

    #[tokio::test]
    async fn test_unknown_hook_is_error() {
        let dir = TempDir::new().unwrap();
        let err = run(&dir, &["hook", "nope"], "{}").await.unwrap_err();
        assert!(matches!(err, GuardError::UnknownHook(_)));
    }

    #[tokio::test]
    async fn test_hook_blocks_with_exit_1() {
        let dir = TempDir::new().unwrap();
        let stdin = r#"{"tool_name":"Bash","tool_input":{"command":"yarn add totally-unknown"}}"#;
        let (out, code) = run(&dir, &["hook", "check_dependencies"], stdin).await.unwrap();
        assert_eq!(code, 1);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "blocked");
    }

    #[tokio::test]
    async fn test_config_file_is_honoured() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("hooks.json");
        fs::write(&config_path, r#"{"dependencies": {"trustedPackages": ["totally-unknown"]}}"#).unwrap();
        let config_arg = config_path.to_string_lossy().to_string();

        let stdin = r#"{"tool_name":"Bash","tool_input":{"command":"yarn add totally-unknown"}}"#;
        let (_, code) = run(&dir, &["--config", config_arg.as_str(), "hook", "check-dependencies"], stdin)
            .await
            .unwrap();
        assert_eq!(code, 0);

        let (out, _) = run(&dir, &["--config", config_arg.as_str(), "config"], "").await.unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["dependencies"]["trustedPackages"][0], "totally-unknown");
        assert_eq!(v["typescript"]["timeout"], 15000);
    }

    #[tokio::test]
    async fn test_cache_commands() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "x").unwrap();
        let file = dir.path().join("a.ts").to_string_lossy().to_string();
        let mut cache = ResultsCache::load(dir.path().join(".claude/hooks").join(RESULTS_CACHE_FILE));
        cache
            .set(
                &file,
                CachedResult {
                    success: true,
                    message: "ok".to_string(),
                    details: None,
                },
            )
            .unwrap();

        let (out, code) = run(&dir, &["cache", "stats"], "").await.unwrap();
        assert_eq!(code, 0);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["total"], 1);
        assert_eq!(v["fresh"], 1);

        let (out, _) = run(&dir, &["cache", "invalidate", "a.ts"], "").await.unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["removed"], true);

        let (out, _) = run(&dir, &["cache", "clear"], "").await.unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["removed"], 0);
    }

    #[tokio::test]
    async fn test_orchestrate_empty_stdin() {
        let dir = TempDir::new().unwrap();
        let (out, code) = run(&dir, &["orchestrate"], "").await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(out, r#"{"status":"ok"}"#);
    }
}

//! Guard hooks run around agent tool calls.
//!
//! Hooks and the events they act on:
//!   - **check-dependencies**: Bash installs (Pre/PostToolUse), prompts (UserPromptSubmit)
//!   - **validate-imports**: Edit/Write on code files
//!   - **typecheck-after-edit**: Edit/Write on `.ts`/`.tsx` files
//!   - **lint-after-edit**: Edit/Write on code files, Bash file operations
//!   - **format-on-edit**: PostToolUse Edit/Write
//!
//! A single hook is run via `dispatcher::dispatch()`; the full pipeline via
//! `orchestrator::orchestrate()`.
//! Entry points: `guard-hooks hook <name>` and `guard-hooks orchestrate`
//! (both read JSON from stdin).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{HooksConfig, STATE_DIR};
use crate::error::Result;
use crate::runner::{CommandRunner, PackageManager};

pub mod dispatcher;
pub mod orchestrator;
pub mod types;
pub mod utils;

pub mod check_dependencies;
pub mod format_on_edit;
pub mod lint_after_edit;
pub mod typecheck_after_edit;
pub mod validate_imports;

use types::{HookInput, HookName, Verdict};

/// Everything a hook needs besides its input.
#[derive(Clone)]
pub struct HookContext {
    pub project_root: PathBuf,
    /// Caches and the error log live here.
    pub state_dir: PathBuf,
    pub config: HooksConfig,
    pub runner: Arc<dyn CommandRunner>,
}

impl HookContext {
    pub fn new(project_root: &Path, config: HooksConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            state_dir: project_root.join(STATE_DIR),
            config,
            runner,
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        PackageManager::detect(&self.project_root)
    }

    /// Absolute path for a tool-supplied file path; relative ones are taken
    /// from the project root.
    pub fn resolve_file(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Whether `name` is enabled in `config`.
pub fn is_enabled(name: HookName, config: &HooksConfig) -> bool {
    match name {
        HookName::CheckDependencies => config.dependencies.enabled,
        HookName::ValidateImports => config.imports.enabled,
        HookName::TypecheckAfterEdit => config.typescript.enabled,
        HookName::LintAfterEdit => config.eslint.enabled,
        HookName::FormatOnEdit => config.prettier.enabled,
    }
}

/// Run one hook. Errors are returned as-is; callers decide how to fail open.
pub async fn run_hook(name: HookName, ctx: &HookContext, input: &HookInput) -> Result<Verdict> {
    match name {
        HookName::CheckDependencies => Ok(check_dependencies::handle(input, &ctx.config.dependencies)),
        HookName::ValidateImports => validate_imports::handle(ctx, input),
        HookName::TypecheckAfterEdit => typecheck_after_edit::handle(ctx, input).await,
        HookName::LintAfterEdit => lint_after_edit::handle(ctx, input).await,
        HookName::FormatOnEdit => format_on_edit::handle(ctx, input).await,
    }
}

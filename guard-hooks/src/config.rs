use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GuardError, Result};

/// Directory (relative to the project root) holding config, caches and the error log.
pub const STATE_DIR: &str = ".claude/hooks";

/// Config file name inside [`STATE_DIR`].
pub const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_TRUSTED_PACKAGES: &[&str] = &[
    "react",
    "next",
    "typescript",
    "tailwindcss",
    "lodash",
    "axios",
    "express",
    "@radix-ui",
    "@tanstack",
    "lucide-react",
    "clsx",
    "zod",
    "recharts",
    "date-fns",
    "@supabase",
    "framer-motion",
    "react-hook-form",
    "jotai",
];

/// Effective hook configuration. Every field has a default so partial files work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HooksConfig {
    pub typescript: TypeScriptConfig,
    pub eslint: EslintConfig,
    pub prettier: PrettierConfig,
    pub imports: ImportsConfig,
    pub dependencies: DependenciesConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeScriptConfig {
    pub enabled: bool,
    /// Milliseconds.
    pub timeout: u64,
    pub show_dependency_errors: bool,
    pub skip_lib_check: bool,
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: 15_000,
            show_dependency_errors: false,
            skip_lib_check: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EslintConfig {
    pub enabled: bool,
    pub autofix: bool,
    pub timeout: u64,
}

impl Default for EslintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            autofix: true,
            timeout: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrettierConfig {
    pub enabled: bool,
    pub timeout: u64,
}

impl Default for PrettierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportsConfig {
    pub enabled: bool,
    /// Import prefix -> project-relative replacement, e.g. `"@/" -> "src/"`.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert("@/".to_string(), "src/".to_string());
        Self {
            enabled: true,
            aliases,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependenciesConfig {
    pub enabled: bool,
    pub trusted_packages: Vec<String>,
    pub allow_bypass: bool,
    pub typo_detection: bool,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trusted_packages: DEFAULT_TRUSTED_PACKAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allow_bypass: true,
            typo_detection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
    pub parallel: bool,
    pub stop_on_first_error: bool,
    pub verbose: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            stop_on_first_error: true,
            verbose: false,
        }
    }
}

impl HooksConfig {
    /// Strict load: errors on unreadable or malformed files.
    pub fn load(path: &Path) -> Result<HooksConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| GuardError::config(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| GuardError::config(path, e.to_string()))
    }

    /// Lenient load used by the hooks: missing file means defaults, a broken
    /// file means defaults plus a warning.
    pub fn load_or_default(path: &Path) -> HooksConfig {
        if !path.exists() {
            return HooksConfig::default();
        }
        match HooksConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; falling back to default config", e);
                HooksConfig::default()
            }
        }
    }
}

/// Default config location for a project root.
pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join(CONFIG_FILE)
}

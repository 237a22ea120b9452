use std::sync::OnceLock;

use regex::Regex;

use super::types::{HookEvent, HookInput, Verdict};
use super::utils;
use crate::config::DependenciesConfig;

/// Common typosquats of popular packages: typo -> intended package.
const TYPO_RISKS: &[(&str, &str)] = &[
    ("recat", "react"),
    ("expres", "express"),
    ("axois", "axios"),
    ("lodas", "lodash"),
    ("typescirpt", "typescript"),
    ("etherum", "ethereum"),
    ("nextjs", "next"),
];

const BLOCK_FOOTER_COMMAND: &str = "🔒 For security reasons, please review manually before installing.\nAdd --force to the command to bypass this check.";

const BLOCK_FOOTER_PROMPT: &str =
    "🔒 For security reasons, please review manually before installing.\nAdd \"force\" to your message to bypass this check.";

fn install_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(npm\s+(?:install|i|add)|pnpm\s+(?:add|install|i)|yarn\s+add)\s+(.+)")
            .expect("install pattern is valid")
    })
}

fn bypass_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--force|--yes|-y\b").expect("bypass pattern is valid"))
}

fn prompt_package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:install|add)\s+(@?[a-z0-9@\-/]+)").expect("prompt pattern is valid")
    })
}

fn dependency_mention_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)\bdependenc(y|ies)\b",
            r"(?i)package\.json",
            r"(?i)npm\s+(install|add|remove|uninstall)",
            r"(?i)pnpm\s+(add|remove|install)",
            r"(?i)yarn\s+(add|remove)",
            r"(?i)\b(add|remove|update)\s+package",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Dependency trust check.
///
/// Bash tool uses are checked for `npm|pnpm|yarn` installs of untrusted or
/// typosquatted packages. A prompt with no tool uses (or a `UserPromptSubmit`
/// event) is checked for dependency operations in plain language.
pub fn handle(input: &HookInput, config: &DependenciesConfig) -> Verdict {
    let uses = input.tool_uses();

    if input.event_kind() == Some(HookEvent::UserPromptSubmit)
        || (uses.is_empty() && !input.prompt().is_empty())
    {
        return check_prompt(input.prompt(), config);
    }

    for tool in uses.iter().filter(|t| t.is_bash()) {
        let verdict = check_command(tool.command(), config);
        if verdict.is_blocked() {
            return verdict;
        }
    }

    Verdict::ok()
}

/// Check one shell command.
pub fn check_command(command: &str, config: &DependenciesConfig) -> Verdict {
    if config.allow_bypass && bypass_re().is_match(command) {
        return Verdict::ok();
    }

    let Some(caps) = install_re().captures(command) else {
        return Verdict::ok();
    };

    let packages = extract_packages(&caps[2]);
    if packages.is_empty() {
        return Verdict::ok();
    }

    let warnings = package_warnings(&packages, config);
    if warnings.is_empty() {
        return Verdict::ok();
    }

    Verdict::blocked(format!(
        "❌ Package installation blocked:\n\n{}\n\n{}",
        warnings.join("\n"),
        BLOCK_FOOTER_COMMAND
    ))
}

/// Check a user prompt that talks about dependency operations.
pub fn check_prompt(prompt: &str, config: &DependenciesConfig) -> Verdict {
    if config.allow_bypass && utils::contains_word(prompt, "force") {
        return Verdict::ok();
    }

    if !dependency_mention_res().iter().any(|re| re.is_match(prompt)) {
        return Verdict::ok();
    }

    let packages: Vec<String> = prompt_package_re()
        .captures_iter(prompt)
        .map(|c| strip_version(&c[1]))
        .filter(|p| !p.is_empty())
        .collect();

    if packages.is_empty() {
        return Verdict::blocked(format!(
            "⚠️ Dependency operations should be reviewed manually.\n\n{}",
            BLOCK_FOOTER_PROMPT
        ));
    }

    let warnings = package_warnings(&packages, config);
    if warnings.is_empty() {
        return Verdict::ok();
    }

    Verdict::blocked(format!("{}\n\n{}", warnings.join("\n"), BLOCK_FOOTER_PROMPT))
}

/// Package names from the argument tail of an install command.
/// Stops at the first shell control operator; drops flags, quotes and versions.
fn extract_packages(tail: &str) -> Vec<String> {
    let args = tail.split(['&', '|', ';']).next().unwrap_or("");
    args.split_whitespace()
        .filter(|tok| !tok.starts_with('-'))
        .map(|tok| tok.trim_matches(|c| c == '\'' || c == '"'))
        .map(strip_version)
        .filter(|p| !p.is_empty())
        .collect()
}

/// `react@18.2.0` -> `react`, `@scope/pkg@^1` -> `@scope/pkg`.
fn strip_version(spec: &str) -> String {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(idx) => spec[..search_from + idx].to_string(),
        None => spec.to_string(),
    }
}

/// One warning line per typosquatted or untrusted package.
fn package_warnings(packages: &[String], config: &DependenciesConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    for pkg in packages {
        if config.typo_detection
            && let Some(intended) = typo_target(pkg)
        {
            warnings.push(format!(
                "🚨 TYPO DETECTED: \"{}\" → did you mean \"{}\"?",
                pkg, intended
            ));
            continue;
        }
        if !is_trusted(pkg, &config.trusted_packages) {
            warnings.push(format!(
                "⚠️  Package \"{}\" is not in the trusted packages list",
                pkg
            ));
        }
    }
    warnings
}

fn typo_target(pkg: &str) -> Option<&'static str> {
    let base = match pkg.strip_prefix('@') {
        Some(scoped) => scoped.split_once('/').map(|(_, name)| name).unwrap_or(scoped),
        None => pkg,
    };
    TYPO_RISKS
        .iter()
        .find(|(typo, _)| *typo == base)
        .map(|(_, intended)| *intended)
}

/// Scoped packages are trusted under a trusted `@scope`; unscoped ones when
/// equal to a trusted entry or below `entry/`.
pub fn is_trusted(pkg: &str, trusted: &[String]) -> bool {
    trusted.iter().any(|t| {
        if pkg.starts_with('@') {
            t.starts_with('@') && (pkg == t || pkg.starts_with(&format!("{}/", t)))
        } else {
            pkg == t || pkg.starts_with(&format!("{}/", t))
        }
    })
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::HookContext;
use super::types::{HookEvent, HookInput, Verdict};
use super::utils;

/// Suffixes tried when resolving an import, both directly and as `index{ext}`.
const CANDIDATE_EXTENSIONS: [&str; 6] = ["", ".ts", ".tsx", ".js", ".jsx", ".json"];

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s+(?:\{[^}]+\}|\w+)\s+from\s+['"]([^'"]+)['"]"#)
            .expect("import pattern is valid")
    })
}

/// An import that does not resolve to a file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidImport {
    pub file: String,
    pub import: String,
    pub resolved: PathBuf,
    pub suggestion: Option<String>,
}

/// Validate relative and aliased imports introduced by Edit/Write tool uses.
pub fn handle(ctx: &HookContext, input: &HookInput) -> crate::error::Result<Verdict> {
    if !input.event_is_or_absent(HookEvent::PostToolUse) {
        return Ok(Verdict::ok());
    }

    if utils::contains_word(input.prompt(), "skip-import-check") {
        return Ok(Verdict::ok_with("⏭️ Import validation skipped (skip-import-check)"));
    }

    let mut invalid = Vec::new();
    for tool in input.tool_uses().iter().filter(|t| t.is_edit_or_write()) {
        let file = tool.file_path();
        if !utils::is_code_file(file) {
            continue;
        }
        for import in extract_imports(tool.edited_content(), &ctx.config.imports.aliases) {
            let resolved = resolve_import(ctx, file, &import);
            if !import_exists(&resolved) {
                let suggestion = suggest(&import, &resolved);
                invalid.push(InvalidImport {
                    file: file.to_string(),
                    import,
                    resolved,
                    suggestion,
                });
            }
        }
    }

    if invalid.is_empty() {
        return Ok(Verdict::ok());
    }

    Ok(Verdict::blocked(render_message(&invalid)).with_details(json!({
        "errors": invalid.iter().map(|i| json!({
            "file": i.file,
            "import": i.import,
            "resolved": i.resolved.to_string_lossy(),
            "suggestion": i.suggestion,
        })).collect::<Vec<_>>(),
        "count": invalid.len(),
    })))
}

/// Import specifiers worth checking: relative ones and those under an alias.
/// Bare package specifiers (including `@scope/pkg`) are skipped.
pub fn extract_imports(
    content: &str,
    aliases: &std::collections::BTreeMap<String, String>,
) -> Vec<String> {
    import_re()
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .filter(|spec| spec.starts_with('.') || aliases.keys().any(|a| spec.starts_with(a.as_str())))
        .collect()
}

/// Absolute, lexically normalized path an import points at (before probing
/// extensions).
fn resolve_import(ctx: &HookContext, file: &str, import: &str) -> PathBuf {
    let joined = if import.starts_with('.') {
        let dir = ctx
            .resolve_file(file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.project_root.clone());
        dir.join(import)
    } else {
        let replaced = ctx
            .config
            .imports
            .aliases
            .iter()
            .filter(|(alias, _)| import.starts_with(alias.as_str()))
            .max_by_key(|(alias, _)| alias.len())
            .map(|(alias, target)| format!("{}{}", target, &import[alias.len()..]))
            .unwrap_or_else(|| import.to_string());
        ctx.resolve_file(&replaced)
    };
    utils::normalize_lexically(&joined)
}

/// `path`, `path{ext}` or `path/index{ext}` exists.
fn import_exists(resolved: &Path) -> bool {
    let base = resolved.to_string_lossy();
    CANDIDATE_EXTENSIONS.iter().any(|ext| {
        Path::new(&format!("{}{}", base, ext)).exists()
            || resolved.join(format!("index{}", ext)).exists()
    })
}

/// A sibling whose name equals (case-insensitively) or starts with the
/// missing base name.
fn suggest(import: &str, resolved: &Path) -> Option<String> {
    let dir = resolved.parent()?;
    let base = resolved.file_name()?.to_string_lossy().to_string();
    let wanted = base.to_lowercase();

    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    let similar = names.into_iter().find(|name| {
        let lower = name.to_lowercase();
        lower == wanted || lower.starts_with(&wanted)
    })?;

    // Keep the specifier extensionless, the way it was written.
    let stem = match Path::new(&similar).extension() {
        Some(_) if !base.contains('.') => Path::new(&similar)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(similar.clone()),
        _ => similar.clone(),
    };

    let prefix = import.strip_suffix(base.as_str()).unwrap_or(import);
    Some(format!("Did you mean: \"{}{}\"?", prefix, stem))
}

fn render_message(invalid: &[InvalidImport]) -> String {
    let mut message = String::from("❌ Invalid imports detected:\n");
    for item in invalid {
        message.push_str(&format!(
            "\n   {}\n   Import: \"{}\"\n   Path: {}\n",
            item.file,
            item.import,
            item.resolved.display()
        ));
        if let Some(suggestion) = &item.suggestion {
            message.push_str(&format!("   💡 {}\n", suggestion));
        }
    }
    message.push_str("\nAdd \"skip-import-check\" to your message to bypass this check.");
    message
}

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use regex::Regex;

/// Error log file inside the state directory.
pub const ERROR_LOG: &str = ".hook-errors.log";

/// Log a fail-open hook error to `<state_dir>/.hook-errors.log`.
/// Trims to 50 entries (keeps last 30) to prevent unbounded growth.
pub fn log_hook_error(state_dir: &Path, hook_name: &str, message: &str) {
    let log_path = state_dir.join(ERROR_LOG);
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let entry = format!("[{}] {}: {}\n", ts, hook_name, message.replace('\n', " "));

    if fs::create_dir_all(state_dir).is_err() {
        return;
    }
    if let Ok(mut f) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = f.write_all(entry.as_bytes());
    }

    trim_log_file(&log_path, 50, 30);
}

/// If the file exceeds `max_lines`, keep only the last `keep_lines`.
fn trim_log_file(path: &Path, max_lines: usize, keep_lines: usize) {
    if let Ok(content) = fs::read_to_string(path) {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() > max_lines {
            let mut output = lines[lines.len() - keep_lines..].join("\n");
            output.push('\n');
            let _ = fs::write(path, output);
        }
    }
}

/// Walk up from `start` to the nearest directory containing `package.json`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join("package.json").is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// `.ts` / `.tsx`
pub fn is_typescript_file(path: &str) -> bool {
    has_extension(path, &["ts", "tsx"])
}

/// `.ts` / `.tsx` / `.js` / `.jsx`
pub fn is_code_file(path: &str) -> bool {
    has_extension(path, &["ts", "tsx", "js", "jsx"])
}

fn has_extension(path: &str, exts: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.contains(&e))
}

/// Forward slashes only, so Windows-style paths compare against tool output.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut out = String::with_capacity(replaced.len());
    let mut prev_slash = false;
    for c in replaced.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when `text` contains `word` as a standalone word (case-insensitive).
pub fn contains_word(text: &str, word: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Base file name of a path-like string.
pub fn basename(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized
        .rsplit('/')
        .next()
        .unwrap_or(normalized.as_str())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_typescript_file() {
        assert!(is_typescript_file("file.ts"));
        assert!(is_typescript_file("/src/components/Button.tsx"));
        assert!(!is_typescript_file("file.js"));
        assert!(!is_typescript_file("file.jsx"));
        assert!(!is_typescript_file("file.json"));
        assert!(!is_typescript_file("types.d.ts.map"));
    }

    #[test]
    fn test_is_code_file() {
        assert!(is_code_file("a.ts"));
        assert!(is_code_file("a.tsx"));
        assert!(is_code_file("a.js"));
        assert!(is_code_file("a.jsx"));
        assert!(!is_code_file("a.css"));
        assert!(!is_code_file("a.md"));
        assert!(!is_code_file(""));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("C:\\project\\src\\file.ts"), "C:/project/src/file.ts");
        assert_eq!(normalize_path("/project/src/file.ts"), "/project/src/file.ts");
        assert_eq!(normalize_path("src\\\\nested//file.ts"), "src/nested/file.ts");
        assert_eq!(normalize_path("./src/file.ts"), "./src/file.ts");
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/p/src/components/../utils/./x")),
            PathBuf::from("/p/src/utils/x")
        );
        assert_eq!(normalize_lexically(Path::new("src/../../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("please force it", "force"));
        assert!(contains_word("FORCE", "force"));
        assert!(!contains_word("enforcement", "force"));
        assert!(contains_word("ok, skip-lint please", "skip-lint"));
        assert!(!contains_word("skip-lintx", "skip-lint"));
        assert!(contains_word("npm i x --force", "force"));
        assert!(!contains_word("", "force"));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/p/src/Button.tsx"), "Button.tsx");
        assert_eq!(basename("C:\\p\\a.ts"), "a.ts");
        assert_eq!(basename("a.ts"), "a.ts");
    }

    #[test]
    fn test_find_project_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_log_hook_error_trims() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join(".claude/hooks");
        for i in 0..55 {
            log_hook_error(&state_dir, "lint-after-edit", &format!("failure {}", i));
        }
        let content = fs::read_to_string(state_dir.join(ERROR_LOG)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines.len() <= 50);
        assert!(lines.last().unwrap().contains("failure 54"));
        assert!(lines.last().unwrap().contains("lint-after-edit"));
    }
}

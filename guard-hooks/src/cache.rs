//! On-disk caches used by the type-check hook.
//!
//! * [`ResultsCache`] remembers the last type-check verdict per file, keyed by
//!   the file's SHA-256 and valid for [`RESULTS_TTL_MS`].
//! * [`TsConfigCache`] remembers which tsconfig applies to a file, valid while
//!   every recorded tsconfig still hashes to the stored value.
//!
//! Both load as empty when the file is missing or corrupt, and persist with
//! [`atomic_write`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::atomic_io::{atomic_write, sha256_file};
use crate::error::Result;

pub const RESULTS_CACHE_FILE: &str = "typecheck-results-cache.json";
pub const TSCONFIG_CACHE_FILE: &str = "tsconfig-cache.json";

/// One hour.
pub const RESULTS_TTL_MS: i64 = 3_600_000;

/// tsconfig candidates, in lookup order.
pub const TSCONFIG_CANDIDATES: [&str; 3] = ["tsconfig.json", "tsconfig.app.json", "tsconfig.node.json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub result: CachedResult,
}

impl CacheEntry {
    /// Entries stamped in the future or beyond `i64` range count as expired.
    fn is_fresh(&self, now: i64) -> bool {
        let age = now.saturating_sub(self.timestamp);
        (0..RESULTS_TTL_MS).contains(&age)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub expired: usize,
}

pub struct ResultsCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    let Ok(content) = fs::read_to_string(path) else {
        return T::default();
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("ignoring corrupt cache {}: {}", path.display(), e);
            T::default()
        }
    }
}

impl ResultsCache {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_json(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }

    /// Cached result for `file`, if its content is unchanged and the entry is
    /// younger than the TTL.
    pub fn get(&self, file: &str) -> Option<&CachedResult> {
        self.get_at(file, now_ms())
    }

    pub fn get_at(&self, file: &str, now: i64) -> Option<&CachedResult> {
        let hash = sha256_file(Path::new(file))?;
        let entry = self.entries.get(file)?;
        if entry.hash == hash && entry.is_fresh(now) {
            Some(&entry.result)
        } else {
            None
        }
    }

    /// Store `result` for `file` and persist. Unreadable files are not cached.
    pub fn set(&mut self, file: &str, result: CachedResult) -> Result<()> {
        self.set_at(file, result, now_ms())
    }

    pub fn set_at(&mut self, file: &str, result: CachedResult, now: i64) -> Result<()> {
        let Some(hash) = sha256_file(Path::new(file)) else {
            return Ok(());
        };
        self.entries.insert(
            file.to_string(),
            CacheEntry {
                hash,
                timestamp: now,
                result,
            },
        );
        self.save()
    }

    pub fn invalidate(&mut self, file: &str) -> Result<bool> {
        let removed = self.entries.remove(file).is_some();
        self.save()?;
        Ok(removed)
    }

    /// Drop expired entries; returns how many were removed.
    pub fn prune(&mut self) -> Result<usize> {
        self.prune_at(now_ms())
    }

    pub fn prune_at(&mut self, now: i64) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        self.save()?;
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats_at(now_ms())
    }

    pub fn stats_at(&self, now: i64) -> CacheStats {
        let fresh = self
            .entries
            .values()
            .filter(|e| e.is_fresh(now))
            .count();
        CacheStats {
            total: self.entries.len(),
            fresh,
            expired: self.entries.len() - fresh,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TsConfigState {
    hashes: BTreeMap<String, String>,
    file_to_config: BTreeMap<String, String>,
}

pub struct TsConfigCache {
    path: PathBuf,
    project_root: PathBuf,
    state: TsConfigState,
}

impl TsConfigCache {
    pub fn load(path: impl Into<PathBuf>, project_root: &Path) -> Self {
        let path = path.into();
        let state = load_json(&path);
        Self {
            path,
            project_root: project_root.to_path_buf(),
            state,
        }
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }

    fn candidates(&self) -> Vec<PathBuf> {
        TSCONFIG_CANDIDATES
            .iter()
            .map(|name| self.project_root.join(name))
            .collect()
    }

    /// Every recorded tsconfig still has the hash it had when recorded.
    pub fn is_valid(&self) -> bool {
        self.state
            .hashes
            .iter()
            .all(|(config, stored)| sha256_file(Path::new(config)).as_deref() == Some(stored))
    }

    pub fn rebuild(&mut self) -> Result<()> {
        let mut state = TsConfigState::default();
        for config in self.candidates() {
            if let Some(hash) = sha256_file(&config) {
                state
                    .hashes
                    .insert(config.to_string_lossy().to_string(), hash);
            }
        }
        self.state = state;
        self.save()
    }

    /// The tsconfig governing `file`, or `None` when the project has none.
    pub fn find_for_file(&mut self, file: &str) -> Result<Option<PathBuf>> {
        if self.is_valid()
            && let Some(config) = self.state.file_to_config.get(file)
            && Path::new(config).exists()
        {
            return Ok(Some(PathBuf::from(config)));
        }

        self.rebuild()?;

        let Some(config) = self.candidates().into_iter().find(|c| c.exists()) else {
            return Ok(None);
        };
        self.state
            .file_to_config
            .insert(file.to_string(), config.to_string_lossy().to_string());
        self.save()?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ok_result(msg: &str) -> CachedResult {
        CachedResult {
            success: true,
            message: msg.to_string(),
            details: None,
        }
    }

    fn setup() -> (TempDir, String, PathBuf) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "const a: number = 1;").unwrap();
        let cache_path = dir.path().join(".claude/hooks").join(RESULTS_CACHE_FILE);
        (dir, file.to_string_lossy().to_string(), cache_path)
    }

    #[test]
    fn test_set_then_get_unchanged_file() {
        let (_dir, file, cache_path) = setup();
        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&file, ok_result("✅ a.ts"), 1_000).unwrap();

        assert_eq!(cache.get_at(&file, 2_000).unwrap().message, "✅ a.ts");
        assert!(cache_path.exists());
    }

    #[test]
    fn test_entry_persists_across_loads() {
        let (_dir, file, cache_path) = setup();
        let mut cache = ResultsCache::load(&cache_path);
        let failing = CachedResult {
            success: false,
            message: "❌ errors".to_string(),
            details: Some(json!({"dependencyErrors": 2})),
        };
        cache.set_at(&file, failing.clone(), 1_000).unwrap();

        let reloaded = ResultsCache::load(&cache_path);
        assert_eq!(reloaded.get_at(&file, 1_500), Some(&failing));
    }

    #[test]
    fn test_expires_after_one_hour() {
        let (_dir, file, cache_path) = setup();
        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&file, ok_result("ok"), 0).unwrap();

        assert!(cache.get_at(&file, RESULTS_TTL_MS - 1).is_some());
        assert!(cache.get_at(&file, RESULTS_TTL_MS).is_none());
    }

    #[test]
    fn test_content_change_invalidates() {
        let (_dir, file, cache_path) = setup();
        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&file, ok_result("ok"), 0).unwrap();

        fs::write(&file, "const a: string = 1;").unwrap();
        assert!(cache.get_at(&file, 10).is_none());
    }

    #[test]
    fn test_unreadable_file_not_cached() {
        let (dir, _file, cache_path) = setup();
        let missing = dir.path().join("missing.ts").to_string_lossy().to_string();
        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&missing, ok_result("ok"), 0).unwrap();
        assert!(cache.is_empty());
        assert!(cache.get_at(&missing, 0).is_none());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let (_dir, file, cache_path) = setup();
        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&file, ok_result("ok"), 0).unwrap();

        assert!(cache.invalidate(&file).unwrap());
        assert!(!cache.invalidate(&file).unwrap());
        assert!(cache.get_at(&file, 1).is_none());

        cache.set_at(&file, ok_result("ok"), 0).unwrap();
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(ResultsCache::load(&cache_path).is_empty());
    }

    #[test]
    fn test_prune_and_stats() {
        let (dir, file, cache_path) = setup();
        let other = dir.path().join("b.ts");
        fs::write(&other, "x").unwrap();
        let other = other.to_string_lossy().to_string();

        let mut cache = ResultsCache::load(&cache_path);
        cache.set_at(&file, ok_result("old"), 0).unwrap();
        cache.set_at(&other, ok_result("new"), RESULTS_TTL_MS).unwrap();

        let now = RESULTS_TTL_MS + 10;
        assert_eq!(
            cache.stats_at(now),
            CacheStats {
                total: 2,
                fresh: 1,
                expired: 1
            }
        );
        assert_eq!(cache.prune_at(now).unwrap(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at(&other, now).is_some());
    }

    #[test]
    fn test_out_of_range_timestamps_expire() {
        let (_dir, file, cache_path) = setup();
        let hash = sha256_file(Path::new(&file)).unwrap();
        let entries = json!({
            file.clone(): {"hash": hash, "timestamp": i64::MIN, "result": {"success": true, "message": "ok"}},
            "/elsewhere/b.ts": {"hash": "x", "timestamp": i64::MAX, "result": {"success": true, "message": "ok"}}
        });
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, entries.to_string()).unwrap();

        let mut cache = ResultsCache::load(&cache_path);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&file, 1_000).is_none());
        assert!(cache.get(&file).is_none());
        assert_eq!(
            cache.stats_at(0),
            CacheStats {
                total: 2,
                fresh: 0,
                expired: 2
            }
        );
        assert_eq!(cache.stats().fresh, 0);
        assert_eq!(cache.prune_at(1_000).unwrap(), 2);
        assert!(ResultsCache::load(&cache_path).is_empty());
    }

    #[test]
    fn test_corrupt_cache_loads_empty() {
        let (_dir, _file, cache_path) = setup();
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, "{not json").unwrap();
        assert!(ResultsCache::load(&cache_path).is_empty());
    }

    #[test]
    fn test_tsconfig_lookup_and_invalidation() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let cache_path = root.join(".claude/hooks").join(TSCONFIG_CACHE_FILE);
        let mut cache = TsConfigCache::load(&cache_path, root);

        assert_eq!(cache.find_for_file("src/a.ts").unwrap(), None);

        fs::write(root.join("tsconfig.app.json"), "{}").unwrap();
        assert_eq!(
            cache.find_for_file("src/a.ts").unwrap(),
            Some(root.join("tsconfig.app.json"))
        );
        assert!(cache.is_valid());

        // A root tsconfig appearing changes the answer after the rebuild.
        fs::write(root.join("tsconfig.json"), "{}").unwrap();
        fs::write(root.join("tsconfig.app.json"), "{\"compilerOptions\":{}}").unwrap();
        assert!(!cache.is_valid());
        assert_eq!(
            cache.find_for_file("src/a.ts").unwrap(),
            Some(root.join("tsconfig.json"))
        );

        let reloaded = TsConfigCache::load(&cache_path, root);
        assert!(reloaded.is_valid());
    }
}

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// `cache.json` + `tmp.42` => `cache.json.tmp.42`
fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

/// Write content atomically: `{path}.tmp.{pid}`, fsync, rename over `path`.
/// The temp file is removed if the rename fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let tmp_path = append_suffix(path, &format!("tmp.{}", std::process::id()));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    fs::write(&tmp_path, content)?;
    fs::File::open(&tmp_path)?.sync_all()?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    Ok(())
}

/// SHA-256 hex digest of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a file's content, `None` when the file can't be read.
pub fn sha256_file(path: &Path) -> Option<String> {
    fs::read(path).ok().map(|bytes| sha256_hex(&bytes))
}

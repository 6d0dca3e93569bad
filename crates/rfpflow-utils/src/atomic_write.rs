//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Used for the persisted state file so a crash mid-write never leaves a
//! truncated snapshot behind.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`.
///
/// The parent directory is created if needed. Readers either see the old
/// file or the new one, never a partial write.
pub fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {}", parent.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {}", parent.display()))?;

    temp_file
        .write_all(content)
        .context("Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    temp_file
        .persist(path)
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("state.json");

        write_file_atomic(&target, b"{\"v\":1}").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"v\":1}");

        write_file_atomic(&target, b"{\"v\":2}").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"v\":2}");

        // No stray temp files left behind
        let entries: Vec<_> = fs::read_dir(target.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}

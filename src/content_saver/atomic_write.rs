//! Atomic file writes: write to a temp file in the target directory, then
//! rename. The rename is atomic on the same filesystem, so a reader never
//! observes a partially-written file.
//!
//! Grounded on the teacher's `compression::save_compressed_file`, stripped of
//! the gzip-compression path (not needed once front-matter handling moved
//! the writer's job to plain-text Markdown) but keeping the identical
//! `NamedTempFile::new_in` + `.persist` mechanism, reused verbatim by the
//! catalogue commit protocol.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;

/// Write `content` to `path` atomically, creating the parent directory if needed.
///
/// Runs on a blocking thread since file I/O for large pages can stall the
/// async runtime otherwise.
pub async fn write_atomic(content: Vec<u8>, path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomic_sync(&content, &path))
        .await
        .map_err(|e| anyhow!("atomic write task panicked: {e}"))?
}

fn write_atomic_sync(content: &[u8], path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    std::fs::create_dir_all(parent)
        .map_err(|e| anyhow!("creating {}: {e}", parent.display()))?;

    use std::io::Write as _;
    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| anyhow!("creating temp file in {}: {e}", parent.display()))?;
    tmp.write_all(content)
        .map_err(|e| anyhow!("writing temp file: {e}"))?;
    tmp.flush().map_err(|e| anyhow!("flushing temp file: {e}"))?;
    tmp.persist(path)
        .map_err(|e| anyhow!("persisting {}: {e}", path.display()))?;
    Ok(())
}

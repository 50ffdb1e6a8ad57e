// =============================================================================
// Atomic file writes
// =============================================================================
//
// Write to a sibling `.tmp` file, then rename over the target.  Some
// platforms refuse the rename while another handle holds the target open; in
// that case we fall back to overwriting the target in place.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Sibling temp path used for the atomic write of `path`.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist `content` to `path` atomically (tmp + rename), falling back to an
/// in-place overwrite when the rename is blocked.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    write_atomic_with(path, content, |from, to| std::fs::rename(from, to))
}

/// `write_atomic` with the rename step supplied by the caller.
fn write_atomic_with<R>(path: &Path, content: &str, rename: R) -> Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write tmp file {}", tmp_path.display()))?;

    match rename(&tmp_path, path) {
        Ok(()) => {
            debug!(path = %path.display(), "atomic write complete");
            Ok(())
        }
        Err(rename_err) => {
            warn!(
                path = %path.display(),
                error = %rename_err,
                "rename blocked, overwriting in place"
            );
            std::fs::write(path, content)
                .with_context(|| format!("failed to overwrite {}", path.display()))?;
            let _ = std::fs::remove_file(&tmp_path);
            Ok(())
        }
    }
}

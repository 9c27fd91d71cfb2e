//! Staging of upstream Java interface and source files.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::assembly::{merge_tree, reset_dir};
use crate::types::{PackError, Result};

/// Upstream subtrees merged into the source assembly by default.
pub const DEFAULT_SUBTREES: [&str; 3] = [
    "sdk/android/api",
    "sdk/android/src/java",
    "rtc_base/java/src",
];

/// Outcome of [`sync_sources`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of files copied across all subtrees.
    pub files: usize,
    /// Entries that could not be removed while resetting the destination.
    pub cleanup_failures: usize,
}

/// Merges `source_root/<subtree>` for each subtree into `destination`.
///
/// Every subtree is checked before anything is touched, so a missing one
/// leaves `destination` as it was. The destination is then reset and the
/// subtrees are merged in order; later subtrees overwrite files from earlier
/// ones.
///
/// # Example
///
/// ```no_run
/// use jnipack_sdk::sync::{sync_sources, DEFAULT_SUBTREES};
/// use std::path::Path;
///
/// let report = sync_sources(Path::new("/src/webrtc/src"), &DEFAULT_SUBTREES, Path::new("java"))?;
/// println!("staged {} files", report.files);
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
pub fn sync_sources<S: AsRef<str>>(
    source_root: &Path,
    subtrees: &[S],
    destination: &Path,
) -> Result<SyncReport> {
    if !source_root.is_dir() {
        error!(path = %source_root.display(), "source root not found");
        return Err(PackError::MissingSourceDirectory(source_root.to_path_buf()));
    }

    let sources: Vec<PathBuf> = subtrees
        .iter()
        .map(|subtree| source_root.join(subtree.as_ref()))
        .collect();
    if let Some(missing) = sources.iter().find(|path| !path.is_dir()) {
        error!(path = %missing.display(), "source subtree not found");
        return Err(PackError::MissingSourceDirectory(missing.clone()));
    }

    let reset = reset_dir(destination)?;
    let mut report = SyncReport {
        files: 0,
        cleanup_failures: reset.failures.len(),
    };

    for src in &sources {
        let copied = merge_tree(src, destination)?;
        info!(from = %src.display(), files = copied, "merged source subtree");
        report.files += copied;
    }

    Ok(report)
}

//! Assembly tree helpers: destructive reset and recursive merge copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::types::{PackError, Result};

/// Finder metadata files that never belong in a package.
pub const IGNORED_NAMES: [&str; 1] = [".DS_Store"];

/// An entry that could not be removed during [`reset_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a destructive reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub removed: usize,
    pub failures: Vec<CleanupFailure>,
}

/// Empties `dir`, creating it if it does not exist.
///
/// Entries that cannot be removed are logged and returned in the report;
/// the reset carries on with the remaining entries. Only failing to list or
/// create `dir` itself is an error.
pub fn reset_dir(dir: &Path) -> Result<ResetReport> {
    fs::create_dir_all(dir).map_err(|e| PackError::io(dir, e))?;

    let mut report = ResetReport::default();
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PackError::io(dir, e))? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                report.failures.push(CleanupFailure {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
    entries.sort();

    for path in entries {
        match remove_entry(&path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove stale entry");
                report.failures.push(CleanupFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(dir = %dir.display(), removed = report.removed, "reset assembly directory");
    Ok(report)
}

fn remove_entry(path: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Copies a single file, creating the destination's parent directory.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
    }
    fs::copy(src, dest).map_err(|e| PackError::io(src, e))?;
    Ok(())
}

/// Merges the contents of `src` into `dest`.
///
/// Directories are merged and files overwrite existing ones. Symbolic links
/// are followed, so a linked directory is copied as a directory. Entries
/// named in [`IGNORED_NAMES`] are skipped at every level. Returns the number
/// of files copied.
pub fn merge_tree(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| PackError::io(dest, e))?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map(|name| !IGNORED_NAMES.contains(&name))
                .unwrap_or(true)
        });

    let mut copied = 0;
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PackError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| PackError::io(entry.path(), e))?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_creates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fresh");
        let report = reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(report, ResetReport::default());
    }

    #[test]
    fn test_reset_removes_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("java");
        fs::create_dir_all(dir.join("org/webrtc")).unwrap();
        fs::write(dir.join("org/webrtc/A.java"), "a").unwrap();
        fs::write(dir.join("stale.txt"), "x").unwrap();

        let report = reset_dir(&dir).unwrap();
        assert_eq!(report.removed, 2);
        assert!(report.failures.is_empty());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_reset_keeps_going_past_unremovable_entry() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("jniLibs");
        let locked = dir.join("locked");
        fs::create_dir_all(locked.join("x86")).unwrap();
        fs::write(locked.join("x86/lib.so"), "so").unwrap();
        fs::write(dir.join("other.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not stop root; nothing to check then.
        let write_check = locked.join("writable");
        if fs::write(&write_check, "").is_ok() {
            fs::remove_file(&write_check).unwrap();
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = reset_dir(&dir).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, locked);
        assert!(!report.failures[0].reason.is_empty());
        assert_eq!(report.removed, 1);
        assert!(!dir.join("other.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_tree_follows_directory_symlinks() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared/org/webrtc");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("Linked.java"), "linked").unwrap();

        let src = temp.path().join("api");
        fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink(temp.path().join("shared/org"), src.join("org")).unwrap();
        let dest = temp.path().join("java");

        assert_eq!(merge_tree(&src, &dest).unwrap(), 1);
        let copied = dest.join("org/webrtc/Linked.java");
        assert!(copied.is_file());
        assert!(!fs::symlink_metadata(dest.join("org")).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(copied).unwrap(), "linked");
    }

    #[test]
    fn test_merge_tree_merges_and_skips_ds_store() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let dest = temp.path().join("dest");
        fs::create_dir_all(a.join("org/webrtc")).unwrap();
        fs::create_dir_all(b.join("org/webrtc")).unwrap();
        fs::write(a.join("org/webrtc/Api.java"), "api").unwrap();
        fs::write(a.join(".DS_Store"), "junk").unwrap();
        fs::write(b.join("org/webrtc/Impl.java"), "impl").unwrap();
        fs::write(b.join("org/webrtc/.DS_Store"), "junk").unwrap();

        assert_eq!(merge_tree(&a, &dest).unwrap(), 1);
        assert_eq!(merge_tree(&b, &dest).unwrap(), 1);

        assert!(dest.join("org/webrtc/Api.java").is_file());
        assert!(dest.join("org/webrtc/Impl.java").is_file());
        assert!(!dest.join(".DS_Store").exists());
        assert!(!dest.join("org/webrtc/.DS_Store").exists());
    }

    #[test]
    fn test_merge_tree_overwrites_existing_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(src.join("Same.java"), "new").unwrap();
        fs::write(dest.join("Same.java"), "old").unwrap();

        merge_tree(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("Same.java")).unwrap(), "new");
    }

    #[test]
    fn test_copy_file_creates_parent() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("lib.so");
        fs::write(&src, b"\x7fELF").unwrap();
        let dest = temp.path().join("jniLibs/x86/lib.so");
        copy_file(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"\x7fELF");
    }
}

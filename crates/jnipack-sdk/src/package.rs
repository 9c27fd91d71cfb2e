//! Deterministic zip packaging of the assembly trees.
//!
//! Entries are written in lexicographic walk order with fixed metadata, so
//! packaging the same trees twice produces byte-identical archives.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::types::{PackError, Result};

/// Result of [`pack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackReport {
    pub archive: PathBuf,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Removes a previous archive; a missing one is not an error.
fn remove_stale_archive(archive_path: &Path) -> Result<()> {
    match fs::remove_file(archive_path) {
        Ok(()) => {
            debug!(path = %archive_path.display(), "removed previous archive");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PackError::io(archive_path, e)),
    }
}

/// Archive entry name for `path` under `root`: `<root name>/<relative path>`
/// with `/` separators.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let base = root
        .file_name()
        .ok_or_else(|| PackError::Config(format!("assembly root has no name: {}", root.display())))?;
    let rel = path.strip_prefix(root).map_err(|_| {
        PackError::Config(format!(
            "{} is not inside {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut name = base.to_string_lossy().into_owned();
    for component in rel.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    Ok(name)
}

/// Writes `source_dir` and `library_dir` into a fresh archive at
/// `archive_path`.
///
/// Each regular file becomes an entry prefixed by its assembly root's base
/// name, e.g. `java/org/webrtc/PeerConnection.java` and
/// `jniLibs/x86/libjingle_peerconnection_so.so`.
///
/// # Example
///
/// ```no_run
/// use jnipack_sdk::package::pack;
/// use std::path::Path;
///
/// let report = pack(Path::new("java"), Path::new("jniLibs"), Path::new("libwebrtc.zip"))?;
/// println!("{} entries", report.entries.len());
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
pub fn pack(source_dir: &Path, library_dir: &Path, archive_path: &Path) -> Result<PackReport> {
    remove_stale_archive(archive_path)?;
    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
    }

    let file = File::create(archive_path).map_err(|e| PackError::io(archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = entry_options();
    let mut entries = Vec::new();

    for root in [source_dir, library_dir] {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry_name(root, entry.path())?;
            zip.start_file(name.as_str(), options)?;
            let mut reader =
                BufReader::new(File::open(entry.path()).map_err(|e| PackError::io(entry.path(), e))?);
            io::copy(&mut reader, &mut zip).map_err(|e| PackError::io(entry.path(), e))?;
            debug!(entry = %name, "added to archive");
            entries.push(name);
        }
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer).map_err(|e| PackError::io(archive_path, e))?;

    info!(path = %archive_path.display(), entries = entries.len(), "wrote archive");
    Ok(PackReport {
        archive: archive_path.to_path_buf(),
        entries,
    })
}

//! Collection of built native libraries into the jniLibs tree.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::assembly::{copy_file, reset_dir};
use crate::types::{Architecture, PackError, Result};

/// Libraries that must exist in every built architecture's output directory.
pub const DEFAULT_ARTIFACTS: [&str; 1] = ["libjingle_peerconnection_so.so"];

/// Which architectures ended up in the library assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// Architectures whose artifacts were copied, in listed order.
    pub collected: Vec<Architecture>,
    /// Architectures with no build output directory, in listed order.
    pub skipped: Vec<Architecture>,
    /// Entries that could not be removed while resetting the destination.
    pub cleanup_failures: usize,
}

/// Copies each architecture's required artifacts into
/// `destination_root/<abi>/`.
///
/// `destination_root` is reset first. An architecture without a
/// `build_root/<abi>` directory was not built in this run and is skipped. A
/// built architecture missing any required file fails the whole collection
/// with [`PackError::MissingArtifact`]; copies already made for earlier
/// architectures are left in place.
pub fn collect<S: AsRef<str>>(
    build_root: &Path,
    architectures: &[Architecture],
    required_artifacts: &[S],
    destination_root: &Path,
) -> Result<CollectionReport> {
    let reset = reset_dir(destination_root)?;
    let mut report = CollectionReport {
        cleanup_failures: reset.failures.len(),
        ..CollectionReport::default()
    };

    for &arch in architectures {
        let output_dir = build_root.join(arch.as_str());
        if !output_dir.is_dir() {
            info!(arch = %arch, path = %output_dir.display(), "no build output, skipping");
            report.skipped.push(arch);
            continue;
        }

        let dest_dir = destination_root.join(arch.as_str());
        fs::create_dir_all(&dest_dir).map_err(|e| PackError::io(&dest_dir, e))?;

        for artifact in required_artifacts {
            let name = artifact.as_ref();
            let src = output_dir.join(name);
            if !src.is_file() {
                return Err(PackError::MissingArtifact {
                    architecture: arch,
                    file: name.to_string(),
                });
            }
            copy_file(&src, &dest_dir.join(name))?;
            debug!(arch = %arch, file = name, "copied artifact");
        }

        report.collected.push(arch);
    }

    info!(
        collected = ?report.collected.iter().map(Architecture::as_str).collect::<Vec<_>>(),
        skipped = ?report.skipped.iter().map(Architecture::as_str).collect::<Vec<_>>(),
        "collected native libraries"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIB: &str = "libjingle_peerconnection_so.so";

    fn built(root: &Path, arch: &str, files: &[&str]) {
        let dir = root.join(arch);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), arch.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_missing_output_dir_is_skipped() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let libs = temp.path().join("jniLibs");
        built(&out, "x86", &[LIB]);

        let report = collect(
            &out,
            &[Architecture::Arm64V8a, Architecture::X86],
            &DEFAULT_ARTIFACTS,
            &libs,
        )
        .unwrap();

        assert_eq!(report.collected, vec![Architecture::X86]);
        assert_eq!(report.skipped, vec![Architecture::Arm64V8a]);
        assert!(!libs.join("arm64-v8a").exists());
        assert_eq!(fs::read(libs.join("x86").join(LIB)).unwrap(), b"x86");
    }

    #[test]
    fn test_missing_artifact_names_arch_and_file() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let libs = temp.path().join("jniLibs");
        built(&out, "x86", &[LIB]);
        built(&out, "x86_64", &["libother.so"]);

        let err = collect(
            &out,
            &[Architecture::X86, Architecture::X86_64],
            &DEFAULT_ARTIFACTS,
            &libs,
        )
        .unwrap_err();

        match err {
            PackError::MissingArtifact { architecture, file } => {
                assert_eq!(architecture, Architecture::X86_64);
                assert_eq!(file, LIB);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // No rollback of architectures collected before the failure.
        assert!(libs.join("x86").join(LIB).is_file());
    }

    #[test]
    fn test_copies_required_files_in_order_only() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let libs = temp.path().join("jniLibs");
        built(&out, "arm64-v8a", &["liba.so", "libb.so", "unrelated.ninja"]);

        collect(&out, &[Architecture::Arm64V8a], &["liba.so", "libb.so"], &libs).unwrap();

        let mut names: Vec<String> = fs::read_dir(libs.join("arm64-v8a"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["liba.so", "libb.so"]);
    }

    #[test]
    fn test_destination_is_reset() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let libs = temp.path().join("jniLibs");
        fs::create_dir_all(libs.join("armeabi")).unwrap();
        fs::write(libs.join("armeabi").join(LIB), "stale").unwrap();
        fs::create_dir_all(&out).unwrap();

        let report = collect(&out, &[Architecture::Armeabi], &DEFAULT_ARTIFACTS, &libs).unwrap();
        assert!(report.collected.is_empty());
        assert!(!libs.join("armeabi").exists());
    }
}

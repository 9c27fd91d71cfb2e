//! Core types for jnipack-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`PackError`] - Error types for build, collection and packaging
//! - [`Architecture`] - Supported Android ABIs
//! - [`FlagValue`] / [`BuildFlags`] - Ordered GN build arguments
//! - [`BuildConfiguration`] - Per-architecture build description
//! - [`BuildOptions`] - Run-level inputs for deriving configurations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error types for jnipack-sdk operations.
///
/// Every variant is fatal to the pipeline stage that raised it. Cleanup
/// failures during a destructive reset are not errors; see
/// [`crate::assembly::CleanupFailure`].
///
/// # Example
///
/// ```
/// use jnipack_sdk::{Architecture, PackError};
///
/// match "mips".parse::<Architecture>() {
///     Err(PackError::UnknownArchitecture(name)) => assert_eq!(name, "mips"),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// The architecture identifier is not in the supported set.
    #[error(
        "configuration error: unknown architecture '{0}'. Supported: armeabi, armeabi-v7a, arm64-v8a, x86, x86_64"
    )]
    UnknownArchitecture(String),

    /// Invalid or inconsistent run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The generator or the build executor exited unsuccessfully.
    #[error("{tool} failed for {architecture} ({status})\n\nStdout:\n{stdout}\n\nStderr:\n{stderr}")]
    ExternalTool {
        architecture: Architecture,
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// An external tool could not be started at all.
    #[error("failed to start {tool}: {source}. Ensure the tool is installed and available on PATH")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// A required upstream source directory does not exist.
    #[error("source directory not found: {}", .0.display())]
    MissingSourceDirectory(PathBuf),

    /// A built architecture is missing one of its required artifacts.
    #[error("missing artifact '{file}' for {architecture}")]
    MissingArtifact {
        architecture: Architecture,
        file: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Writing the zip archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The build worker pool could not be created.
    #[error("failed to create build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// JSON serialization of the run summary failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PackError {
    /// Wraps an [`std::io::Error`] with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the architecture this error is attributed to, if any.
    pub fn architecture(&self) -> Option<Architecture> {
        match self {
            PackError::ExternalTool { architecture, .. }
            | PackError::MissingArtifact { architecture, .. } => Some(*architecture),
            _ => None,
        }
    }
}

pub type Result<T, E = PackError> = std::result::Result<T, E>;

/// Android ABI a native library is built for.
///
/// # Example
///
/// ```
/// use jnipack_sdk::Architecture;
///
/// let arch: Architecture = "arm64-v8a".parse()?;
/// assert_eq!(arch, Architecture::Arm64V8a);
/// assert_eq!(arch.as_str(), "arm64-v8a");
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Architecture {
    /// 32-bit ARMv6.
    Armeabi,
    /// 32-bit ARMv7.
    ArmeabiV7a,
    /// 64-bit ARM.
    Arm64V8a,
    /// 32-bit x86.
    X86,
    /// 64-bit x86.
    X86_64,
}

impl Architecture {
    /// Every supported architecture.
    pub const ALL: [Architecture; 5] = [
        Architecture::Armeabi,
        Architecture::ArmeabiV7a,
        Architecture::Arm64V8a,
        Architecture::X86,
        Architecture::X86_64,
    ];

    /// Architectures built when none are configured.
    pub const DEFAULT: [Architecture; 4] = [
        Architecture::ArmeabiV7a,
        Architecture::Arm64V8a,
        Architecture::X86,
        Architecture::X86_64,
    ];

    /// Returns the ABI identifier, which is also the jniLibs directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Armeabi => "armeabi",
            Architecture::ArmeabiV7a => "armeabi-v7a",
            Architecture::Arm64V8a => "arm64-v8a",
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
        }
    }

    /// Parses a list of identifiers, rejecting the first unknown or repeated one.
    ///
    /// Each architecture owns its output directory, so listing one twice is a
    /// configuration error rather than a second build.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Architecture>> {
        let mut parsed: Vec<Architecture> = Vec::with_capacity(names.len());
        for name in names {
            let arch: Architecture = name.as_ref().parse()?;
            if parsed.contains(&arch) {
                return Err(PackError::Config(format!(
                    "architecture '{}' listed more than once",
                    arch
                )));
            }
            parsed.push(arch);
        }
        Ok(parsed)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        Architecture::ALL
            .into_iter()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| PackError::UnknownArchitecture(s.to_string()))
    }
}

impl TryFrom<String> for Architecture {
    type Error = PackError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Architecture> for String {
    fn from(arch: Architecture) -> Self {
        arch.as_str().to_string()
    }
}

/// A single GN argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<u32> for FlagValue {
    fn from(value: u32) -> Self {
        FlagValue::Int(i64::from(value))
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Str(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Str(value)
    }
}

/// GN arguments in insertion order.
///
/// The generator caches on the literal it receives, so the order flags are
/// added in is the order they are encoded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    entries: Vec<(String, FlagValue)>,
}

impl BuildFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position if it was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FlagValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build description for one architecture.
///
/// Created by [`crate::arch::build_configuration`] and consumed by
/// [`crate::builders::BuildInvoker`]. Fields are read-only after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    architecture: Architecture,
    target_cpu: &'static str,
    arm_version: Option<u32>,
    is_debug: bool,
    flags: BuildFlags,
}

impl BuildConfiguration {
    pub(crate) fn new(
        architecture: Architecture,
        target_cpu: &'static str,
        arm_version: Option<u32>,
        is_debug: bool,
        flags: BuildFlags,
    ) -> Self {
        Self {
            architecture,
            target_cpu,
            arm_version,
            is_debug,
            flags,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// GN `target_cpu` value.
    pub fn target_cpu(&self) -> &'static str {
        self.target_cpu
    }

    /// GN `arm_version`; only set for the 32-bit ARM ABIs.
    pub fn arm_version(&self) -> Option<u32> {
        self.arm_version
    }

    pub fn is_debug(&self) -> bool {
        self.is_debug
    }

    pub fn flags(&self) -> &BuildFlags {
        &self.flags
    }
}

/// Run-level inputs used to derive every [`BuildConfiguration`].
///
/// # Example
///
/// ```
/// use jnipack_sdk::BuildOptions;
///
/// let options = BuildOptions {
///     is_debug: true,
///     ..BuildOptions::default()
/// };
/// assert_eq!(options.target_os, "android");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Build with debug symbols and without optimizations.
    pub is_debug: bool,
    /// GN `target_os`.
    pub target_os: String,
    /// GN `rtc_use_h264`.
    pub use_h264: bool,
    /// GN `rtc_include_tests`.
    pub include_tests: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            is_debug: false,
            target_os: "android".to_string(),
            use_h264: false,
            include_tests: false,
        }
    }
}

//! Configuration file support for jnipack.
//!
//! Project settings live in `jnipack.toml` so that source and build paths do
//! not have to be passed on every invocation.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./jnipack.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [source]
//! root = "/src/webrtc/src"
//! subtrees = ["sdk/android/api", "sdk/android/src/java", "rtc_base/java/src"]
//!
//! [build]
//! dir = "/src/webrtc/src/out"
//! architectures = ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"]
//! debug = false
//! jobs = 2
//!
//! [output]
//! work_dir = "."
//! archive_name = "libwebrtc-android"
//! artifacts = ["libjingle_peerconnection_so.so"]
//! ```

use anyhow::{Context, Result};
use jnipack_sdk::Architecture;
use jnipack_sdk::builders::{DEFAULT_EXECUTOR, DEFAULT_GENERATOR, DEFAULT_TARGETS};
use jnipack_sdk::collect::DEFAULT_ARTIFACTS;
use jnipack_sdk::pipeline::DEFAULT_ARCHIVE_NAME;
use jnipack_sdk::sync::DEFAULT_SUBTREES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "jnipack.toml";

/// Root configuration structure for `jnipack.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JnipackConfig {
    /// Upstream source tree.
    pub source: SourceConfig,

    /// Native build settings.
    pub build: BuildConfig,

    /// Assembly and archive settings.
    pub output: OutputConfig,
}

/// Upstream source tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Root of the upstream checkout (the directory containing `sdk/`).
    pub root: Option<PathBuf>,

    /// Subtrees of `root` merged into `java/`, in order.
    pub subtrees: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: None,
            subtrees: DEFAULT_SUBTREES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Native build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding one output directory per ABI.
    ///
    /// Defaults to `<source root>/out`.
    pub dir: Option<PathBuf>,

    /// ABIs to build, in order.
    ///
    /// Defaults to ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"].
    pub architectures: Vec<Architecture>,

    /// Debug build.
    pub debug: bool,

    /// GN `rtc_use_h264`.
    pub use_h264: bool,

    /// GN `target_os`.
    pub target_os: String,

    /// Maximum concurrent architecture builds.
    pub jobs: usize,

    /// Project generator program.
    pub generator: String,

    /// Build executor program.
    pub executor: String,

    /// Targets passed to the executor.
    pub targets: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: None,
            architectures: Architecture::DEFAULT.to_vec(),
            debug: false,
            use_h264: false,
            target_os: "android".to_string(),
            jobs: 1,
            generator: DEFAULT_GENERATOR.to_string(),
            executor: DEFAULT_EXECUTOR.to_string(),
            targets: DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Assembly and archive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving `java/`, `jniLibs/` and the archive.
    pub work_dir: PathBuf,

    /// Archive file name without `.zip`.
    pub archive_name: String,

    /// Libraries required in every built ABI directory.
    pub artifacts: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            artifacts: DEFAULT_ARTIFACTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl JnipackConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: JnipackConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Generates a starter configuration file as a formatted TOML string.
    ///
    /// `source_root` is written as an escaped TOML string, so Windows paths
    /// and quotes survive a round trip through [`Self::load_from_file`].
    pub fn generate_starter_toml(source_root: &str) -> String {
        let root = toml::Value::String(source_root.to_string());
        format!(
            r#"# jnipack configuration file
# CLI flags override these settings when provided.

[source]
# Root of the upstream checkout (the directory containing sdk/)
root = {root}

# Subtrees merged into java/, in order
subtrees = ["sdk/android/api", "sdk/android/src/java", "rtc_base/java/src"]

[build]
# Directory with one GN output directory per ABI (default: <root>/out)
# dir = "<root>/out"

# ABIs to build: armeabi, armeabi-v7a, arm64-v8a, x86, x86_64
architectures = ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"]

debug = false
use_h264 = false

# Concurrent ABI builds (1 builds one ABI at a time)
jobs = 1

# generator = "gn"
# executor = "ninja"
# targets = ["sdk/android:libwebrtc", "sdk/android:libjingle_peerconnection_so"]

[output]
work_dir = "."
archive_name = "libwebrtc-android"
artifacts = ["libjingle_peerconnection_so.so"]
"#,
            root = root,
        )
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<JnipackConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads an explicit config file, or discovers one from the current directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                config: Some(JnipackConfig::load_from_file(path)?),
                config_path: Some(path.to_path_buf()),
            });
        }

        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        match JnipackConfig::discover_from(&cwd)? {
            Some((config, path)) => Ok(Self {
                config: Some(config),
                config_path: Some(path),
            }),
            None => Ok(Self::default()),
        }
    }

    /// Returns the loaded configuration or the defaults.
    pub fn effective(&self) -> JnipackConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// # Returns
    ///
    /// The resolved value, preferring CLI over config over default.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&JnipackConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = JnipackConfig::default();
        assert!(config.source.root.is_none());
        assert_eq!(config.source.subtrees.len(), 3);
        assert_eq!(config.build.architectures, Architecture::DEFAULT.to_vec());
        assert_eq!(config.build.jobs, 1);
        assert_eq!(config.build.generator, "gn");
        assert_eq!(config.build.executor, "ninja");
        assert_eq!(config.output.archive_name, "libwebrtc-android");
        assert_eq!(config.output.artifacts, vec!["libjingle_peerconnection_so.so"]);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &config_path,
            r#"
[source]
root = "/src/webrtc/src"

[build]
architectures = ["arm64-v8a", "x86_64"]
debug = true
jobs = 2

[output]
archive_name = "webrtc-debug"
"#,
        )
        .unwrap();

        let config = JnipackConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.source.root, Some(PathBuf::from("/src/webrtc/src")));
        assert_eq!(
            config.build.architectures,
            vec![Architecture::Arm64V8a, Architecture::X86_64]
        );
        assert!(config.build.debug);
        assert_eq!(config.build.jobs, 2);
        assert_eq!(config.output.archive_name, "webrtc-debug");
        // Unspecified values keep their defaults.
        assert_eq!(config.output.artifacts, vec!["libjingle_peerconnection_so.so"]);
    }

    #[test]
    fn test_unknown_architecture_in_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[build]\narchitectures = [\"mips\"]\n").unwrap();

        let err = JnipackConfig::load_from_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown architecture 'mips'"));
    }

    #[test]
    fn test_discover_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[output]\nwork_dir = \"dist\"\n").unwrap();
        let nested = temp_dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = JnipackConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.output.work_dir, PathBuf::from("dist"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = JnipackConfig::discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_config_resolver() {
        let mut config = JnipackConfig::default();
        config.build.jobs = 4;
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: None,
        };

        // CLI value takes precedence
        assert_eq!(resolver.resolve(Some(2), |c| Some(c.build.jobs), 1), 2);

        // Config value used when CLI is None
        assert_eq!(resolver.resolve(None, |c| Some(c.build.jobs), 1), 4);

        // Default when neither is set
        let empty = ConfigResolver::default();
        assert_eq!(empty.resolve(None, |c| Some(c.build.jobs), 1), 1);
    }

    #[test]
    fn test_starter_toml_parses() {
        let toml = JnipackConfig::generate_starter_toml("/src/webrtc/src");
        let config: JnipackConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.source.root, Some(PathBuf::from("/src/webrtc/src")));
        assert_eq!(config.build.architectures.len(), 4);
    }

    #[test]
    fn test_starter_toml_escapes_source_root() {
        for root in [r"C:\webrtc\src", r#"/src/"quoted"/src"#, r"\\server\share\it's"] {
            let toml = JnipackConfig::generate_starter_toml(root);
            let config: JnipackConfig = toml::from_str(&toml)
                .unwrap_or_else(|e| panic!("starter for {:?} did not parse: {}", root, e));
            assert_eq!(config.source.root, Some(PathBuf::from(root)));
        }
    }
}

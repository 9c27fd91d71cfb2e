//! Architecture to build-configuration mapping.
//!
//! | Architecture | `target_cpu` | `arm_version` |
//! |--------------|--------------|---------------|
//! | `armeabi`     | `arm`   | 6 |
//! | `armeabi-v7a` | `arm`   | 7 |
//! | `arm64-v8a`   | `arm64` | - |
//! | `x86`         | `x86`   | - |
//! | `x86_64`      | `x64`   | - |

use crate::types::{Architecture, BuildConfiguration, BuildFlags, BuildOptions, Result};

impl Architecture {
    /// GN `target_cpu` for this ABI.
    pub fn target_cpu(&self) -> &'static str {
        match self {
            Architecture::Armeabi | Architecture::ArmeabiV7a => "arm",
            Architecture::Arm64V8a => "arm64",
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x64",
        }
    }

    /// GN `arm_version`, present only for 32-bit ARM.
    pub fn arm_version(&self) -> Option<u32> {
        match self {
            Architecture::Armeabi => Some(6),
            Architecture::ArmeabiV7a => Some(7),
            Architecture::Arm64V8a | Architecture::X86 | Architecture::X86_64 => None,
        }
    }

    /// Derives the build configuration for this architecture.
    pub fn build_configuration(&self, options: &BuildOptions) -> BuildConfiguration {
        let mut flags = BuildFlags::new();
        flags.insert("target_os", options.target_os.as_str());
        flags.insert("is_debug", options.is_debug);
        flags.insert("rtc_include_tests", options.include_tests);
        flags.insert("rtc_use_h264", options.use_h264);
        flags.insert("target_cpu", self.target_cpu());
        if let Some(version) = self.arm_version() {
            flags.insert("arm_version", version);
        }

        BuildConfiguration::new(
            *self,
            self.target_cpu(),
            self.arm_version(),
            options.is_debug,
            flags,
        )
    }
}

/// Derives the build configuration for an architecture identifier.
///
/// Fails with [`crate::PackError::UnknownArchitecture`] for anything outside
/// the supported set.
///
/// # Example
///
/// ```
/// use jnipack_sdk::{arch::build_configuration, BuildOptions};
///
/// let config = build_configuration("armeabi-v7a", &BuildOptions::default())?;
/// assert_eq!(config.target_cpu(), "arm");
/// assert_eq!(config.arm_version(), Some(7));
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
pub fn build_configuration(architecture: &str, options: &BuildOptions) -> Result<BuildConfiguration> {
    let arch: Architecture = architecture.parse()?;
    Ok(arch.build_configuration(options))
}

/// Derives configurations for every architecture, in order.
///
/// All identifiers are validated before any configuration is returned.
pub fn build_configurations<S: AsRef<str>>(
    architectures: &[S],
    options: &BuildOptions,
) -> Result<Vec<BuildConfiguration>> {
    let parsed = Architecture::parse_list(architectures)?;
    Ok(parsed
        .iter()
        .map(|arch| arch.build_configuration(options))
        .collect())
}

//! GN argument literal encoding.

use crate::types::{BuildConfiguration, BuildFlags, FlagValue};

/// Encodes a single value as a GN literal.
pub fn encode_value(value: &FlagValue) -> String {
    match value {
        FlagValue::Bool(b) => b.to_string(),
        FlagValue::Int(i) => i.to_string(),
        FlagValue::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                if matches!(c, '"' | '\\' | '$') {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
            out
        }
    }
}

/// Encodes flags as space-separated `key=value` pairs in insertion order.
pub fn encode_flags(flags: &BuildFlags) -> String {
    flags
        .iter()
        .map(|(key, value)| format!("{}={}", key, encode_value(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encodes a configuration into the literal passed as `--args=`.
///
/// # Example
///
/// ```
/// use jnipack_sdk::{arch::build_configuration, gn, BuildOptions};
///
/// let config = build_configuration("x86", &BuildOptions::default())?;
/// assert_eq!(
///     gn::encode(&config),
///     r#"target_os="android" is_debug=false rtc_include_tests=false rtc_use_h264=false target_cpu="x86""#
/// );
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
pub fn encode(config: &BuildConfiguration) -> String {
    encode_flags(config.flags())
}

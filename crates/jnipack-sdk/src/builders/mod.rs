//! Build automation for Android native libraries.
//!
//! This module drives the external build for each Android ABI:
//!
//! 1. **Generate** - `gn gen <build_dir>/<abi> --args=<literal>`
//! 2. **Execute** - `ninja -C <build_dir>/<abi> <targets...>`
//!
//! Both steps block until the process exits. A non-zero exit aborts the run
//! with [`crate::PackError::ExternalTool`]; nothing is retried.
//!
//! ## Runners
//!
//! | Runner | Behavior |
//! |--------|----------|
//! | [`ProcessRunner`] | Spawns the real tools |
//! | [`RecordingRunner`] | Records command lines, runs nothing |
//!
//! ## Example
//!
//! ```no_run
//! use jnipack_sdk::builders::{BuildInvoker, ProcessRunner};
//! use jnipack_sdk::{arch::build_configurations, BuildOptions};
//!
//! let configs = build_configurations(&["arm64-v8a", "x86_64"], &BuildOptions::default())?;
//! let invoker = BuildInvoker::new("out", ProcessRunner);
//! invoker.build_all(&configs, 2)?;
//! # Ok::<(), jnipack_sdk::PackError>(())
//! ```

pub mod android;
pub mod common;

pub use android::{
    BuildInvoker, BuildReport, DEFAULT_EXECUTOR, DEFAULT_GENERATOR, DEFAULT_TARGETS,
};
pub use common::{ProcessRunner, RecordingRunner, ToolInvocation, ToolOutcome, ToolRunner};

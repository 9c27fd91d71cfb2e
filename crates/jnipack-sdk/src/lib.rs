//! Android native SDK assembly for Rust
//!
//! `jnipack-sdk` builds a native library for several Android ABIs with GN and
//! Ninja, collects the resulting shared objects into a `jniLibs/` tree next to
//! the staged Java sources, and packages both into one zip archive.
//!
//! # Quick Start
//!
//! ```no_run
//! use jnipack_sdk::builders::ProcessRunner;
//! use jnipack_sdk::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig {
//!     source_root: "/src/webrtc/src".into(),
//!     build_dir: "/src/webrtc/src/out".into(),
//!     jobs: 2,
//!     ..PipelineConfig::default()
//! };
//!
//! let summary = Pipeline::new(config, ProcessRunner).run()?;
//! println!("packaged {} entries into {:?}", summary.entries.len(), summary.archive);
//! # Ok::<(), jnipack_sdk::PipelineError>(())
//! ```
//!
//! # Architecture
//!
//! - **arch**: ABI to GN configuration mapping
//! - **gn**: GN literal encoding of a configuration
//! - **builders**: generator/executor invocation, sequential or pooled
//! - **sync**: staging of upstream Java sources
//! - **collect**: copying built libraries into `jniLibs/<abi>/`
//! - **package**: deterministic zip archive
//! - **pipeline**: stage ordering, state tracking and run summary
//!
//! # Output Layout
//!
//! ```text
//! <work_dir>/
//! ├── java/                      # merged upstream sources
//! ├── jniLibs/<abi>/*.so         # one directory per collected ABI
//! └── <archive_name>.zip         # both trees, root-relative paths
//! ```

pub mod arch;
pub mod assembly;
pub mod builders;
pub mod collect;
pub mod gn;
pub mod package;
pub mod pipeline;
pub mod sync;
pub mod types;

pub use collect::CollectionReport;
pub use package::PackReport;
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineState, RunSummary, Stage};
pub use sync::SyncReport;
pub use types::{
    Architecture, BuildConfiguration, BuildFlags, BuildOptions, FlagValue, PackError, Result,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

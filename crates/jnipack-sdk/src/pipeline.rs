//! End-to-end SDK assembly: sync sources, build, collect, package.
//!
//! ```text
//! Idle -> SourceSynced -> Building(n) -> Collected -> Packaged -> Done
//!   \__________\______________\_____________\___________\-> Failed(stage)
//! ```
//!
//! Stages run in order and nothing is retried. A failure leaves the output
//! of earlier stages on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};

use crate::arch::build_configurations;
use crate::builders::{BuildInvoker, DEFAULT_EXECUTOR, DEFAULT_GENERATOR, DEFAULT_TARGETS, ToolRunner};
use crate::collect::{CollectionReport, DEFAULT_ARTIFACTS, collect};
use crate::package::{PackReport, pack};
use crate::sync::{DEFAULT_SUBTREES, SyncReport, sync_sources};
use crate::types::{Architecture, BuildConfiguration, BuildOptions, PackError};

/// Name of the source assembly directory under the work directory.
pub const SOURCE_ASSEMBLY_DIR: &str = "java";

/// Name of the library assembly directory under the work directory.
pub const LIBRARY_ASSEMBLY_DIR: &str = "jniLibs";

/// Archive file name (without `.zip`) used when none is configured.
pub const DEFAULT_ARCHIVE_NAME: &str = "libwebrtc-android";

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Configure,
    Sync,
    Build,
    Collect,
    Package,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Configure => "configure",
            Stage::Sync => "sync",
            Stage::Build => "build",
            Stage::Collect => "collect",
            Stage::Package => "package",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SourceSynced,
    /// Number of architectures built so far.
    Building(usize),
    Collected,
    Packaged,
    Done,
    Failed(Stage),
}

/// A fatal error together with the stage it occurred in.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed{}: {source}", arch_suffix(.source))]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: PackError,
}

fn arch_suffix(err: &PackError) -> String {
    match err.architecture() {
        Some(arch) => format!(" for {}", arch),
        None => String::new(),
    }
}

/// Everything a run needs; defaults mirror the upstream WebRTC layout.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the upstream source checkout.
    pub source_root: PathBuf,
    /// Subtrees of `source_root` merged into the source assembly.
    pub subtrees: Vec<String>,
    /// Directory holding one output directory per architecture.
    pub build_dir: PathBuf,
    /// Directory receiving the assembly trees and the archive.
    pub work_dir: PathBuf,
    /// Archive file name without extension.
    pub archive_name: String,
    /// Architecture identifiers, validated before anything runs.
    pub architectures: Vec<String>,
    /// Files required in every built architecture's output directory.
    pub artifacts: Vec<String>,
    pub options: BuildOptions,
    pub generator: String,
    pub executor: String,
    pub targets: Vec<String>,
    /// Maximum concurrent architecture builds; `1` is sequential.
    pub jobs: usize,
    /// Package an existing build directory without running the tools.
    pub skip_build: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src"),
            subtrees: DEFAULT_SUBTREES.iter().map(|s| s.to_string()).collect(),
            build_dir: PathBuf::from("out"),
            work_dir: PathBuf::from("."),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            architectures: Architecture::DEFAULT
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
            artifacts: DEFAULT_ARTIFACTS.iter().map(|s| s.to_string()).collect(),
            options: BuildOptions::default(),
            generator: DEFAULT_GENERATOR.to_string(),
            executor: DEFAULT_EXECUTOR.to_string(),
            targets: DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect(),
            jobs: 1,
            skip_build: false,
        }
    }
}

impl PipelineConfig {
    pub fn source_assembly_dir(&self) -> PathBuf {
        self.work_dir.join(SOURCE_ASSEMBLY_DIR)
    }

    pub fn library_assembly_dir(&self) -> PathBuf {
        self.work_dir.join(LIBRARY_ASSEMBLY_DIR)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.zip", self.archive_name))
    }

    /// Derives every architecture's build configuration.
    pub fn build_configurations(&self) -> Result<Vec<BuildConfiguration>, PackError> {
        if self.architectures.is_empty() {
            return Err(PackError::Config("no architectures configured".to_string()));
        }
        build_configurations(&self.architectures, &self.options)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub architectures: Vec<Architecture>,
    pub built: Vec<Architecture>,
    pub collected: Vec<Architecture>,
    pub skipped: Vec<Architecture>,
    pub source_files: usize,
    pub archive: PathBuf,
    pub entries: Vec<String>,
    pub debug: bool,
    pub finished_at: String,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String, PackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the assembly stages with a given [`ToolRunner`].
pub struct Pipeline<R> {
    config: PipelineConfig,
    runner: R,
    state: PipelineState,
}

impl<R: ToolRunner> Pipeline<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            state: PipelineState::Idle,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn fail(&mut self, stage: Stage, source: PackError) -> PipelineError {
        error!(stage = %stage, error = %source, "pipeline failed");
        self.state = PipelineState::Failed(stage);
        PipelineError { stage, source }
    }

    fn invoker(&self) -> BuildInvoker<&R> {
        BuildInvoker::new(&self.config.build_dir, &self.runner)
            .generator(self.config.generator.clone())
            .executor(self.config.executor.clone())
            .targets(self.config.targets.clone())
    }

    /// Runs every stage and returns the summary.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let configs = self
            .config
            .build_configurations()
            .map_err(|e| self.fail(Stage::Configure, e))?;
        let architectures: Vec<Architecture> =
            configs.iter().map(BuildConfiguration::architecture).collect();

        let synced = self.sync_stage()?;

        let built = if self.config.skip_build {
            info!("skipping native builds");
            Vec::new()
        } else {
            self.build_stage(&configs)?
        };
        self.state = PipelineState::Building(built.len());

        let collection = self.collect_stage(&architectures)?;
        let packed = self.package_stage()?;
        self.state = PipelineState::Done;

        Ok(RunSummary {
            architectures,
            built,
            collected: collection.collected,
            skipped: collection.skipped,
            source_files: synced.files,
            archive: packed.archive,
            entries: packed.entries,
            debug: self.config.options.is_debug,
            finished_at: now_rfc3339(),
        })
    }

    /// Runs only the source sync stage.
    pub fn sync_only(&mut self) -> Result<SyncReport, PipelineError> {
        let report = self.sync_stage()?;
        self.state = PipelineState::Done;
        Ok(report)
    }

    /// Collects and packages an existing build directory.
    pub fn package_only(&mut self) -> Result<(CollectionReport, PackReport), PipelineError> {
        let configs = self
            .config
            .build_configurations()
            .map_err(|e| self.fail(Stage::Configure, e))?;
        let architectures: Vec<Architecture> =
            configs.iter().map(BuildConfiguration::architecture).collect();

        let collection = self.collect_stage(&architectures)?;
        let packed = self.package_stage()?;
        self.state = PipelineState::Done;
        Ok((collection, packed))
    }

    fn sync_stage(&mut self) -> Result<SyncReport, PipelineError> {
        let destination = self.config.source_assembly_dir();
        info!(
            from = %self.config.source_root.display(),
            to = %destination.display(),
            "syncing sources"
        );
        let report = sync_sources(&self.config.source_root, &self.config.subtrees, &destination)
            .map_err(|e| self.fail(Stage::Sync, e))?;
        self.state = PipelineState::SourceSynced;
        Ok(report)
    }

    fn build_stage(&mut self, configs: &[BuildConfiguration]) -> Result<Vec<Architecture>, PipelineError> {
        self.state = PipelineState::Building(0);
        let result = self.invoker().build_all(configs, self.config.jobs);
        match result {
            Ok(report) => Ok(report.built),
            Err(e) => Err(self.fail(Stage::Build, e)),
        }
    }

    fn collect_stage(&mut self, architectures: &[Architecture]) -> Result<CollectionReport, PipelineError> {
        let destination = self.config.library_assembly_dir();
        let report = collect(
            &self.config.build_dir,
            architectures,
            &self.config.artifacts,
            &destination,
        )
        .map_err(|e| self.fail(Stage::Collect, e))?;
        self.state = PipelineState::Collected;
        Ok(report)
    }

    fn package_stage(&mut self) -> Result<PackReport, PipelineError> {
        let report = pack(
            &self.config.source_assembly_dir(),
            &self.config.library_assembly_dir(),
            &self.config.archive_path(),
        )
        .map_err(|e| self.fail(Stage::Package, e))?;
        self.state = PipelineState::Packaged;
        Ok(report)
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

/// Writes a run summary as pretty JSON.
pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<(), PackError> {
    let json = summary.to_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| PackError::io(path, e))
}

//! Per-ABI native builds with GN and Ninja.
//!
//! Each architecture gets its own output directory `<build_dir>/<abi>`. The
//! generator writes Ninja files there and the executor builds the configured
//! targets in it. Nothing else is shared between architectures, so builds can
//! run on a bounded worker pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::common::{ToolInvocation, ToolRunner};
use crate::gn;
use crate::types::{Architecture, BuildConfiguration, PackError, Result};

/// Default project generator.
pub const DEFAULT_GENERATOR: &str = "gn";

/// Default build executor.
pub const DEFAULT_EXECUTOR: &str = "ninja";

/// Targets built for every architecture by default.
pub const DEFAULT_TARGETS: [&str; 2] = [
    "sdk/android:libwebrtc",
    "sdk/android:libjingle_peerconnection_so",
];

/// Runs the generator and executor for one architecture at a time.
///
/// # Example
///
/// ```
/// use jnipack_sdk::builders::{BuildInvoker, RecordingRunner};
/// use jnipack_sdk::{arch::build_configuration, BuildOptions};
///
/// let runner = RecordingRunner::new();
/// let invoker = BuildInvoker::new("out", &runner);
/// let config = build_configuration("x86", &BuildOptions::default())?;
/// invoker.build(&config)?;
///
/// let calls = runner.calls();
/// assert_eq!(calls[0].program, "gn");
/// assert_eq!(calls[1].program, "ninja");
/// # Ok::<(), jnipack_sdk::PackError>(())
/// ```
pub struct BuildInvoker<R> {
    build_dir: PathBuf,
    generator: String,
    executor: String,
    targets: Vec<String>,
    runner: R,
}

/// Result of a multi-architecture build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Architectures whose generate and execute steps both succeeded.
    pub built: Vec<Architecture>,
}

enum BuildOutcome {
    Built(Architecture),
    Failed(PackError),
    Cancelled(Architecture),
}

impl<R: ToolRunner> BuildInvoker<R> {
    /// Creates an invoker writing per-architecture output under `build_dir`.
    pub fn new(build_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            build_dir: build_dir.into(),
            generator: DEFAULT_GENERATOR.to_string(),
            executor: DEFAULT_EXECUTOR.to_string(),
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            runner,
        }
    }

    /// Overrides the generator program.
    pub fn generator(mut self, program: impl Into<String>) -> Self {
        self.generator = program.into();
        self
    }

    /// Overrides the executor program.
    pub fn executor(mut self, program: impl Into<String>) -> Self {
        self.executor = program.into();
        self
    }

    /// Overrides the build targets passed to the executor.
    pub fn targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Output directory for an architecture.
    pub fn output_dir(&self, arch: Architecture) -> PathBuf {
        self.build_dir.join(arch.as_str())
    }

    /// The `gen` command line for a configuration.
    pub fn generate_invocation(&self, config: &BuildConfiguration) -> ToolInvocation {
        let output_dir = self.output_dir(config.architecture());
        ToolInvocation::new(&self.generator)
            .arg("gen")
            .arg(output_dir.to_string_lossy())
            .arg(format!("--args={}", gn::encode(config)))
    }

    /// The executor command line for a configuration.
    pub fn execute_invocation(&self, config: &BuildConfiguration) -> ToolInvocation {
        let output_dir = self.output_dir(config.architecture());
        ToolInvocation::new(&self.executor)
            .arg("-C")
            .arg(output_dir.to_string_lossy())
            .args(self.targets.iter().cloned())
    }

    /// Generates build files for one architecture.
    pub fn generate(&self, config: &BuildConfiguration) -> Result<()> {
        let invocation = self.generate_invocation(config);
        self.invoke(config.architecture(), &invocation)
    }

    /// Runs the executor over the configured targets for one architecture.
    pub fn execute(&self, config: &BuildConfiguration) -> Result<()> {
        let invocation = self.execute_invocation(config);
        self.invoke(config.architecture(), &invocation)
    }

    /// Generates and builds one architecture.
    pub fn build(&self, config: &BuildConfiguration) -> Result<()> {
        info!(arch = %config.architecture(), "building");
        self.generate(config)?;
        self.execute(config)
    }

    fn invoke(&self, arch: Architecture, invocation: &ToolInvocation) -> Result<()> {
        info!(arch = %arch, command = %invocation, "running");
        let outcome = self.runner.run(invocation)?;

        if outcome.success {
            debug!(arch = %arch, tool = %invocation.program, status = %outcome.status, "finished");
            return Ok(());
        }

        error!(
            arch = %arch,
            tool = %invocation.program,
            status = %outcome.status,
            "command failed"
        );
        Err(PackError::ExternalTool {
            architecture: arch,
            tool: invocation.program.clone(),
            status: outcome.status,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        })
    }
}

impl<R: ToolRunner> BuildInvoker<R> {
    /// Builds every configuration.
    ///
    /// With `jobs <= 1` architectures are built in order and the first failure
    /// is returned immediately. With more jobs they run on a worker pool of
    /// that size: the first failure stops architectures that have not started
    /// yet, builds already running are allowed to finish, and the error of the
    /// earliest failed architecture in `configs` order is returned.
    ///
    /// An architecture listed twice is rejected before any tool runs.
    pub fn build_all(&self, configs: &[BuildConfiguration], jobs: usize) -> Result<BuildReport> {
        for (i, config) in configs.iter().enumerate() {
            let arch = config.architecture();
            if configs[..i].iter().any(|c| c.architecture() == arch) {
                return Err(PackError::Config(format!(
                    "architecture '{}' listed more than once",
                    arch
                )));
            }
        }

        if jobs <= 1 || configs.len() <= 1 {
            let mut report = BuildReport::default();
            for config in configs {
                self.build(config)?;
                report.built.push(config.architecture());
            }
            return Ok(report);
        }

        let workers = jobs.min(configs.len());
        debug!(workers, architectures = configs.len(), "starting build pool");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("jnipack-build-{}", i))
            .build()?;

        let cancelled = AtomicBool::new(false);
        let outcomes: Vec<BuildOutcome> = pool.install(|| {
            configs
                .par_iter()
                .map(|config| {
                    let arch = config.architecture();
                    if cancelled.load(Ordering::SeqCst) {
                        return BuildOutcome::Cancelled(arch);
                    }
                    match self.build(config) {
                        Ok(()) => BuildOutcome::Built(arch),
                        Err(e) => {
                            cancelled.store(true, Ordering::SeqCst);
                            BuildOutcome::Failed(e)
                        }
                    }
                })
                .collect()
        });

        let mut report = BuildReport::default();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                BuildOutcome::Built(arch) => report.built.push(arch),
                BuildOutcome::Cancelled(arch) => {
                    warn!(arch = %arch, "build cancelled after an earlier failure")
                }
                BuildOutcome::Failed(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        error!(error = %e, "additional build failure");
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

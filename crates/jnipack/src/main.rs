use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use jnipack_sdk::builders::{BuildInvoker, ProcessRunner, RecordingRunner};
use jnipack_sdk::pipeline::write_summary;
use jnipack_sdk::{BuildOptions, Pipeline, PipelineConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, ConfigResolver, JnipackConfig};

mod config;

/// Builds a native library for several Android ABIs and packages it with its Java sources.
#[derive(Parser, Debug)]
#[command(name = "jnipack", author, version, about = "Android native SDK builder and packager", long_about = None)]
struct Cli {
    /// Path to a jnipack.toml (discovered from the current directory if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync sources, build every ABI, collect libraries and write the archive.
    Build {
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        build: BuildArgs,
        #[arg(long, help = "Package the existing build directory without running gn/ninja")]
        skip_build: bool,
        #[arg(long, help = "Write a JSON run summary to this path")]
        summary: Option<PathBuf>,
    },
    /// Merge the upstream Java subtrees into <work-dir>/java.
    Sync {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Collect libraries from an existing build directory and write the archive.
    Package {
        #[command(flatten)]
        paths: PathArgs,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Print the gn and ninja command lines for each ABI without running them.
    Plan {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Write a starter jnipack.toml.
    Init {
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
        #[arg(long, default_value = "src", help = "Upstream source root to put in the file")]
        source_dir: String,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct PathArgs {
    #[arg(long, help = "Upstream source root (the directory containing sdk/)")]
    source_dir: Option<PathBuf>,
    #[arg(long, help = "Directory receiving java/, jniLibs/ and the archive")]
    work_dir: Option<PathBuf>,
    #[arg(long, help = "Archive file name without .zip")]
    archive_name: Option<String>,
}

#[derive(Args, Debug, Default)]
struct BuildArgs {
    #[arg(long, help = "Directory holding one output directory per ABI")]
    build_dir: Option<PathBuf>,
    #[arg(long = "arch", help = "ABI to build (repeatable)")]
    architectures: Vec<String>,
    #[arg(long, help = "Debug build")]
    debug: bool,
    #[arg(long, conflicts_with = "debug", help = "Release build, even if the config file sets debug")]
    release: bool,
    #[arg(long, help = "Enable H.264 support")]
    use_h264: bool,
    #[arg(long, conflicts_with = "use_h264", help = "Disable H.264 support, even if the config file enables it")]
    no_h264: bool,
    #[arg(long, help = "Maximum concurrent ABI builds")]
    jobs: Option<usize>,
}

/// Turns a pair of opposing switches into an override; neither means "use the file".
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let resolver = ConfigResolver::load(cli.config.as_deref())?;
    if let Some(path) = &resolver.config_path {
        info!(path = %path.display(), "loaded configuration");
    }

    match cli.command {
        Command::Build {
            paths,
            build,
            skip_build,
            summary,
        } => cmd_build(&resolver, &paths, &build, skip_build, summary.as_deref()),
        Command::Sync { paths } => cmd_sync(&resolver, &paths),
        Command::Package { paths, build } => cmd_package(&resolver, &paths, &build),
        Command::Plan { build } => cmd_plan(&resolver, &build),
        Command::Init {
            output,
            source_dir,
            force,
        } => cmd_init(&output, &source_dir, force),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Merges CLI flags over the config file over built-in defaults.
fn resolve_pipeline_config(
    resolver: &ConfigResolver,
    paths: &PathArgs,
    build: &BuildArgs,
) -> PipelineConfig {
    let file = resolver.effective();

    let source_root = resolver.resolve(
        paths.source_dir.clone(),
        |c| c.source.root.clone(),
        PathBuf::new(),
    );
    let default_build_dir = if source_root.as_os_str().is_empty() {
        PathBuf::from("out")
    } else {
        source_root.join("out")
    };
    let architectures = if build.architectures.is_empty() {
        file.build
            .architectures
            .iter()
            .map(|a| a.as_str().to_string())
            .collect()
    } else {
        build.architectures.clone()
    };

    PipelineConfig {
        subtrees: file.source.subtrees.clone(),
        build_dir: resolver.resolve(build.build_dir.clone(), |c| c.build.dir.clone(), default_build_dir),
        work_dir: resolver.resolve(
            paths.work_dir.clone(),
            |c| Some(c.output.work_dir.clone()),
            PathBuf::from("."),
        ),
        archive_name: paths
            .archive_name
            .clone()
            .unwrap_or_else(|| file.output.archive_name.clone()),
        architectures,
        artifacts: file.output.artifacts.clone(),
        options: BuildOptions {
            is_debug: resolver.resolve(
                switch(build.debug, build.release),
                |c| Some(c.build.debug),
                false,
            ),
            target_os: file.build.target_os.clone(),
            use_h264: resolver.resolve(
                switch(build.use_h264, build.no_h264),
                |c| Some(c.build.use_h264),
                false,
            ),
            include_tests: false,
        },
        generator: file.build.generator.clone(),
        executor: file.build.executor.clone(),
        targets: file.build.targets.clone(),
        jobs: resolver.resolve(build.jobs, |c| Some(c.build.jobs), 1),
        skip_build: false,
        source_root,
    }
}

fn require_source_root(config: &PipelineConfig) -> Result<()> {
    if config.source_root.as_os_str().is_empty() {
        bail!(
            "no source directory given. Pass --source-dir or set [source].root in {}",
            CONFIG_FILE_NAME
        );
    }
    Ok(())
}

fn cmd_build(
    resolver: &ConfigResolver,
    paths: &PathArgs,
    build: &BuildArgs,
    skip_build: bool,
    summary_path: Option<&Path>,
) -> Result<()> {
    let mut config = resolve_pipeline_config(resolver, paths, build);
    config.skip_build = skip_build;
    require_source_root(&config)?;

    println!("Building Android SDK package...");
    println!("  Source: {}", config.source_root.display());
    println!("  Build dir: {}", config.build_dir.display());
    println!("  ABIs: {}", config.architectures.join(", "));
    println!("  Profile: {}", if config.options.is_debug { "debug" } else { "release" });

    let mut pipeline = Pipeline::new(config, ProcessRunner);
    let summary = pipeline.run()?;

    println!("\n✓ Package written: {}", summary.archive.display());
    println!("  Entries: {}", summary.entries.len());
    println!(
        "  Collected: {}",
        summary.collected.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
    );
    if !summary.skipped.is_empty() {
        println!(
            "  Skipped (not built): {}",
            summary.skipped.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    if let Some(path) = summary_path {
        write_summary(&summary, path)
            .with_context(|| format!("writing run summary to {:?}", path))?;
        println!("  Summary: {}", path.display());
    }
    Ok(())
}

fn cmd_sync(resolver: &ConfigResolver, paths: &PathArgs) -> Result<()> {
    let config = resolve_pipeline_config(resolver, paths, &BuildArgs::default());
    require_source_root(&config)?;
    let destination = config.source_assembly_dir();

    let report = Pipeline::new(config, ProcessRunner).sync_only()?;
    println!("✓ Synced {} files into {}", report.files, destination.display());
    Ok(())
}

fn cmd_package(resolver: &ConfigResolver, paths: &PathArgs, build: &BuildArgs) -> Result<()> {
    let config = resolve_pipeline_config(resolver, paths, build);
    let (collection, packed) = Pipeline::new(config, ProcessRunner).package_only()?;

    println!("✓ Package written: {}", packed.archive.display());
    println!("  Entries: {}", packed.entries.len());
    println!(
        "  Collected: {}",
        collection.collected.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

fn cmd_plan(resolver: &ConfigResolver, build: &BuildArgs) -> Result<()> {
    let config = resolve_pipeline_config(resolver, &PathArgs::default(), build);
    let configs = config.build_configurations()?;

    let runner = RecordingRunner::new();
    BuildInvoker::new(&config.build_dir, &runner)
        .generator(config.generator.clone())
        .executor(config.executor.clone())
        .targets(config.targets.clone())
        .build_all(&configs, 1)?;

    for call in runner.calls() {
        println!("{}", call);
    }
    Ok(())
}

fn cmd_init(output: &Path, source_dir: &str, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{:?} already exists; pass --force to overwrite", output);
    }
    std::fs::write(output, JnipackConfig::generate_starter_toml(source_dir))
        .with_context(|| format!("writing {:?}", output))?;
    println!("✓ Wrote {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(config: JnipackConfig) -> ConfigResolver {
        ConfigResolver {
            config: Some(config),
            config_path: None,
        }
    }

    #[test]
    fn cli_flags_override_file() {
        let mut file = JnipackConfig::default();
        file.source.root = Some(PathBuf::from("/file/src"));
        file.build.jobs = 4;
        let resolver = resolver_with(file);

        let paths = PathArgs {
            source_dir: Some(PathBuf::from("/cli/src")),
            ..PathArgs::default()
        };
        let build = BuildArgs {
            architectures: vec!["x86".into()],
            jobs: Some(2),
            ..BuildArgs::default()
        };
        let config = resolve_pipeline_config(&resolver, &paths, &build);

        assert_eq!(config.source_root, PathBuf::from("/cli/src"));
        assert_eq!(config.build_dir, PathBuf::from("/cli/src/out"));
        assert_eq!(config.architectures, vec!["x86".to_string()]);
        assert_eq!(config.jobs, 2);
    }

    #[test]
    fn file_values_used_without_flags() {
        let mut file = JnipackConfig::default();
        file.source.root = Some(PathBuf::from("/file/src"));
        file.build.dir = Some(PathBuf::from("/builds"));
        file.build.debug = true;
        file.output.archive_name = "sdk".into();
        let config =
            resolve_pipeline_config(&resolver_with(file), &PathArgs::default(), &BuildArgs::default());

        assert_eq!(config.build_dir, PathBuf::from("/builds"));
        assert!(config.options.is_debug);
        assert_eq!(config.archive_path(), PathBuf::from(".").join("sdk.zip"));
        assert_eq!(config.architectures.len(), 4);
    }

    #[test]
    fn release_and_no_h264_override_file() {
        let mut file = JnipackConfig::default();
        file.build.debug = true;
        file.build.use_h264 = true;
        let resolver = resolver_with(file);

        let inherited =
            resolve_pipeline_config(&resolver, &PathArgs::default(), &BuildArgs::default());
        assert!(inherited.options.is_debug);
        assert!(inherited.options.use_h264);

        let build = BuildArgs {
            release: true,
            no_h264: true,
            ..BuildArgs::default()
        };
        let overridden = resolve_pipeline_config(&resolver, &PathArgs::default(), &build);
        assert!(!overridden.options.is_debug);
        assert!(!overridden.options.use_h264);
    }

    #[test]
    fn release_conflicts_with_debug() {
        let err = Cli::try_parse_from(["jnipack", "plan", "--debug", "--release"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn missing_source_root_is_reported() {
        let config = resolve_pipeline_config(
            &ConfigResolver::default(),
            &PathArgs::default(),
            &BuildArgs::default(),
        );
        assert_eq!(config.build_dir, PathBuf::from("out"));
        let err = require_source_root(&config).unwrap_err();
        assert!(err.to_string().contains("--source-dir"));
    }
}

//! cheribuild: build the CHERI toolchain and cross-compile projects for CheriBSD.

mod commands;
mod manifest;
mod registry;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use cheri_build::{StepSelection, SystemRunner};
use cheri_targets::HostPlatform;
use tracing_subscriber::EnvFilter;

use manifest::{CheribuildManifest, Overrides};

#[derive(Parser)]
#[command(name = "cheribuild", version, about = "Build the CHERI SDK and projects for CheriBSD")]
struct Cli {
    /// Manifest to use instead of searching for cheribuild.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print what would be done without changing anything
    #[arg(long, global = true)]
    pretend: bool,
    /// Log every external command
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Capability width to build for (128 or 256)
    #[arg(long, global = true)]
    cheri_bits: Option<u32>,
    /// Parallel make jobs
    #[arg(short = 'j', long, global = true)]
    make_jobs: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update, configure, compile and install projects in the given order
    Build {
        /// Project names (see `cheribuild list`)
        #[arg(required = true)]
        projects: Vec<String>,
        /// Do not fetch or update sources
        #[arg(long)]
        skip_update: bool,
        /// Do not run the configure step
        #[arg(long)]
        skip_configure: bool,
        /// Do not run the install step
        #[arg(long)]
        skip_install: bool,
    },
    /// Show the target, paths, flags and generated files for a project
    Describe {
        /// Project name
        project: String,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List known projects
    List,
    /// Check host tools and configuration
    Doctor,
    /// Write a starter cheribuild.toml
    Init {
        /// Directory to create it in (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Remove build directories
    Clean {
        /// Project names
        #[arg(required = true)]
        projects: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "cheribuild=debug,cheri_build=debug"
    } else {
        "cheribuild=info,cheri_build=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    if let Commands::Init { dir } = &cli.command {
        return commands::init::run(dir.as_deref().unwrap_or(&cwd));
    }

    let (manifest, manifest_dir) = load_manifest(cli.config.as_deref(), &cwd)?;
    let overrides = Overrides {
        pretend: cli.pretend,
        cheri_bits: cli.cheri_bits,
        make_jobs: cli.make_jobs,
    };
    let base_dir = manifest_dir.clone().unwrap_or_else(|| cwd.clone());
    let config = manifest.build_config(&base_dir, overrides)?;
    let host = HostPlatform::detect();
    let runner = SystemRunner::new(config.pretend);

    match cli.command {
        Commands::Build {
            projects,
            skip_update,
            skip_configure,
            skip_install,
        } => {
            let steps = StepSelection {
                skip_update,
                skip_configure,
                skip_install,
            };
            commands::build::run(&projects, &manifest, &config, &host, &runner, steps)
        }
        Commands::Describe { project, format } => {
            commands::describe::run(&project, &manifest, &config, &host, &format)
        }
        Commands::List => commands::list::run(&manifest),
        Commands::Doctor => commands::doctor::run(&config, &host, &runner, manifest_dir.as_deref()),
        Commands::Clean { projects } => commands::clean::run(&projects, &manifest, &config),
        Commands::Init { .. } => Ok(()),
    }
}

/// Load the manifest given with `--config`, or search upward from `cwd`.
/// Without either, defaults are used.
fn load_manifest(
    explicit: Option<&Path>,
    cwd: &Path,
) -> anyhow::Result<(CheribuildManifest, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let manifest = CheribuildManifest::load(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
        return Ok((manifest, Some(dir)));
    }
    match CheribuildManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, Some(dir))),
        None => Ok((CheribuildManifest::default(), None)),
    }
}

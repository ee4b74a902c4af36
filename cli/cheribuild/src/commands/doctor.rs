//! `cheribuild doctor`: host tool diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use cheri_build::llvm::host_clang_outcome;
use cheri_build::{BuildContext, BuildLld, BuildLlvm, CommandRunner, DependencyOutcome};
use cheri_targets::{BuildConfig, HostPlatform};

/// Print host tool and configuration diagnostics.
pub fn run(
    config: &BuildConfig,
    host: &HostPlatform,
    runner: &dyn CommandRunner,
    manifest_dir: Option<&Path>,
) -> Result<()> {
    println!("=== cheribuild doctor ===");
    println!();
    println!("cheribuild version: {}", env!("CARGO_PKG_VERSION"));
    println!("Host:               {host:?}");
    println!();

    println!("--- System Tools ---");
    print_tool_status("cmake", &["--version"]);
    print_tool_status("make", &["--version"]);
    print_tool_status("git", &["--version"]);
    println!();

    println!("--- Host Compiler ---");
    print_path("clang", config.clang_path.as_deref());
    print_path("clang++", config.clang_plus_plus_path.as_deref());
    let ctx = BuildContext {
        config,
        runner,
        host,
    };
    for (name, required) in [
        (BuildLlvm::NAME, BuildLlvm::required_clang()),
        (BuildLld::NAME, BuildLld::required_clang()),
    ] {
        let outcome = host_clang_outcome(required.clone(), &ctx)?;
        println!("  {name} (needs clang >= {required}): {}", summarize(&outcome));
        if let DependencyOutcome::TooOld { remediation, .. }
        | DependencyOutcome::Missing {
            remediation: Some(remediation),
            ..
        } = &outcome
        {
            for line in remediation.lines() {
                println!("      {}", line.trim());
            }
        }
    }
    println!();

    println!("--- Configuration ---");
    match manifest_dir {
        Some(dir) => println!("  cheribuild.toml: found at {}", dir.display()),
        None => println!("  cheribuild.toml: not found (using defaults)"),
    }
    println!("  Source root: {}", config.source_root.display());
    println!("  Build root:  {}", config.build_root.display());
    println!("  SDK:         {}", config.sdk_dir.display());
    println!("  Rootfs:      {}", config.rootfs_dir.display());
    println!("  CHERI bits:  {}", config.cheri_bits);
    println!("  Make jobs:   {}", config.make_jobs);
    Ok(())
}

fn summarize(outcome: &DependencyOutcome) -> String {
    match outcome {
        DependencyOutcome::Satisfied { found } => format!("ok ({found})"),
        DependencyOutcome::Missing { reason, .. } => format!("missing: {reason}"),
        DependencyOutcome::TooOld { found, .. } => format!("too old ({found})"),
    }
}

fn print_path(name: &str, path: Option<&Path>) {
    match path {
        Some(path) => println!("  {name}: {}", path.display()),
        None => println!("  {name}: not found"),
    }
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}

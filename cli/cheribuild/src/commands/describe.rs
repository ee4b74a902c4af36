//! `cheribuild describe`: show what a build would use.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use cheri_build::environment::EnvKey;
use cheri_build::CrossCompileSettings;
use cheri_targets::{BuildConfig, HostPlatform};
use serde::Serialize;

use crate::manifest::CheribuildManifest;
use crate::registry::{self, RegisteredProject};

/// Resolved build inputs for one project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Description {
    pub name: String,
    pub kind: &'static str,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CrossCompileSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmake_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_environment: Option<BTreeMap<String, String>>,
}

/// Resolve `name` and collect everything its build would be driven with.
pub fn describe(
    name: &str,
    manifest: &CheribuildManifest,
    config: &BuildConfig,
    host: &HostPlatform,
) -> Result<Description> {
    let project = registry::resolve(name, manifest, config)?;
    let layout = project.layout().clone();
    let mut description = Description {
        name: name.to_string(),
        kind: project.kind(),
        source_dir: layout.source_dir.clone(),
        build_dir: layout.build_dir.clone(),
        settings: None,
        cmake_args: None,
        toolchain_file: None,
        configure_args: None,
        configure_environment: None,
    };
    match project {
        RegisteredProject::Llvm(llvm) => {
            description.cmake_args = Some(llvm.cmake_invocation(config, host).args);
        }
        RegisteredProject::Lld(lld) => {
            description.cmake_args = Some(lld.cmake_invocation(config, host).args);
        }
        RegisteredProject::CMake(project) => {
            let strategy = &project.strategy;
            description.cmake_args = Some(strategy.invocation(&project.settings, &layout).args);
            description.toolchain_file = Some(strategy.render_toolchain_file(&project.settings)?);
            description.settings = Some(project.settings);
        }
        RegisteredProject::Autotools(project) => {
            let invocation = project
                .strategy
                .invocation(&project.settings, &layout, &host.build_triple())?;
            let derived: BTreeMap<String, String> = invocation
                .env
                .into_iter()
                .filter(|(key, _)| EnvKey::ALL.iter().any(|k| k.as_str() == key))
                .collect();
            description.configure_args = Some(invocation.args);
            description.configure_environment = Some(derived);
            description.settings = Some(project.settings);
        }
    }
    Ok(description)
}

/// Print the description of `name` as text or JSON.
pub fn run(
    name: &str,
    manifest: &CheribuildManifest,
    config: &BuildConfig,
    host: &HostPlatform,
    format: &str,
) -> Result<()> {
    let description = describe(name, manifest, config, host)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&description)?),
        "text" => print_text(&description),
        other => bail!("unknown format '{other}' (expected text or json)"),
    }
    Ok(())
}

fn print_text(d: &Description) {
    println!("=== {} ({}) ===", d.name, d.kind);
    println!("  Source: {}", d.source_dir.display());
    println!("  Build:  {}", d.build_dir.display());

    if let Some(settings) = &d.settings {
        println!();
        println!("--- Target ---");
        println!("  Triple:         {}", settings.target.triple);
        println!("  Install prefix: {}", settings.paths.install_prefix.display());
        println!("  DESTDIR:        {}", settings.paths.destdir.display());
        println!("  Sysroot:        {}", settings.paths.sdk_sysroot.display());
        println!();
        println!("--- Flags ---");
        println!("  COMMON: {}", settings.flags.common.join(" "));
        println!("  C:      {}", settings.flags.c.join(" "));
        println!("  CXX:    {}", settings.flags.cxx.join(" "));
        println!("  ASM:    {}", settings.flags.asm.join(" "));
        println!("  LD:     {}", settings.flags.ld.join(" "));
    }
    if let Some(args) = &d.cmake_args {
        println!();
        println!("--- CMake arguments ---");
        for arg in args {
            println!("  {arg}");
        }
    }
    if let Some(args) = &d.configure_args {
        println!();
        println!("--- configure arguments ---");
        for arg in args {
            println!("  {arg}");
        }
    }
    if let Some(env) = &d.configure_environment {
        println!();
        println!("--- configure environment ---");
        for (key, value) in env {
            println!("  {key}={value}");
        }
    }
    if let Some(toolchain) = &d.toolchain_file {
        println!();
        println!("--- CheriBSDToolchain.cmake ---");
        print!("{toolchain}");
    }
}

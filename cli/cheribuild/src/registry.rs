//! Built-in and manifest-declared projects.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cheri_build::git::GitSource;
use cheri_build::{
    AutotoolsBuildStrategy, BuildLld, BuildLlvm, BuildSystem, CMakeBuildStrategy, CrossCompileProject,
    CrossCompileSettings, Project, ProjectLayout, ToolchainTemplate,
};
use cheri_targets::BuildConfig;

use crate::manifest::{CheribuildManifest, ProjectSpec};

/// Projects that are always available.
pub const BUILTIN_PROJECTS: [(&str, &str); 2] = [
    (BuildLlvm::NAME, "LLVM and Clang for CHERI, installed into the SDK"),
    (BuildLld::NAME, "The LLD linker, installed into the SDK as ld.lld"),
];

/// A project resolved by name.
#[derive(Debug)]
pub enum RegisteredProject {
    Llvm(BuildLlvm),
    Lld(BuildLld),
    CMake(CrossCompileProject<CMakeBuildStrategy>),
    Autotools(CrossCompileProject<AutotoolsBuildStrategy>),
}

impl RegisteredProject {
    pub fn as_project(&self) -> &dyn Project {
        match self {
            RegisteredProject::Llvm(p) => p,
            RegisteredProject::Lld(p) => p,
            RegisteredProject::CMake(p) => p,
            RegisteredProject::Autotools(p) => p,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        match self {
            RegisteredProject::Llvm(p) => &p.layout,
            RegisteredProject::Lld(p) => &p.layout,
            RegisteredProject::CMake(p) => &p.layout,
            RegisteredProject::Autotools(p) => &p.layout,
        }
    }

    /// Short description of how the project is built.
    pub fn kind(&self) -> &'static str {
        match self {
            RegisteredProject::Llvm(_) | RegisteredProject::Lld(_) => "toolchain",
            RegisteredProject::CMake(_) => "cmake",
            RegisteredProject::Autotools(_) => "autotools",
        }
    }
}

/// Look up `name` among the built-in projects, then the manifest.
pub fn resolve(name: &str, manifest: &CheribuildManifest, config: &BuildConfig) -> Result<RegisteredProject> {
    match name {
        BuildLlvm::NAME => return Ok(RegisteredProject::Llvm(BuildLlvm::new(config, &manifest.llvm))),
        BuildLld::NAME => return Ok(RegisteredProject::Lld(BuildLld::new(config, &manifest.lld))),
        _ => {}
    }
    let Some(spec) = manifest.projects.get(name) else {
        bail!("unknown project '{name}' (see `cheribuild list`)");
    };
    cross_project(name, spec, config).with_context(|| format!("setting up project '{name}'"))
}

fn cross_project(name: &str, spec: &ProjectSpec, config: &BuildConfig) -> Result<RegisteredProject> {
    let layout = ProjectLayout {
        source_dir: spec
            .source_dir
            .clone()
            .unwrap_or_else(|| config.source_dir(name)),
        build_dir: config.build_dir(name),
    };
    let install_dir = spec
        .install_directory
        .as_deref()
        .map(|dir| below(&config.rootfs_dir, dir));
    let settings = CrossCompileSettings::new(config, name, spec.options.clone(), install_dir)?;
    let source = spec.repository.as_ref().map(|url| {
        let source = GitSource::new(url.as_str()).with_revision(spec.revision.clone());
        match &spec.initial_branch {
            Some(branch) => source.with_initial_branch(branch.as_str()),
            None => source,
        }
    });

    let project = match spec.build_system {
        BuildSystem::Cmake => {
            let template = match &spec.toolchain_template {
                Some(path) => ToolchainTemplate::load(path)?,
                None => ToolchainTemplate::cheribsd(),
            };
            let strategy = CMakeBuildStrategy {
                template,
                build_type: spec.cmake_build_type.clone(),
                extra_args: spec.configure_args.clone(),
            };
            RegisteredProject::CMake(with_source(CrossCompileProject::new(name, layout, settings, strategy), source))
        }
        BuildSystem::Autotools => {
            let strategy = AutotoolsBuildStrategy {
                configure_args: spec.configure_args.clone(),
                ..Default::default()
            };
            RegisteredProject::Autotools(with_source(
                CrossCompileProject::new(name, layout, settings, strategy),
                source,
            ))
        }
    };
    Ok(project)
}

fn with_source<S: cheri_build::BuildStrategy>(
    project: CrossCompileProject<S>,
    source: Option<GitSource>,
) -> CrossCompileProject<S> {
    match source {
        Some(source) => project.with_source(source),
        None => project,
    }
}

fn below(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    }
}

/// Every project name with a one-line description, built-ins first.
pub fn all_projects(manifest: &CheribuildManifest) -> Vec<(String, String)> {
    let mut projects: Vec<(String, String)> = BUILTIN_PROJECTS
        .iter()
        .map(|(name, description)| (name.to_string(), description.to_string()))
        .collect();
    for (name, spec) in &manifest.projects {
        if BUILTIN_PROJECTS.iter().any(|(builtin, _)| builtin == name) {
            continue;
        }
        let system = match spec.build_system {
            BuildSystem::Cmake => "cmake",
            BuildSystem::Autotools => "autotools",
        };
        projects.push((name.clone(), format!("{system} project for {}", spec.options.target)));
    }
    projects
}

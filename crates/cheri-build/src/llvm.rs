//! Building the toolchain itself: LLVM/Clang into the SDK, and LLD.

use std::fmt;
use std::path::{Path, PathBuf};

use cheri_targets::{BuildConfig, CheriBits, HostPlatform};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::cmake::CMakeInvocation;
use crate::cross::ProjectLayout;
use crate::error::{BuildError, Result};
use crate::fsops;
use crate::git::GitSource;
use crate::make;
use crate::project::{BuildContext, Project};
use crate::version::{clang_install_hint, DependencyOutcome, VersionGate};

/// Prefixes under which every installed tool is also exposed.
pub const TRIPLE_PREFIXES: [&str; 3] = [
    "cheri-unknown-freebsd-",
    "mips64-unknown-freebsd-",
    "mips4-unknown-freebsd-",
];

/// LLVM binaries that get triple-prefixed links after install.
pub const LLVM_TOOLS: [&str; 7] = [
    "clang",
    "clang++",
    "llvm-mc",
    "llvm-objdump",
    "llvm-readobj",
    "llvm-size",
    "llc",
];

/// `llvm-git-revision`, `clang-git-revision`, `lldb-git-revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LlvmOptions {
    pub llvm_git_revision: Option<String>,
    pub clang_git_revision: Option<String>,
    pub lldb_git_revision: Option<String>,
    pub cmake_build_type: String,
}

impl Default for LlvmOptions {
    fn default() -> Self {
        Self {
            llvm_git_revision: None,
            clang_git_revision: None,
            lldb_git_revision: None,
            cmake_build_type: "Release".into(),
        }
    }
}

/// `llvm-git-revision`, `lld-git-revision`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LldOptions {
    pub llvm_git_revision: Option<String>,
    pub lld_git_revision: Option<String>,
}

/// One repository of a multi-repository source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubComponent {
    pub name: &'static str,
    /// Checkout location relative to the main source directory.
    pub subdir: Option<&'static str>,
    pub source: GitSource,
    /// Disabled components are never fetched.
    pub enabled: bool,
}

impl SubComponent {
    pub fn checkout_dir(&self, source_root: &Path) -> PathBuf {
        match self.subdir {
            Some(subdir) => source_root.join(subdir),
            None => source_root.to_path_buf(),
        }
    }
}

fn update_components(components: &[SubComponent], source_dir: &Path, ctx: &BuildContext<'_>) -> Result<()> {
    for component in components {
        if !component.enabled {
            info!("skipping disabled component {}", component.name);
            continue;
        }
        component
            .source
            .update(&component.checkout_dir(source_dir), ctx.runner)?;
    }
    Ok(())
}

/// CMake arguments shared by the LLVM and LLD builds.
fn llvm_cmake_invocation(
    layout: &ProjectLayout,
    config: &BuildConfig,
    host: &HostPlatform,
    build_type: &str,
) -> CMakeInvocation {
    let mut cmake = CMakeInvocation::new(&layout.source_dir, &layout.build_dir);
    cmake
        .define_path("CMAKE_INSTALL_PREFIX", &config.sdk_dir)
        .define("CMAKE_BUILD_TYPE", build_type);
    if let Some(cxx) = &config.clang_plus_plus_path {
        cmake.define_path("CMAKE_CXX_COMPILER", cxx);
    }
    if let Some(cc) = &config.clang_path {
        cmake.define_path("CMAKE_C_COMPILER", cc);
    }
    cmake
        .define("LLVM_TOOL_LLDB_BUILD", "OFF")
        .define("CLANG_ENABLE_STATIC_ANALYZER", "OFF")
        .define("CLANG_ENABLE_ARCMT", "OFF");
    if host.is_freebsd() {
        cmake
            .define_path("DEFAULT_SYSROOT", &config.sdk_sysroot_dir())
            .define("LLVM_DEFAULT_TARGET_TRIPLE", "cheri-unknown-freebsd");
    }
    if config.cheri_bits == CheriBits::Bits128 {
        cmake.define("LLVM_CHERI_IS_128", "ON");
    }
    cmake
}

/// Check the configured host clang against `required`. Both compilers must
/// be configured; a missing one is named in the outcome.
pub fn host_clang_outcome(required: Version, ctx: &BuildContext<'_>) -> Result<DependencyOutcome> {
    let config = ctx.config;
    for (name, path) in [("clang", &config.clang_path), ("clang++", &config.clang_plus_plus_path)] {
        if path.is_none() {
            return Ok(DependencyOutcome::Missing {
                reason: format!("{name} is not configured and was not found on PATH"),
                remediation: Some(clang_install_hint(ctx.host, &required)),
            });
        }
    }
    VersionGate::clang(config.clang_path.clone(), required, ctx.host).check(ctx.runner)
}

fn check_host_clang(project: &str, required: Version, ctx: &BuildContext<'_>) -> Result<()> {
    let found = host_clang_outcome(required, ctx)?.into_result(project)?;
    info!("{project}: host clang {found} is new enough");
    Ok(())
}

fn configure_cmake(cmake: &CMakeInvocation, ctx: &BuildContext<'_>) -> Result<()> {
    fsops::create_dir_all(&cmake.build_dir, ctx.pretend())?;
    ctx.runner.run(&cmake.command())?;
    Ok(())
}

/// Files the install step deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub files: Vec<PathBuf>,
    pub pretend: bool,
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.pretend { "would remove" } else { "removed" };
        for file in &self.files {
            writeln!(f, "{verb} {}", file.display())?;
        }
        Ok(())
    }
}

/// Builtin headers that clash with the CheriBSD libc:
/// `lib/clang/*/include/std*` and `lib/clang/*/include/limits.h`.
pub fn find_incompatible_headers(install_dir: &Path) -> Vec<PathBuf> {
    let clang_lib = install_dir.join("lib/clang");
    let mut found: Vec<PathBuf> = WalkDir::new(&clang_lib)
        .min_depth(3)
        .max_depth(3)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let in_include = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|dir| dir == "include");
            let name = entry.file_name().to_string_lossy();
            in_include && (name.starts_with("std") || name == "limits.h")
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Delete the incompatible builtin headers below `install_dir`.
///
/// Finding none means the install layout changed and is an error, also in
/// pretend mode, where nothing is deleted.
pub fn remove_incompatible_headers(install_dir: &Path, pretend: bool) -> Result<CleanupReport> {
    let files = find_incompatible_headers(install_dir);
    if files.is_empty() {
        return Err(BuildError::UpstreamLayout {
            detail: format!(
                "could not find incompatible builtin includes below {}. Build system changed?",
                install_dir.join("lib/clang").display()
            ),
        });
    }
    info!("removing incompatible builtin includes");
    for file in &files {
        fsops::remove_file(file, pretend)?;
    }
    Ok(CleanupReport { files, pretend })
}

/// Link `<prefix><tool_name>` to `tool_name` in `bin_dir` for every triple
/// prefix.
pub fn create_target_symlinks(bin_dir: &Path, tool_name: &str, pretend: bool) -> Result<()> {
    for prefix in TRIPLE_PREFIXES {
        let link = bin_dir.join(format!("{prefix}{tool_name}"));
        fsops::create_symlink(Path::new(tool_name), &link, pretend)?;
    }
    Ok(())
}

/// LLVM and Clang from the CHERI repositories, installed into the SDK.
#[derive(Debug, Clone)]
pub struct BuildLlvm {
    pub layout: ProjectLayout,
    pub install_dir: PathBuf,
    pub components: Vec<SubComponent>,
    pub build_type: String,
}

impl BuildLlvm {
    pub const NAME: &'static str = "llvm";

    /// Oldest host clang that can build this tree.
    pub fn required_clang() -> Version {
        Version::new(3, 7, 0)
    }

    pub fn new(config: &BuildConfig, options: &LlvmOptions) -> Self {
        let components = vec![
            SubComponent {
                name: "llvm",
                subdir: None,
                source: GitSource::new("https://github.com/CTSRD-CHERI/llvm.git")
                    .with_revision(options.llvm_git_revision.clone()),
                enabled: true,
            },
            SubComponent {
                name: "clang",
                subdir: Some("tools/clang"),
                source: GitSource::new("https://github.com/CTSRD-CHERI/clang.git")
                    .with_revision(options.clang_git_revision.clone()),
                enabled: true,
            },
            // LLDB does not build for CHERI yet.
            SubComponent {
                name: "lldb",
                subdir: Some("tools/lldb"),
                source: GitSource::new("https://github.com/CTSRD-CHERI/lldb.git")
                    .with_revision(options.lldb_git_revision.clone())
                    .with_initial_branch("master"),
                enabled: false,
            },
        ];
        Self {
            layout: ProjectLayout::for_project(config, Self::NAME),
            install_dir: config.sdk_dir.clone(),
            components,
            build_type: options.cmake_build_type.clone(),
        }
    }

    pub fn cmake_invocation(&self, config: &BuildConfig, host: &HostPlatform) -> CMakeInvocation {
        llvm_cmake_invocation(&self.layout, config, host, &self.build_type)
    }

    fn post_install(&self, pretend: bool) -> Result<()> {
        if pretend && !self.install_dir.join("lib/clang").exists() {
            warn!(
                "{} was not installed (pretend), skipping builtin header cleanup",
                self.install_dir.join("lib/clang").display()
            );
        } else {
            let report = remove_incompatible_headers(&self.install_dir, pretend)?;
            info!("{}", report.to_string().trim_end());
        }
        let bin_dir = self.install_dir.join("bin");
        for tool in LLVM_TOOLS {
            create_target_symlinks(&bin_dir, tool, pretend)?;
        }
        Ok(())
    }
}

impl Project for BuildLlvm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check_system_dependencies(&self, ctx: &BuildContext<'_>) -> Result<()> {
        check_host_clang(Self::NAME, Self::required_clang(), ctx)
    }

    fn update(&self, ctx: &BuildContext<'_>) -> Result<()> {
        update_components(&self.components, &self.layout.source_dir, ctx)
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<()> {
        configure_cmake(&self.cmake_invocation(ctx.config, ctx.host), ctx)
    }

    fn compile(&self, ctx: &BuildContext<'_>) -> Result<()> {
        ctx.runner.run(&make::build(ctx.config, &self.layout.build_dir, &[]))?;
        Ok(())
    }

    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        ctx.runner.run(&make::install(&self.layout.build_dir, None))?;
        self.post_install(ctx.pretend())
    }
}

/// The LLD linker, built from an LLVM tree and installed as `ld.lld`.
#[derive(Debug, Clone)]
pub struct BuildLld {
    pub layout: ProjectLayout,
    pub sdk_bin_dir: PathBuf,
    pub components: Vec<SubComponent>,
}

impl BuildLld {
    pub const NAME: &'static str = "lld";

    /// Oldest host clang that can build LLD.
    pub fn required_clang() -> Version {
        Version::new(3, 8, 0)
    }

    pub fn new(config: &BuildConfig, options: &LldOptions) -> Self {
        let components = vec![
            SubComponent {
                name: "llvm",
                subdir: None,
                source: GitSource::new("https://github.com/llvm-mirror/llvm.git")
                    .with_revision(options.llvm_git_revision.clone()),
                enabled: true,
            },
            SubComponent {
                name: "lld",
                subdir: Some("tools/lld"),
                source: GitSource::new("https://github.com/RichardsonAlex/lld.git")
                    .with_revision(options.lld_git_revision.clone())
                    .with_initial_branch("cheri"),
                enabled: true,
            },
        ];
        Self {
            layout: ProjectLayout::for_project(config, "lld-llvm"),
            sdk_bin_dir: config.sdk_bin_dir(),
            components,
        }
    }

    pub fn cmake_invocation(&self, config: &BuildConfig, host: &HostPlatform) -> CMakeInvocation {
        let mut cmake = llvm_cmake_invocation(&self.layout, config, host, "Release");
        cmake.define("LLVM_TOOL_LLD_BUILD", "ON");
        cmake
    }
}

impl Project for BuildLld {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check_system_dependencies(&self, ctx: &BuildContext<'_>) -> Result<()> {
        check_host_clang(Self::NAME, Self::required_clang(), ctx)
    }

    fn update(&self, ctx: &BuildContext<'_>) -> Result<()> {
        update_components(&self.components, &self.layout.source_dir, ctx)
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<()> {
        configure_cmake(&self.cmake_invocation(ctx.config, ctx.host), ctx)
    }

    fn compile(&self, ctx: &BuildContext<'_>) -> Result<()> {
        ctx.runner
            .run(&make::build(ctx.config, &self.layout.build_dir, &["lld"]))?;
        Ok(())
    }

    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let pretend = ctx.pretend();
        fsops::install_file(
            &self.layout.build_dir.join("bin/lld"),
            &self.sdk_bin_dir.join("ld.lld"),
            pretend,
        )?;
        fsops::create_symlink(Path::new("ld.lld"), &self.sdk_bin_dir.join("lld"), pretend)?;
        create_target_symlinks(&self.sdk_bin_dir, "ld.lld", pretend)
    }
}

//! `cheribuild.toml` parsing and build configuration.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cheri_build::{BuildSystem, CrossCompileOptions, LldOptions, LlvmOptions};
use cheri_targets::{BuildConfig, CheriBits};
use serde::{Deserialize, Serialize};

/// File name searched for from the current directory upward.
pub const MANIFEST_FILE: &str = "cheribuild.toml";

/// The top-level manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheribuildManifest {
    /// Directory layout and host tools.
    #[serde(default)]
    pub config: ConfigSection,
    /// Revision pins for the LLVM build.
    #[serde(default)]
    pub llvm: LlvmOptions,
    /// Revision pins for the LLD build.
    #[serde(default)]
    pub lld: LldOptions,
    /// Cross-compiled projects, by name.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSpec>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConfigSection {
    pub source_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub build_root: Option<PathBuf>,
    pub sdk_dir: Option<PathBuf>,
    pub rootfs_dir: Option<PathBuf>,
    pub cheri_bits: CheriBits,
    pub make_jobs: Option<u32>,
    pub clang_path: Option<PathBuf>,
    pub clang_plus_plus_path: Option<PathBuf>,
}

/// A `[projects.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectSpec {
    pub build_system: BuildSystem,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub initial_branch: Option<String>,
    /// Defaults to `<source-root>/<name>`.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    /// Defaults to `<rootfs>/extra/<name>`; relative paths are below the rootfs.
    #[serde(default)]
    pub install_directory: Option<PathBuf>,
    #[serde(default = "default_cmake_build_type")]
    pub cmake_build_type: String,
    /// Replacement for the bundled CMake toolchain template.
    #[serde(default)]
    pub toolchain_template: Option<PathBuf>,
    /// Extra arguments for cmake or configure.
    #[serde(default)]
    pub configure_args: Vec<String>,
    #[serde(flatten)]
    pub options: CrossCompileOptions,
}

fn default_cmake_build_type() -> String {
    "Debug".to_string()
}

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub pretend: bool,
    pub cheri_bits: Option<u32>,
    pub make_jobs: Option<u32>,
}

impl CheribuildManifest {
    /// Search upward from `start_dir` for a `cheribuild.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing cheribuild.toml")
    }

    /// Resolve the build configuration. Relative paths are taken relative to
    /// `base_dir`, the manifest's directory.
    pub fn build_config(&self, base_dir: &Path, overrides: Overrides) -> Result<BuildConfig> {
        let section = &self.config;
        let source_root = match &section.source_root {
            Some(root) => absolute(base_dir, root),
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join("cheri"))
                .context("HOME is not set; configure source-root in cheribuild.toml")?,
        };
        let output_root = section
            .output_root
            .as_ref()
            .map(|p| absolute(base_dir, p))
            .unwrap_or_else(|| source_root.join("output"));
        let cheri_bits = match overrides.cheri_bits {
            Some(bits) => CheriBits::try_from(bits)?,
            None => section.cheri_bits,
        };

        let mut config = BuildConfig::new(source_root, output_root, cheri_bits);
        if let Some(build_root) = &section.build_root {
            config.build_root = absolute(base_dir, build_root);
        }
        if let Some(sdk_dir) = &section.sdk_dir {
            config.sdk_dir = absolute(base_dir, sdk_dir);
        }
        if let Some(rootfs_dir) = &section.rootfs_dir {
            config.rootfs_dir = absolute(base_dir, rootfs_dir);
        }
        config.pretend = overrides.pretend;
        config.make_jobs = overrides
            .make_jobs
            .or(section.make_jobs)
            .unwrap_or_else(default_make_jobs);
        let search_path = std::env::var_os("PATH");
        config.clang_path = resolve_tool(
            section.clang_path.as_deref(),
            "clang",
            search_path.as_deref(),
            base_dir,
        );
        config.clang_plus_plus_path = resolve_tool(
            section.clang_plus_plus_path.as_deref(),
            "clang++",
            search_path.as_deref(),
            base_dir,
        );
        Ok(config)
    }

    /// Generate the default template for `cheribuild init`.
    pub fn template() -> String {
        r#"[config]
# source-root = "~/cheri"
# output-root = "~/cheri/output"
cheri-bits = 256

[llvm]
# llvm-git-revision = ""
# clang-git-revision = ""

[lld]
# lld-git-revision = ""

# [projects.zlib]
# build-system = "autotools"
# repository = "https://github.com/CTSRD-CHERI/zlib.git"
# optimization-flags = ["-O2"]
"#
        .to_string()
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn default_make_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Locate a host tool. A configured value is tried relative to `base_dir`,
/// then on `search_path`; without one, `default_name` is looked up on
/// `search_path`. Only executables count. A configured value that resolves
/// to nothing is kept as given so the dependency check can name it.
fn resolve_tool(
    configured: Option<&Path>,
    default_name: &str,
    search_path: Option<&OsStr>,
    base_dir: &Path,
) -> Option<PathBuf> {
    match configured {
        Some(path) => {
            let candidate = absolute(base_dir, path);
            which::which_in(&candidate, search_path, base_dir)
                .or_else(|_| which::which_in(path, search_path, base_dir))
                .ok()
                .or(Some(candidate))
        }
        None => which::which_in(default_name, search_path, base_dir).ok(),
    }
}

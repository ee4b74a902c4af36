//! Process-wide build configuration.
//!
//! Populated once at startup from the manifest and command line, then only
//! ever read.

use std::path::PathBuf;

use crate::arch::CheriBits;

/// Shared, read-only configuration for every project built in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Root under which project sources are checked out.
    pub source_root: PathBuf,
    /// Root for produced artifacts (SDK, rootfs images).
    pub output_root: PathBuf,
    /// Root under which per-project build directories are created.
    pub build_root: PathBuf,
    /// The CHERI SDK (toolchain binaries and sysroot).
    pub sdk_dir: PathBuf,
    /// Root of the base-system rootfs cross-compiled projects install into.
    pub rootfs_dir: PathBuf,
    /// Capability width the SDK targets.
    pub cheri_bits: CheriBits,
    /// Dry-run mode: every decision is made, no mutation happens.
    pub pretend: bool,
    /// Parallelism passed to make.
    pub make_jobs: u32,
    /// Host C compiler used to bootstrap the toolchain.
    pub clang_path: Option<PathBuf>,
    /// Host C++ compiler used to bootstrap the toolchain.
    pub clang_plus_plus_path: Option<PathBuf>,
}

impl BuildConfig {
    /// Create a configuration with every derived directory at its default
    /// location below `source_root` and `output_root`.
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, cheri_bits: CheriBits) -> Self {
        let source_root = source_root.into();
        let output_root = output_root.into();
        Self {
            build_root: source_root.clone(),
            sdk_dir: output_root.join(format!("sdk{cheri_bits}")),
            rootfs_dir: output_root.join(format!("rootfs{cheri_bits}")),
            source_root,
            output_root,
            cheri_bits,
            pretend: false,
            make_jobs: 1,
            clang_path: None,
            clang_plus_plus_path: None,
        }
    }

    /// `<sdk>/bin`.
    pub fn sdk_bin_dir(&self) -> PathBuf {
        self.sdk_dir.join("bin")
    }

    /// `<sdk>/sysroot`.
    pub fn sdk_sysroot_dir(&self) -> PathBuf {
        self.sdk_dir.join("sysroot")
    }

    /// The `-jN` flag handed to make.
    pub fn make_j_flag(&self) -> String {
        format!("-j{}", self.make_jobs.max(1))
    }

    /// Default source checkout for a project.
    pub fn source_dir(&self, project: &str) -> PathBuf {
        self.source_root.join(project)
    }

    /// Build directory for a project, suffixed with the capability width.
    pub fn build_dir(&self, project: &str) -> PathBuf {
        self.build_root
            .join(format!("{project}-{}-build", self.cheri_bits))
    }
}

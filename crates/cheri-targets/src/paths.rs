//! Toolchain path resolution.
//!
//! Pure path arithmetic: nothing here touches the filesystem, so resolving
//! the same inputs twice always produces the same [`PathSet`].

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::config::BuildConfig;
use crate::error::{Result, TargetError};

/// Every filesystem location a cross build needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathSet {
    /// `<sdk>/bin`, passed to the compiler driver via `-B`.
    pub sdk_bin_dir: PathBuf,
    /// `<sdk>/sysroot`.
    pub sdk_sysroot: PathBuf,
    /// Directory holding the triple-prefixed compiler drivers.
    pub compiler_dir: PathBuf,
    /// Install directory as seen from inside the target system.
    pub install_prefix: PathBuf,
    /// Staging root that `install_prefix` is installed below.
    pub destdir: PathBuf,
}

impl PathSet {
    /// Resolve the path set for a project installing into `install_dir`.
    ///
    /// `install_dir` must be inside `rootfs_root`; its location relative to the
    /// rootfs, re-rooted at `/`, becomes the install prefix.
    pub fn resolve(config: &BuildConfig, rootfs_root: &Path, install_dir: &Path) -> Result<Self> {
        let relative = lexically_relative(install_dir, rootfs_root).ok_or_else(|| {
            TargetError::InstallDirOutsideRootfs {
                install_dir: install_dir.to_path_buf(),
                rootfs: rootfs_root.to_path_buf(),
            }
        })?;
        let sdk_bin_dir = config.sdk_bin_dir();
        Ok(Self {
            compiler_dir: sdk_bin_dir.clone(),
            sdk_bin_dir,
            sdk_sysroot: config.sdk_sysroot_dir(),
            install_prefix: Path::new("/").join(relative),
            destdir: rootfs_root.to_path_buf(),
        })
    }
}

/// Default install directory for a cross-compiled project:
/// `<rootfs>/extra/<lowercased project name>`.
pub fn default_install_dir(rootfs_root: &Path, project_name: &str) -> PathBuf {
    rootfs_root.join("extra").join(project_name.to_lowercase())
}

/// `path` relative to `base`, refusing anything that escapes `base` through
/// `..` components.
fn lexically_relative(path: &Path, base: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(base).ok()?;
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }
    Some(relative.to_path_buf())
}

//! Pretend-aware filesystem mutations.
//!
//! Each helper logs what it does; with `pretend` set it only logs.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// Write `contents` to `path`, creating parent directories and overwriting
/// an existing file.
pub fn write_file(path: &Path, contents: &str, pretend: bool) -> Result<()> {
    if pretend {
        info!("(pretend) write {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
    }
    debug!("writing {}", path.display());
    fs::write(path, contents).map_err(BuildError::io(path))
}

/// Create a directory and its parents.
pub fn create_dir_all(path: &Path, pretend: bool) -> Result<()> {
    if pretend {
        info!("(pretend) mkdir -p {}", path.display());
        return Ok(());
    }
    fs::create_dir_all(path).map_err(BuildError::io(path))
}

/// Remove a single file or symlink.
pub fn remove_file(path: &Path, pretend: bool) -> Result<()> {
    if pretend {
        info!("(pretend) rm {}", path.display());
        return Ok(());
    }
    debug!("rm {}", path.display());
    fs::remove_file(path).map_err(BuildError::io(path))
}

/// Remove a directory tree if it exists.
pub fn remove_dir_all(path: &Path, pretend: bool) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if pretend {
        info!("(pretend) rm -rf {}", path.display());
        return Ok(());
    }
    debug!("rm -rf {}", path.display());
    fs::remove_dir_all(path).map_err(BuildError::io(path))
}

/// Create `link` pointing at `target`, replacing whatever `link` was.
pub fn create_symlink(target: &Path, link: &Path, pretend: bool) -> Result<()> {
    if pretend {
        info!("(pretend) ln -fsn {} {}", target.display(), link.display());
        return Ok(());
    }
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(BuildError::io(link))?;
    }
    debug!("ln -fsn {} {}", target.display(), link.display());
    std::os::unix::fs::symlink(target, link).map_err(BuildError::io(link))
}

/// Copy `source` to `destination`, overwriting it.
pub fn install_file(source: &Path, destination: &Path, pretend: bool) -> Result<()> {
    if pretend {
        info!("(pretend) install {} {}", source.display(), destination.display());
        return Ok(());
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
    }
    if fs::symlink_metadata(destination).is_ok() {
        fs::remove_file(destination).map_err(BuildError::io(destination))?;
    }
    debug!("install {} {}", source.display(), destination.display());
    fs::copy(source, destination).map_err(BuildError::io(source))?;
    Ok(())
}

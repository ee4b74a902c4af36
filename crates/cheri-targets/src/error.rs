//! Error types for target and path resolution.

use std::path::PathBuf;

/// Errors that can occur while resolving targets and toolchain paths.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The install directory does not live inside the rootfs it is meant to be
    /// installed into.
    #[error(
        "install directory {} is not inside the rootfs {}",
        install_dir.display(),
        rootfs.display()
    )]
    InstallDirOutsideRootfs {
        /// The configured install directory.
        install_dir: PathBuf,
        /// The rootfs root it was expected under.
        rootfs: PathBuf,
    },

    /// Unknown target architecture name.
    #[error("unknown target '{name}' (expected `cheri` or `mips64`)")]
    UnknownArch {
        /// The rejected name.
        name: String,
    },

    /// Unsupported CHERI capability width.
    #[error("unsupported CHERI bit width {bits} (expected 128 or 256)")]
    UnsupportedBits {
        /// The rejected width.
        bits: u32,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;

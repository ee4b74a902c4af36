//! Target, host and toolchain path model for CHERI cross-compilation.
//!
//! A cross build is described by three layers:
//! - **Target:** which MIPS variant is produced (`cheri` or `mips64`) and the
//!   triple, ABI flag and linker emulation that follow from it
//! - **Configuration:** where sources, builds, the SDK and the rootfs live
//! - **Paths:** the per-project [`PathSet`] derived from the two above

pub mod arch;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod paths;

pub use arch::{CheriBits, TargetArch};
pub use config::BuildConfig;
pub use descriptor::TargetDescriptor;
pub use error::{Result, TargetError};
pub use host::HostPlatform;
pub use paths::{default_install_dir, PathSet};

//! Target descriptor derived once per project from its configured architecture.

use serde::Serialize;

use crate::arch::TargetArch;

/// Operating system component shared by every target triple.
const TRIPLE_SUFFIX: &str = "unknown-freebsd";

/// Immutable description of the cross-compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetDescriptor {
    /// Target architecture.
    pub architecture: TargetArch,
    /// Target triple, e.g. `cheri-unknown-freebsd`.
    pub triple: String,
    /// ABI selection flag, only present for the capability-extended variant.
    pub abi_flag: Option<String>,
}

impl TargetDescriptor {
    /// Derive the descriptor for an architecture.
    pub fn new(architecture: TargetArch) -> Self {
        let abi_flag = architecture.is_cheri().then(|| "-mabi=sandbox".to_string());
        Self {
            architecture,
            triple: format!("{}-{TRIPLE_SUFFIX}", architecture.as_str()),
            abi_flag,
        }
    }

    /// Linker emulation passed through `-Wl,-m<emulation>`.
    pub fn linker_emulation(&self) -> &'static str {
        match self.architecture {
            TargetArch::Cheri => "elf64btsmip_cheri_fbsd",
            TargetArch::Mips64 => "elf64btsmip_fbsd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheri_descriptor() {
        let t = TargetDescriptor::new(TargetArch::Cheri);
        assert_eq!(t.triple, "cheri-unknown-freebsd");
        assert_eq!(t.abi_flag.as_deref(), Some("-mabi=sandbox"));
        assert_eq!(t.linker_emulation(), "elf64btsmip_cheri_fbsd");
    }

    #[test]
    fn mips64_descriptor() {
        let t = TargetDescriptor::new(TargetArch::Mips64);
        assert_eq!(t.triple, "mips64-unknown-freebsd");
        assert!(t.abi_flag.is_none());
        assert_eq!(t.linker_emulation(), "elf64btsmip_fbsd");
    }
}

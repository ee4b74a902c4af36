//! Target architecture and CHERI capability width.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TargetError;

/// The CPU variant a project is cross-compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    /// The capability-extended MIPS variant (pure-capability sandbox ABI).
    #[default]
    Cheri,
    /// Plain 64-bit MIPS.
    Mips64,
}

impl TargetArch {
    /// Name used in target triples and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetArch::Cheri => "cheri",
            TargetArch::Mips64 => "mips64",
        }
    }

    /// Whether this is the capability-extended variant.
    pub fn is_cheri(&self) -> bool {
        matches!(self, TargetArch::Cheri)
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetArch {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cheri" => Ok(TargetArch::Cheri),
            "mips64" => Ok(TargetArch::Mips64),
            other => Err(TargetError::UnknownArch { name: other.into() }),
        }
    }
}

/// Capability width of the CHERI hardware the SDK is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CheriBits {
    /// 128-bit compressed capabilities.
    Bits128,
    /// 256-bit capabilities.
    #[default]
    Bits256,
}

impl CheriBits {
    /// Width in bits.
    pub fn bits(&self) -> u32 {
        match self {
            CheriBits::Bits128 => 128,
            CheriBits::Bits256 => 256,
        }
    }
}

impl fmt::Display for CheriBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl TryFrom<u32> for CheriBits {
    type Error = TargetError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            128 => Ok(CheriBits::Bits128),
            256 => Ok(CheriBits::Bits256),
            other => Err(TargetError::UnsupportedBits { bits: other }),
        }
    }
}

impl From<CheriBits> for u32 {
    fn from(bits: CheriBits) -> u32 {
        bits.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_round_trips_through_str() {
        for arch in [TargetArch::Cheri, TargetArch::Mips64] {
            assert_eq!(arch.as_str().parse::<TargetArch>().unwrap(), arch);
        }
    }

    #[test]
    fn unknown_arch_rejected() {
        let err = "riscv64".parse::<TargetArch>().unwrap_err();
        assert!(matches!(err, TargetError::UnknownArch { .. }));
    }

    #[test]
    fn default_arch_is_cheri() {
        assert!(TargetArch::default().is_cheri());
        assert!(!TargetArch::Mips64.is_cheri());
    }

    #[test]
    fn bits_from_integer() {
        assert_eq!(CheriBits::try_from(128).unwrap(), CheriBits::Bits128);
        assert_eq!(CheriBits::try_from(256).unwrap(), CheriBits::Bits256);
        assert!(CheriBits::try_from(64).is_err());
    }

    #[test]
    fn bits_deserialize_from_number() {
        let bits: CheriBits = serde_json::from_str("128").unwrap();
        assert_eq!(bits, CheriBits::Bits128);
        assert!(serde_json::from_str::<CheriBits>("512").is_err());
        assert_eq!(serde_json::to_string(&CheriBits::Bits256).unwrap(), "256");
    }
}

//! Per-project cross-compilation options.
//!
//! Deserialized from the `[projects.<name>]` tables of the manifest; the
//! kebab-case field names are the user-facing option names.

use serde::{Deserialize, Serialize};

use cheri_targets::TargetArch;

/// Which generic build system drives a cross-compiled project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    /// CMake with a generated toolchain file.
    Cmake,
    /// An autoconf `configure` script driven through the environment.
    Autotools,
}

/// Options shared by every cross-compiled project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrossCompileOptions {
    /// Compile without `-mxgot`.
    pub no_use_mxgot: bool,
    /// Linker passed to `-fuse-ld=`.
    pub linker: String,
    /// Link dynamically instead of passing `-static`.
    pub link_dynamic: bool,
    /// Optimization flags, in order.
    pub optimization_flags: Vec<String>,
    /// Architecture to build for.
    pub target: TargetArch,
    /// Extra flags for C compilation only.
    pub c_flags: Vec<String>,
    /// Extra flags for C++ compilation only.
    pub cxx_flags: Vec<String>,
    /// Extra flags for assembler invocations only.
    pub asm_flags: Vec<String>,
}

impl Default for CrossCompileOptions {
    fn default() -> Self {
        Self {
            no_use_mxgot: false,
            linker: "lld".into(),
            link_dynamic: false,
            optimization_flags: vec!["-O0".into()],
            target: TargetArch::Cheri,
            c_flags: Vec::new(),
            cxx_flags: Vec::new(),
            asm_flags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CrossCompileOptions::default();
        assert_eq!(options.linker, "lld");
        assert_eq!(options.optimization_flags, vec!["-O0"]);
        assert_eq!(options.target, TargetArch::Cheri);
        assert!(!options.no_use_mxgot);
        assert!(!options.link_dynamic);
    }

    #[test]
    fn parse_kebab_case_options() {
        let options: CrossCompileOptions = toml::from_str(
            r#"
no-use-mxgot = true
linker = "bfd"
link-dynamic = true
optimization-flags = ["-O2", "-fno-inline"]
target = "mips64"
"#,
        )
        .unwrap();
        assert!(options.no_use_mxgot);
        assert_eq!(options.linker, "bfd");
        assert!(options.link_dynamic);
        assert_eq!(options.optimization_flags, vec!["-O2", "-fno-inline"]);
        assert_eq!(options.target, TargetArch::Mips64);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let options: CrossCompileOptions = toml::from_str("linker = \"bfd\"").unwrap();
        assert_eq!(options.optimization_flags, vec!["-O0"]);
        assert_eq!(options.target, TargetArch::Cheri);
    }

    #[test]
    fn unknown_target_rejected() {
        assert!(toml::from_str::<CrossCompileOptions>("target = \"x86\"").is_err());
    }
}

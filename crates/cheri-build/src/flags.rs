//! Compiler and linker flag composition.
//!
//! Flag order is significant (a later flag can override an earlier one) and
//! nothing is ever de-duplicated.

use serde::Serialize;

use cheri_targets::{PathSet, TargetDescriptor};

use crate::options::CrossCompileOptions;

/// Warning policy applied to every configure-style build.
pub const WARNING_FLAGS: &[&str] = &[
    "-Wall",
    "-Werror=cheri-capability-misuse",
    "-Werror=implicit-function-declaration",
    "-Werror=format",
    "-Werror=undefined-internal",
    "-Werror=incompatible-pointer-types",
];

/// Baseline flags every cross compilation starts with.
const BASELINE_FLAGS: &[&str] = &["-integrated-as", "-pipe", "-msoft-float", "-G0", "-g"];

/// Ordered flag lists, one per class of flags a build system distinguishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlagSet {
    pub common: Vec<String>,
    pub c: Vec<String>,
    pub cxx: Vec<String>,
    pub asm: Vec<String>,
    pub ld: Vec<String>,
}

/// Flag sets handed to a `configure` script through the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigureFlags {
    pub cppflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
}

/// Builds the [`FlagSet`] for one target/option/path combination.
#[derive(Debug, Clone, Copy)]
pub struct FlagComposer<'a> {
    target: &'a TargetDescriptor,
    options: &'a CrossCompileOptions,
    paths: &'a PathSet,
}

impl<'a> FlagComposer<'a> {
    pub fn new(target: &'a TargetDescriptor, options: &'a CrossCompileOptions, paths: &'a PathSet) -> Self {
        Self {
            target,
            options,
            paths,
        }
    }

    /// Compose all flag classes.
    pub fn compose(&self) -> FlagSet {
        FlagSet {
            common: self.common_flags(),
            c: self.options.c_flags.clone(),
            cxx: self.options.cxx_flags.clone(),
            asm: self.options.asm_flags.clone(),
            ld: self.linker_flags(),
        }
    }

    /// Baseline, then the ABI flag for CHERI, then `-mxgot` unless disabled.
    pub fn common_flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = BASELINE_FLAGS.iter().map(|f| f.to_string()).collect();
        if let Some(abi) = &self.target.abi_flag {
            flags.push(abi.clone());
        }
        if !self.options.no_use_mxgot {
            flags.push("-mxgot".into());
        }
        flags
    }

    /// Emulation, linker, sysroot, bindir and (unless linking dynamically)
    /// `-static`.
    pub fn linker_flags(&self) -> Vec<String> {
        let mut flags = vec![
            format!("-Wl,-m{}", self.target.linker_emulation()),
            format!("-fuse-ld={}", self.options.linker),
            format!("--sysroot={}", self.paths.sdk_sysroot.display()),
            format!("-B{}", self.paths.sdk_bin_dir.display()),
        ];
        if !self.options.link_dynamic {
            flags.push("-static".into());
        }
        flags
    }
}

/// COMMON flags as written into a CMake toolchain file: the composed set
/// followed by `-B<sdk>/bin`.
pub fn cmake_common_flags(flags: &FlagSet, paths: &PathSet) -> Vec<String> {
    let mut common = flags.common.clone();
    common.push(format!("-B{}", paths.sdk_bin_dir.display()));
    common
}

/// Flags for a configure-style build.
///
/// COMMON gains sysroot, bindir and an explicit `-target`; the preprocessor
/// flags are COMMON + warnings + optimization, and CFLAGS/CXXFLAGS append the
/// per-language extras to those.
pub fn configure_flags(
    flags: &FlagSet,
    target: &TargetDescriptor,
    options: &CrossCompileOptions,
    paths: &PathSet,
) -> ConfigureFlags {
    let mut cppflags = flags.common.clone();
    cppflags.extend([
        format!("--sysroot={}", paths.sdk_sysroot.display()),
        format!("-B{}", paths.sdk_bin_dir.display()),
        "-target".to_string(),
        target.triple.clone(),
    ]);
    cppflags.extend(WARNING_FLAGS.iter().map(|f| f.to_string()));
    cppflags.extend(options.optimization_flags.iter().cloned());

    let cflags = [cppflags.as_slice(), flags.c.as_slice()].concat();
    let cxxflags = [cppflags.as_slice(), flags.cxx.as_slice()].concat();
    ConfigureFlags {
        cppflags,
        cflags,
        cxxflags,
        ldflags: flags.ld.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheri_targets::{BuildConfig, CheriBits, TargetArch};

    fn paths() -> PathSet {
        let config = BuildConfig::new("/src", "/out", CheriBits::Bits256);
        let install = config.rootfs_dir.join("extra/demo");
        PathSet::resolve(&config, &config.rootfs_dir, &install).unwrap()
    }

    fn compose(arch: TargetArch, options: &CrossCompileOptions) -> FlagSet {
        let target = TargetDescriptor::new(arch);
        let paths = paths();
        FlagComposer::new(&target, options, &paths).compose()
    }

    #[test]
    fn cheri_common_flags_in_order() {
        let flags = compose(TargetArch::Cheri, &CrossCompileOptions::default());
        assert_eq!(
            flags.common,
            vec!["-integrated-as", "-pipe", "-msoft-float", "-G0", "-g", "-mabi=sandbox", "-mxgot"]
        );
    }

    #[test]
    fn abi_flag_only_for_cheri() {
        let options = CrossCompileOptions::default();
        let count = |flags: &FlagSet| flags.common.iter().filter(|f| f.starts_with("-mabi=")).count();
        assert_eq!(count(&compose(TargetArch::Cheri, &options)), 1);
        assert_eq!(count(&compose(TargetArch::Mips64, &options)), 0);
    }

    #[test]
    fn disabling_mxgot_removes_only_mxgot() {
        let with = compose(TargetArch::Cheri, &CrossCompileOptions::default());
        let without = compose(
            TargetArch::Cheri,
            &CrossCompileOptions {
                no_use_mxgot: true,
                ..Default::default()
            },
        );
        let mut expected = with.common.clone();
        expected.retain(|f| f != "-mxgot");
        assert_eq!(without.common, expected);
        assert_eq!(without.ld, with.ld);
    }

    #[test]
    fn linker_flags_static_by_default() {
        let flags = compose(TargetArch::Cheri, &CrossCompileOptions::default());
        assert_eq!(
            flags.ld,
            vec![
                "-Wl,-melf64btsmip_cheri_fbsd",
                "-fuse-ld=lld",
                "--sysroot=/out/sdk256/sysroot",
                "-B/out/sdk256/bin",
                "-static",
            ]
        );
    }

    #[test]
    fn dynamic_mips64_link() {
        let options = CrossCompileOptions {
            link_dynamic: true,
            linker: "bfd".into(),
            ..Default::default()
        };
        let flags = compose(TargetArch::Mips64, &options);
        assert_eq!(flags.ld[0], "-Wl,-melf64btsmip_fbsd");
        assert_eq!(flags.ld[1], "-fuse-ld=bfd");
        assert!(!flags.ld.iter().any(|f| f == "-static"));
    }

    #[test]
    fn cmake_common_appends_bindir() {
        let paths = paths();
        let flags = compose(TargetArch::Cheri, &CrossCompileOptions::default());
        let common = cmake_common_flags(&flags, &paths);
        assert_eq!(common.len(), flags.common.len() + 1);
        assert_eq!(common.last().unwrap(), "-B/out/sdk256/bin");
    }

    #[test]
    fn configure_flags_layering() {
        let target = TargetDescriptor::new(TargetArch::Cheri);
        let paths = paths();
        let options = CrossCompileOptions {
            optimization_flags: vec!["-O2".into()],
            c_flags: vec!["-std=c99".into()],
            ..Default::default()
        };
        let flags = FlagComposer::new(&target, &options, &paths).compose();
        let configure = configure_flags(&flags, &target, &options, &paths);

        let common_len = flags.common.len();
        assert_eq!(&configure.cppflags[..common_len], flags.common.as_slice());
        assert_eq!(
            &configure.cppflags[common_len..common_len + 4],
            &["--sysroot=/out/sdk256/sysroot", "-B/out/sdk256/bin", "-target", "cheri-unknown-freebsd"]
        );
        assert_eq!(configure.cppflags.last().unwrap(), "-O2");
        assert!(configure.cppflags.iter().any(|f| f == "-Werror=format"));
        assert_eq!(configure.cflags.last().unwrap(), "-std=c99");
        assert_eq!(configure.cxxflags, configure.cppflags);
        assert_eq!(configure.ldflags, flags.ld);
    }
}

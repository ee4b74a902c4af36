//! Environment derivation for configure-style builds.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{BuildError, Result};
use crate::flags::ConfigureFlags;

/// Variables a cross `configure` run is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvKey {
    Cc,
    Cxx,
    Cppflags,
    Cflags,
    Cxxflags,
    Ldflags,
}

impl EnvKey {
    /// Every key, in the order they are reported.
    pub const ALL: [EnvKey; 6] = [
        EnvKey::Cc,
        EnvKey::Cxx,
        EnvKey::Cppflags,
        EnvKey::Cflags,
        EnvKey::Cxxflags,
        EnvKey::Ldflags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::Cc => "CC",
            EnvKey::Cxx => "CXX",
            EnvKey::Cppflags => "CPPFLAGS",
            EnvKey::Cflags => "CFLAGS",
            EnvKey::Cxxflags => "CXXFLAGS",
            EnvKey::Ldflags => "LDFLAGS",
        }
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete set of derived configure variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigureEnvironment {
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub flags: ConfigureFlags,
}

impl ConfigureEnvironment {
    /// Derive the variables for `triple`, using the triple-prefixed compiler
    /// drivers in `compiler_dir`.
    pub fn derive(flags: ConfigureFlags, compiler_dir: &Path, triple: &str) -> Self {
        Self {
            cc: compiler_dir.join(format!("{triple}-clang")),
            cxx: compiler_dir.join(format!("{triple}-clang++")),
            flags,
        }
    }

    /// Value of one variable; flag lists are joined with single spaces.
    pub fn value(&self, key: EnvKey) -> String {
        match key {
            EnvKey::Cc => self.cc.display().to_string(),
            EnvKey::Cxx => self.cxx.display().to_string(),
            EnvKey::Cppflags => self.flags.cppflags.join(" "),
            EnvKey::Cflags => self.flags.cflags.join(" "),
            EnvKey::Cxxflags => self.flags.cxxflags.join(" "),
            EnvKey::Ldflags => self.flags.ldflags.join(" "),
        }
    }

    /// Write every variable into `env`.
    ///
    /// `env` must not define any of the keys yet; on collision nothing is
    /// written.
    pub fn apply_to(&self, env: &mut BTreeMap<String, String>) -> Result<()> {
        if let Some(key) = EnvKey::ALL.iter().find(|k| env.contains_key(k.as_str())) {
            return Err(BuildError::EnvironmentCollision {
                key: key.as_str().to_string(),
            });
        }
        for key in EnvKey::ALL {
            env.insert(key.as_str().to_string(), self.value(key));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> ConfigureEnvironment {
        ConfigureEnvironment::derive(
            ConfigureFlags {
                cppflags: vec!["-g".into(), "-O0".into()],
                cflags: vec!["-g".into(), "-O0".into(), "-std=c99".into()],
                cxxflags: vec!["-g".into(), "-O0".into()],
                ldflags: vec!["-fuse-ld=lld".into(), "-static".into()],
            },
            Path::new("/sdk/bin"),
            "cheri-unknown-freebsd",
        )
    }

    #[test]
    fn derives_compilers_and_joined_flags() {
        let mut env = BTreeMap::new();
        environment().apply_to(&mut env).unwrap();
        assert_eq!(env["CC"], "/sdk/bin/cheri-unknown-freebsd-clang");
        assert_eq!(env["CXX"], "/sdk/bin/cheri-unknown-freebsd-clang++");
        assert_eq!(env["CPPFLAGS"], "-g -O0");
        assert_eq!(env["CFLAGS"], "-g -O0 -std=c99");
        assert_eq!(env["CXXFLAGS"], "-g -O0");
        assert_eq!(env["LDFLAGS"], "-fuse-ld=lld -static");
        assert_eq!(env.len(), 6);
    }

    #[test]
    fn keeps_unrelated_variables() {
        let mut env = BTreeMap::from([("PKG_CONFIG_PATH".to_string(), "/x".to_string())]);
        environment().apply_to(&mut env).unwrap();
        assert_eq!(env["PKG_CONFIG_PATH"], "/x");
        assert_eq!(env.len(), 7);
    }

    #[test]
    fn collision_fails_without_mutation() {
        let mut env = BTreeMap::from([
            ("CFLAGS".to_string(), "-O3".to_string()),
            ("LIBS".to_string(), "-lm".to_string()),
        ]);
        let before = env.clone();
        let err = environment().apply_to(&mut env).unwrap_err();
        assert!(matches!(err, BuildError::EnvironmentCollision { ref key } if key == "CFLAGS"));
        assert_eq!(env, before);
    }
}

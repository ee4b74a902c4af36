//! Generic autoconf `configure` invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::exec::CommandSpec;

/// Arguments and environment for running `<source>/configure` out of tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureInvocation {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub prefix: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ConfigureInvocation {
    /// The configure command, run in the build directory.
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(self.source_dir.join("configure"))
            .arg(format!("--prefix={}", self.prefix.display()))
            .args(self.args.iter().cloned())
            .envs(&self.env)
            .current_dir(&self.build_dir)
    }
}

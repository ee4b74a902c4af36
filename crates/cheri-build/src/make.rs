//! `make` invocations.

use std::path::Path;

use cheri_targets::BuildConfig;

use crate::exec::CommandSpec;

/// `make <targets> -jN` in `build_dir`.
pub fn build(config: &BuildConfig, build_dir: &Path, targets: &[&str]) -> CommandSpec {
    CommandSpec::new("make")
        .args(targets.iter().copied())
        .arg(config.make_j_flag())
        .current_dir(build_dir)
}

/// `make install [DESTDIR=<destdir>]` in `build_dir`.
pub fn install(build_dir: &Path, destdir: Option<&Path>) -> CommandSpec {
    let command = CommandSpec::new("make").arg("install").current_dir(build_dir);
    match destdir {
        Some(destdir) => command.arg(format!("DESTDIR={}", destdir.display())),
        None => command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheri_targets::CheriBits;

    #[test]
    fn build_with_targets_and_jobs() {
        let mut config = BuildConfig::new("/src", "/out", CheriBits::Bits256);
        config.make_jobs = 4;
        let cmd = build(&config, Path::new("/b"), &["lld"]);
        assert_eq!(cmd.to_string(), "make lld -j4");
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/b")));
    }

    #[test]
    fn install_with_destdir() {
        let cmd = install(Path::new("/b"), Some(Path::new("/rootfs")));
        assert_eq!(cmd.to_string(), "make install DESTDIR=/rootfs");
        assert_eq!(install(Path::new("/b"), None).to_string(), "make install");
    }
}

//! `cheribuild clean`: remove build directories.

use anyhow::Result;
use cheri_build::fsops;
use cheri_targets::BuildConfig;

use crate::manifest::CheribuildManifest;
use crate::registry;

/// Remove the build directory of each named project.
pub fn run(projects: &[String], manifest: &CheribuildManifest, config: &BuildConfig) -> Result<()> {
    for name in projects {
        let project = registry::resolve(name, manifest, config)?;
        let build_dir = &project.layout().build_dir;
        if !build_dir.exists() {
            println!("Already clean: {} does not exist", build_dir.display());
            continue;
        }
        fsops::remove_dir_all(build_dir, config.pretend)?;
        if config.pretend {
            println!("Would remove {}", build_dir.display());
        } else {
            println!("Removed {}", build_dir.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheri_targets::CheriBits;
    use std::fs;

    fn setup(pretend: bool) -> (tempfile::TempDir, BuildConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::new(dir.path().join("src"), dir.path().join("out"), CheriBits::Bits256);
        config.pretend = pretend;
        let build_dir = config.build_dir("llvm");
        fs::create_dir_all(&build_dir).unwrap();
        fs::write(build_dir.join("CMakeCache.txt"), b"data").unwrap();
        (dir, config)
    }

    #[test]
    fn clean_removes_build_dir() {
        let (_dir, config) = setup(false);
        run(&["llvm".to_string()], &CheribuildManifest::default(), &config).unwrap();
        assert!(!config.build_dir("llvm").exists());
    }

    #[test]
    fn pretend_clean_keeps_build_dir() {
        let (_dir, config) = setup(true);
        run(&["llvm".to_string()], &CheribuildManifest::default(), &config).unwrap();
        assert!(config.build_dir("llvm").exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("src"), dir.path().join("out"), CheriBits::Bits256);
        run(&["lld".to_string()], &CheribuildManifest::default(), &config).unwrap();
    }
}

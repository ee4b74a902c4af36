//! `cheribuild init`: write a starter manifest.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{CheribuildManifest, MANIFEST_FILE};

/// Create `cheribuild.toml` in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    fs::write(&path, CheribuildManifest::template())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_manifest() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();
        let (manifest, found) = CheribuildManifest::find_and_load(dir.path()).unwrap().unwrap();
        assert_eq!(found, dir.path());
        assert!(manifest.projects.is_empty());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "# mine\n").unwrap();
        assert!(run(dir.path()).is_err());
        assert_eq!(fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap(), "# mine\n");
    }
}

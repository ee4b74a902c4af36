//! `cheribuild list`: show known projects.

use anyhow::Result;

use crate::manifest::CheribuildManifest;
use crate::registry;

pub fn run(manifest: &CheribuildManifest) -> Result<()> {
    let projects = registry::all_projects(manifest);
    let width = projects.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in projects {
        println!("  {name:<width$}  {description}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn list_runs_without_manifest_projects() {
        super::run(&Default::default()).unwrap();
    }
}

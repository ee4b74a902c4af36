//! `cheribuild build`: run the full lifecycle for each named project.

use anyhow::{Context, Result};
use cheri_build::{build_project, BuildContext, CommandRunner, StepSelection};
use cheri_targets::{BuildConfig, HostPlatform};
use tracing::info;

use crate::manifest::CheribuildManifest;
use crate::registry;

/// Build `projects` in the given order, stopping at the first failure.
pub fn run(
    projects: &[String],
    manifest: &CheribuildManifest,
    config: &BuildConfig,
    host: &HostPlatform,
    runner: &dyn CommandRunner,
    steps: StepSelection,
) -> Result<()> {
    // Resolve everything first so a typo fails before anything is built.
    let resolved = projects
        .iter()
        .map(|name| registry::resolve(name, manifest, config))
        .collect::<Result<Vec<_>>>()?;

    let ctx = BuildContext {
        config,
        runner,
        host,
    };
    for project in &resolved {
        let project = project.as_project();
        build_project(project, &ctx, steps).with_context(|| format!("building {}", project.name()))?;
        info!("{}: done", project.name());
    }
    Ok(())
}

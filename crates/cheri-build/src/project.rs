//! The build lifecycle every project goes through.

use std::fmt;

use cheri_targets::{BuildConfig, HostPlatform};
use tracing::info;

use crate::error::Result;
use crate::exec::CommandRunner;

/// Everything a step needs from the outside world.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a BuildConfig,
    pub runner: &'a dyn CommandRunner,
    pub host: &'a HostPlatform,
}

impl BuildContext<'_> {
    /// Whether mutating steps are only logged. The runner decides, so
    /// commands and filesystem edits always agree.
    pub fn pretend(&self) -> bool {
        self.runner.pretend()
    }
}

/// One named step of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    CheckSystemDependencies,
    Update,
    Configure,
    Compile,
    Install,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStep::CheckSystemDependencies => "checkSystemDependencies",
            BuildStep::Update => "update",
            BuildStep::Configure => "configure",
            BuildStep::Compile => "compile",
            BuildStep::Install => "install",
        };
        f.write_str(name)
    }
}

/// Steps the user asked to skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSelection {
    pub skip_update: bool,
    pub skip_configure: bool,
    pub skip_install: bool,
}

impl StepSelection {
    pub fn runs(&self, step: BuildStep) -> bool {
        match step {
            BuildStep::Update => !self.skip_update,
            BuildStep::Configure => !self.skip_configure,
            BuildStep::Install => !self.skip_install,
            BuildStep::CheckSystemDependencies | BuildStep::Compile => true,
        }
    }
}

/// A buildable project.
///
/// The driver calls [`Project::check_system_dependencies`] and then
/// [`Project::process`], which by default runs update, configure, compile and
/// install in that order, stopping at the first failing step.
pub trait Project {
    fn name(&self) -> &str;

    fn check_system_dependencies(&self, _ctx: &BuildContext<'_>) -> Result<()> {
        Ok(())
    }

    fn update(&self, ctx: &BuildContext<'_>) -> Result<()>;

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<()>;

    fn compile(&self, ctx: &BuildContext<'_>) -> Result<()>;

    fn install(&self, ctx: &BuildContext<'_>) -> Result<()>;

    fn process(&self, ctx: &BuildContext<'_>, steps: StepSelection) -> Result<()> {
        run_steps(self, ctx, steps)
    }
}

/// Run the four build steps of `project` in order, honoring `steps`.
pub fn run_steps<P: Project + ?Sized>(project: &P, ctx: &BuildContext<'_>, steps: StepSelection) -> Result<()> {
    let name = project.name();
    for step in [BuildStep::Update, BuildStep::Configure, BuildStep::Compile, BuildStep::Install] {
        if !steps.runs(step) {
            info!("{name}: skipping {step}");
            continue;
        }
        info!("{name}: {step}");
        match step {
            BuildStep::Update => project.update(ctx)?,
            BuildStep::Configure => project.configure(ctx)?,
            BuildStep::Compile => project.compile(ctx)?,
            BuildStep::Install => project.install(ctx)?,
            BuildStep::CheckSystemDependencies => {}
        }
    }
    Ok(())
}

/// Check dependencies, then process `project`.
pub fn build_project(project: &dyn Project, ctx: &BuildContext<'_>, steps: StepSelection) -> Result<()> {
    info!("{}: {}", project.name(), BuildStep::CheckSystemDependencies);
    project.check_system_dependencies(ctx)?;
    project.process(ctx, steps)
}

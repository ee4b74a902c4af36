//! Cross-compilation project model for the CHERI toolchain and the projects
//! built with it.
//!
//! The pipeline for a cross-compiled project is:
//! options -> [`flags`] -> [`template`] (CMake) or [`environment`] (configure)
//! -> external tool invocation. Toolchain bootstrap ([`llvm`]) and the
//! [`version`] gate hook into the same [`project::Project`] lifecycle at
//! their own steps.

pub mod cmake;
pub mod configure;
pub mod cross;
pub mod environment;
pub mod error;
pub mod exec;
pub mod flags;
pub mod fsops;
pub mod git;
pub mod llvm;
pub mod make;
pub mod options;
pub mod project;
pub mod template;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use cross::{
    AutotoolsBuildStrategy, BuildStrategy, CMakeBuildStrategy, CrossCompileProject,
    CrossCompileSettings, ProjectLayout,
};
pub use error::{BuildError, Result};
pub use exec::{CommandOutput, CommandRunner, CommandSpec, ScopedEnvVar, SystemRunner};
pub use flags::{ConfigureFlags, FlagComposer, FlagSet};
pub use llvm::{BuildLld, BuildLlvm, LldOptions, LlvmOptions};
pub use options::{BuildSystem, CrossCompileOptions};
pub use project::{build_project, BuildContext, BuildStep, Project, StepSelection};
pub use template::{TemplateValue, ToolchainTemplate};
pub use version::{DependencyOutcome, VersionGate};

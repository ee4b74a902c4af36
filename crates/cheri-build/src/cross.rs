//! Cross-compiled projects.
//!
//! A [`CrossCompileProject`] owns the resolved [`CrossCompileSettings`] and a
//! [`BuildStrategy`] (CMake or Autotools) that turns them into tool
//! invocations. The settings are computed once, at construction.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cheri_targets::{default_install_dir, BuildConfig, PathSet, TargetDescriptor};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmake::CMakeInvocation;
use crate::configure::ConfigureInvocation;
use crate::environment::ConfigureEnvironment;
use crate::error::Result;
use crate::exec::ScopedEnvVar;
use crate::flags::{cmake_common_flags, configure_flags, FlagComposer, FlagSet};
use crate::fsops;
use crate::git::GitSource;
use crate::make;
use crate::options::CrossCompileOptions;
use crate::project::{run_steps, BuildContext, Project, StepSelection};
use crate::template::{TemplateValue, ToolchainTemplate};

/// File name of the generated CMake toolchain file inside the build directory.
pub const TOOLCHAIN_FILE_NAME: &str = "CheriBSDToolchain.cmake";

/// Target, paths and flags for one cross-compiled project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrossCompileSettings {
    pub target: TargetDescriptor,
    pub paths: PathSet,
    pub flags: FlagSet,
    #[serde(skip)]
    pub options: CrossCompileOptions,
    pub install_dir: PathBuf,
}

impl CrossCompileSettings {
    /// Resolve settings for project `name`.
    ///
    /// `install_dir` defaults to `<rootfs>/extra/<name>` and must lie inside
    /// the rootfs.
    pub fn new(
        config: &BuildConfig,
        name: &str,
        options: CrossCompileOptions,
        install_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let rootfs = &config.rootfs_dir;
        let install_dir = install_dir.unwrap_or_else(|| default_install_dir(rootfs, name));
        let target = TargetDescriptor::new(options.target);
        let paths = PathSet::resolve(config, rootfs, &install_dir)?;
        let flags = FlagComposer::new(&target, &options, &paths).compose();
        Ok(Self {
            target,
            paths,
            flags,
            options,
            install_dir,
        })
    }
}

/// Where a project's sources are and where it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl ProjectLayout {
    /// Default layout for `name` under the configured roots.
    pub fn for_project(config: &BuildConfig, name: &str) -> Self {
        Self {
            source_dir: config.source_dir(name),
            build_dir: config.build_dir(name),
        }
    }
}

/// How a cross-compiled project is configured, built and installed.
pub trait BuildStrategy {
    fn configure(&self, settings: &CrossCompileSettings, layout: &ProjectLayout, ctx: &BuildContext<'_>) -> Result<()>;

    fn compile(&self, _settings: &CrossCompileSettings, layout: &ProjectLayout, ctx: &BuildContext<'_>) -> Result<()> {
        ctx.runner.run(&make::build(ctx.config, &layout.build_dir, &[]))?;
        Ok(())
    }

    fn install(&self, settings: &CrossCompileSettings, layout: &ProjectLayout, ctx: &BuildContext<'_>) -> Result<()> {
        ctx.runner
            .run(&make::install(&layout.build_dir, Some(&settings.paths.destdir)))?;
        Ok(())
    }

    /// Environment override held for the whole of `process`.
    fn scoped_environment(&self, _settings: &CrossCompileSettings) -> Option<ScopedEnvVar> {
        None
    }
}

/// CMake driven through a generated toolchain file.
#[derive(Debug, Clone)]
pub struct CMakeBuildStrategy {
    pub template: ToolchainTemplate,
    pub build_type: String,
    pub extra_args: Vec<String>,
}

impl Default for CMakeBuildStrategy {
    fn default() -> Self {
        Self {
            template: ToolchainTemplate::cheribsd(),
            build_type: "Debug".into(),
            extra_args: Vec::new(),
        }
    }
}

impl CMakeBuildStrategy {
    pub fn toolchain_file(layout: &ProjectLayout) -> PathBuf {
        layout.build_dir.join(TOOLCHAIN_FILE_NAME)
    }

    /// Fill the toolchain template for `settings`.
    pub fn render_toolchain_file(&self, settings: &CrossCompileSettings) -> Result<String> {
        let paths = &settings.paths;
        let flags = &settings.flags;
        self.template.render([
            ("TOOLCHAIN_SDK_BINDIR", TemplateValue::from(paths.sdk_bin_dir.as_path())),
            ("TOOLCHAIN_SYSROOT", paths.sdk_sysroot.as_path().into()),
            ("TOOLCHAIN_COMPILER_BINDIR", paths.compiler_dir.as_path().into()),
            ("TOOLCHAIN_TARGET_TRIPLE", settings.target.triple.as_str().into()),
            ("TOOLCHAIN_COMMON_FLAGS", cmake_common_flags(flags, paths).into()),
            ("TOOLCHAIN_C_FLAGS", flags.c.as_slice().into()),
            ("TOOLCHAIN_LINKER_FLAGS", flags.ld.as_slice().into()),
            ("TOOLCHAIN_CXX_FLAGS", flags.cxx.as_slice().into()),
            ("TOOLCHAIN_ASM_FLAGS", flags.asm.as_slice().into()),
        ])
    }

    /// The cmake invocation; the toolchain file is always the first argument.
    pub fn invocation(&self, settings: &CrossCompileSettings, layout: &ProjectLayout) -> CMakeInvocation {
        let mut cmake = CMakeInvocation::new(&layout.source_dir, &layout.build_dir);
        cmake
            .define_path("CMAKE_TOOLCHAIN_FILE", &Self::toolchain_file(layout))
            .define_path("CMAKE_INSTALL_PREFIX", &settings.paths.install_prefix)
            .define("CMAKE_BUILD_TYPE", &self.build_type)
            .extend(self.extra_args.iter().cloned());
        cmake
    }
}

impl BuildStrategy for CMakeBuildStrategy {
    fn configure(&self, settings: &CrossCompileSettings, layout: &ProjectLayout, ctx: &BuildContext<'_>) -> Result<()> {
        // Rendered even in pretend mode so template errors still surface.
        let toolchain = self.render_toolchain_file(settings)?;
        fsops::create_dir_all(&layout.build_dir, ctx.pretend())?;
        fsops::write_file(&Self::toolchain_file(layout), &toolchain, ctx.pretend())?;
        ctx.runner.run(&self.invocation(settings, layout).command())?;
        Ok(())
    }
}

/// An autoconf `configure` script fed through environment variables.
#[derive(Debug, Clone, Default)]
pub struct AutotoolsBuildStrategy {
    pub configure_args: Vec<String>,
    /// Variables the project sets itself; must not overlap the derived ones.
    pub base_environment: BTreeMap<String, String>,
}

impl AutotoolsBuildStrategy {
    /// Derived `CC`/`CXX`/flag variables for `settings`.
    pub fn configure_environment(&self, settings: &CrossCompileSettings) -> ConfigureEnvironment {
        let flags = configure_flags(&settings.flags, &settings.target, &settings.options, &settings.paths);
        ConfigureEnvironment::derive(flags, &settings.paths.compiler_dir, &settings.target.triple)
    }

    pub fn invocation(
        &self,
        settings: &CrossCompileSettings,
        layout: &ProjectLayout,
        build_triple: &str,
    ) -> Result<ConfigureInvocation> {
        let mut env = self.base_environment.clone();
        self.configure_environment(settings).apply_to(&mut env)?;

        let triple = &settings.target.triple;
        let mut args = vec![
            format!("--host={triple}"),
            format!("--target={triple}"),
            format!("--build={build_triple}"),
        ];
        args.extend(self.configure_args.iter().cloned());
        Ok(ConfigureInvocation {
            source_dir: layout.source_dir.clone(),
            build_dir: layout.build_dir.clone(),
            prefix: settings.paths.install_prefix.clone(),
            args,
            env,
        })
    }
}

impl BuildStrategy for AutotoolsBuildStrategy {
    fn configure(&self, settings: &CrossCompileSettings, layout: &ProjectLayout, ctx: &BuildContext<'_>) -> Result<()> {
        let invocation = self.invocation(settings, layout, &ctx.host.build_triple())?;
        for (key, value) in &invocation.env {
            info!("{key}={value}");
        }
        fsops::create_dir_all(&layout.build_dir, ctx.pretend())?;
        ctx.runner.run(&invocation.command())?;
        Ok(())
    }

    fn scoped_environment(&self, settings: &CrossCompileSettings) -> Option<ScopedEnvVar> {
        Some(ScopedEnvVar::prepend_path(&settings.paths.sdk_bin_dir))
    }
}

/// A project cross-compiled for CheriBSD.
#[derive(Debug, Clone)]
pub struct CrossCompileProject<S> {
    pub name: String,
    pub layout: ProjectLayout,
    pub source: Option<GitSource>,
    pub settings: CrossCompileSettings,
    pub strategy: S,
}

impl<S: BuildStrategy> CrossCompileProject<S> {
    pub fn new(name: impl Into<String>, layout: ProjectLayout, settings: CrossCompileSettings, strategy: S) -> Self {
        Self {
            name: name.into(),
            layout,
            source: None,
            settings,
            strategy,
        }
    }

    pub fn with_source(mut self, source: GitSource) -> Self {
        self.source = Some(source);
        self
    }
}

impl<S: BuildStrategy> Project for CrossCompileProject<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, ctx: &BuildContext<'_>) -> Result<()> {
        match &self.source {
            Some(source) => source.update(&self.layout.source_dir, ctx.runner),
            None => {
                warn!("{}: no repository configured, using {} as is", self.name, self.layout.source_dir.display());
                Ok(())
            }
        }
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<()> {
        self.strategy.configure(&self.settings, &self.layout, ctx)
    }

    fn compile(&self, ctx: &BuildContext<'_>) -> Result<()> {
        self.strategy.compile(&self.settings, &self.layout, ctx)
    }

    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        self.strategy.install(&self.settings, &self.layout, ctx)
    }

    fn process(&self, ctx: &BuildContext<'_>, steps: StepSelection) -> Result<()> {
        let _env = self.strategy.scoped_environment(&self.settings);
        run_steps(self, ctx, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::error::BuildError;
    use crate::test_support::{RecordingRunner, ENV_LOCK};
    use cheri_targets::{CheriBits, HostPlatform, TargetError};

    fn config(root: &Path) -> BuildConfig {
        BuildConfig::new(root.join("src"), root.join("out"), CheriBits::Bits256)
    }

    fn settings(config: &BuildConfig) -> CrossCompileSettings {
        CrossCompileSettings::new(config, "Zlib", CrossCompileOptions::default(), None).unwrap()
    }

    #[test]
    fn settings_install_under_rootfs_extra() {
        let config = config(Path::new("/c"));
        let settings = settings(&config);
        assert_eq!(settings.install_dir, Path::new("/c/out/rootfs256/extra/zlib"));
        assert_eq!(settings.paths.install_prefix, Path::new("/extra/zlib"));
        assert_eq!(settings.paths.destdir, Path::new("/c/out/rootfs256"));
    }

    #[test]
    fn install_dir_outside_rootfs_is_rejected() {
        let config = config(Path::new("/c"));
        let err = CrossCompileSettings::new(&config, "zlib", CrossCompileOptions::default(), Some("/usr/local".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Target(TargetError::InstallDirOutsideRootfs { .. })
        ));
    }

    #[test]
    fn toolchain_file_has_every_placeholder_filled() {
        let config = config(Path::new("/c"));
        let rendered = CMakeBuildStrategy::default()
            .render_toolchain_file(&settings(&config))
            .unwrap();
        assert!(!rendered.contains('@'));
        assert!(rendered.contains("\"/c/out/sdk256/bin/cheri-unknown-freebsd-clang\""));
        assert!(rendered.contains("-mabi=sandbox -mxgot -B/c/out/sdk256/bin"));
        assert!(rendered.contains("-fuse-ld=lld"));
    }

    #[test]
    fn cmake_toolchain_argument_comes_first() {
        let config = config(Path::new("/c"));
        let layout = ProjectLayout::for_project(&config, "zlib");
        let cmake = CMakeBuildStrategy::default().invocation(&settings(&config), &layout);
        assert_eq!(
            cmake.args[..3],
            [
                "-DCMAKE_TOOLCHAIN_FILE=/c/src/zlib-256-build/CheriBSDToolchain.cmake".to_string(),
                "-DCMAKE_INSTALL_PREFIX=/extra/zlib".to_string(),
                "-DCMAKE_BUILD_TYPE=Debug".to_string(),
            ]
        );
    }

    #[test]
    fn cmake_configure_writes_toolchain_and_runs_cmake() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let layout = ProjectLayout::for_project(&config, "zlib");
        let runner = RecordingRunner::new(false);
        let host = HostPlatform::Other("test".into());
        let ctx = BuildContext {
            config: &config,
            runner: &runner,
            host: &host,
        };
        let project = CrossCompileProject::new("zlib", layout.clone(), settings(&config), CMakeBuildStrategy::default());
        project.configure(&ctx).unwrap();

        let written = std::fs::read_to_string(CMakeBuildStrategy::toolchain_file(&layout)).unwrap();
        assert!(!written.contains('@'));
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, Path::new("cmake"));
        assert_eq!(commands[0].cwd.as_deref(), Some(layout.build_dir.as_path()));
    }

    #[test]
    fn pretend_configure_still_reports_template_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.pretend = true;
        let layout = ProjectLayout::for_project(&config, "zlib");
        let runner = RecordingRunner::new(true);
        let host = HostPlatform::Other("test".into());
        let ctx = BuildContext {
            config: &config,
            runner: &runner,
            host: &host,
        };
        let strategy = CMakeBuildStrategy {
            template: ToolchainTemplate::new("set(CMAKE_SYSTEM_NAME FreeBSD)\n"),
            ..Default::default()
        };
        let project = CrossCompileProject::new("zlib", layout.clone(), settings(&config), strategy);
        let err = project.configure(&ctx).unwrap_err();
        assert!(matches!(err, BuildError::TemplateKeyMissing { ref key } if key == "TOOLCHAIN_SDK_BINDIR"));
        assert!(err.is_internal());
        assert!(!layout.build_dir.exists());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn autotools_invocation_passes_triples_and_environment() {
        let config = config(Path::new("/c"));
        let layout = ProjectLayout::for_project(&config, "zlib");
        let invocation = AutotoolsBuildStrategy::default()
            .invocation(&settings(&config), &layout, "x86_64-unknown-freebsd11")
            .unwrap();
        assert_eq!(
            invocation.args,
            vec![
                "--host=cheri-unknown-freebsd",
                "--target=cheri-unknown-freebsd",
                "--build=x86_64-unknown-freebsd11",
            ]
        );
        assert_eq!(invocation.env["CC"], "/c/out/sdk256/bin/cheri-unknown-freebsd-clang");
        assert!(invocation.env["CFLAGS"].contains("-target cheri-unknown-freebsd -Wall"));
        assert!(invocation.env["LDFLAGS"].ends_with("-static"));
    }

    #[test]
    fn autotools_rejects_colliding_base_environment() {
        let config = config(Path::new("/c"));
        let layout = ProjectLayout::for_project(&config, "zlib");
        let strategy = AutotoolsBuildStrategy {
            base_environment: BTreeMap::from([("CFLAGS".to_string(), "-O2".to_string())]),
            ..Default::default()
        };
        let err = strategy
            .invocation(&settings(&config), &layout, "x86_64-unknown-linux-gnu")
            .unwrap_err();
        assert!(err.is_internal());
        assert_eq!(strategy.base_environment.len(), 1);
    }

    struct FailingCompile;

    impl BuildStrategy for FailingCompile {
        fn configure(&self, _: &CrossCompileSettings, _: &ProjectLayout, _: &BuildContext<'_>) -> Result<()> {
            Ok(())
        }

        fn compile(&self, _: &CrossCompileSettings, _: &ProjectLayout, _: &BuildContext<'_>) -> Result<()> {
            Err(BuildError::CommandFailed {
                command: "make".into(),
                code: Some(2),
                stderr: String::new(),
            })
        }

        fn scoped_environment(&self, settings: &CrossCompileSettings) -> Option<ScopedEnvVar> {
            Some(ScopedEnvVar::prepend_path(&settings.paths.sdk_bin_dir))
        }
    }

    fn process<S: BuildStrategy>(strategy: S, runner: &RecordingRunner) -> Result<()> {
        let config = config(Path::new("/c"));
        let host = HostPlatform::Other("test".into());
        let ctx = BuildContext {
            config: &config,
            runner,
            host: &host,
        };
        let layout = ProjectLayout::for_project(&config, "zlib");
        let steps = StepSelection {
            skip_update: true,
            skip_configure: true,
            ..Default::default()
        };
        CrossCompileProject::new("zlib", layout, settings(&config), strategy).process(&ctx, steps)
    }

    #[test]
    fn path_is_prepended_during_process_and_restored_after() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = std::env::var("PATH").ok();
        let runner = RecordingRunner::new(false);
        let strategy = AutotoolsBuildStrategy::default();
        process(strategy, &runner).unwrap();

        let observed = runner.observed_path();
        assert_eq!(observed.len(), 2);
        assert!(observed
            .iter()
            .all(|p| p.as_deref().is_some_and(|p| p.starts_with("/c/out/sdk256/bin"))));
        assert_eq!(std::env::var("PATH").ok(), before);
    }

    #[test]
    fn path_is_restored_after_failing_step() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = std::env::var_os("PATH");
        let runner = RecordingRunner::new(false);
        assert!(process(FailingCompile, &runner).is_err());
        assert_eq!(std::env::var_os("PATH"), before);
    }
}

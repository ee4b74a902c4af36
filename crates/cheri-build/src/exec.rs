//! External command execution.
//!
//! Every external tool (cmake, make, configure, git, the host compiler) is
//! run through a [`CommandRunner`], one command at a time. In pretend mode a
//! runner logs mutating commands instead of running them; read-only queries
//! still run so that decisions are made on real data.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Capture stdout/stderr instead of inheriting them.
    pub capture: bool,
    /// The command does not mutate anything and also runs in pretend mode.
    pub read_only: bool,
    /// Treat a non-zero exit as an error.
    pub check_status: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            capture: false,
            read_only: false,
            check_status: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn capture_output(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn allow_failure(mut self) -> Self {
        self.check_status = false;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of a finished command. Streams are empty unless captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Both captured streams; compilers print version banners to either.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands, blocking until each one finishes.
pub trait CommandRunner {
    /// Whether mutating commands are skipped.
    fn pretend(&self) -> bool;

    /// Run one command.
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    pretend: bool,
}

impl SystemRunner {
    pub fn new(pretend: bool) -> Self {
        Self { pretend }
    }
}

impl CommandRunner for SystemRunner {
    fn pretend(&self) -> bool {
        self.pretend
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        if self.pretend && !command.read_only {
            info!("(pretend) {command}");
            return Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            });
        }
        debug!(cwd = ?command.cwd, "running {command}");

        let mut process = Command::new(&command.program);
        process.args(&command.args).envs(&command.env);
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }

        let spawn_error = |source| BuildError::Spawn {
            program: command.program.display().to_string(),
            source,
        };
        let output = if command.capture {
            let output = process
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_error)?;
            CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
        } else {
            let status = process.status().map_err(spawn_error)?;
            CommandOutput {
                code: status.code(),
                ..Default::default()
            }
        };

        if command.check_status && output.code != Some(0) {
            return Err(BuildError::CommandFailed {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

/// Overrides a process-wide environment variable until dropped.
///
/// The previous value (or its absence) is restored on every exit path,
/// including early returns and unwinding.
#[derive(Debug)]
#[must_use = "the variable is restored as soon as the guard is dropped"]
pub struct ScopedEnvVar {
    key: String,
    previous: Option<OsString>,
}

impl ScopedEnvVar {
    /// Set `key` to `value`.
    pub fn set(key: impl Into<String>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        let previous = std::env::var_os(&key);
        std::env::set_var(&key, value.into());
        Self { key, previous }
    }

    /// Prepend `dir` to `PATH`.
    pub fn prepend_path(dir: &Path) -> Self {
        let mut value = dir.as_os_str().to_owned();
        if let Some(current) = std::env::var_os("PATH") {
            value.push(":");
            value.push(current);
        }
        Self::set("PATH", value)
    }
}

impl Drop for ScopedEnvVar {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => std::env::set_var(&self.key, previous),
            None => std::env::remove_var(&self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_LOCK;

    #[test]
    fn display_quotes_whitespace() {
        let cmd = CommandSpec::new("cmake").arg("-G").arg("Unix Makefiles").arg("..");
        assert_eq!(cmd.to_string(), "cmake -G 'Unix Makefiles' ..");
    }

    #[test]
    fn pretend_skips_mutating_commands() {
        let runner = SystemRunner::new(true);
        let output = runner
            .run(&CommandSpec::new("/nonexistent/definitely-not-a-tool"))
            .unwrap();
        assert_eq!(output.code, Some(0));
    }

    #[test]
    fn pretend_still_runs_read_only_commands() {
        let runner = SystemRunner::new(true);
        let result = runner.run(&CommandSpec::new("/nonexistent/definitely-not-a-tool").read_only());
        assert!(matches!(result, Err(BuildError::Spawn { .. })));
    }

    #[test]
    fn captures_output_and_checks_status() {
        let runner = SystemRunner::new(false);
        let output = runner
            .run(&CommandSpec::new("sh").args(["-c", "echo out; echo err >&2"]).capture_output())
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.combined(), "out\nerr\n");

        let err = runner
            .run(&CommandSpec::new("sh").args(["-c", "exit 3"]).capture_output())
            .unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: Some(3), .. }));

        let tolerated = runner
            .run(&CommandSpec::new("sh").args(["-c", "exit 3"]).capture_output().allow_failure())
            .unwrap();
        assert_eq!(tolerated.code, Some(3));
    }

    #[test]
    fn scoped_path_is_restored() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = std::env::var_os("PATH");
        {
            let _guard = ScopedEnvVar::prepend_path(Path::new("/opt/sdk/bin"));
            let path = std::env::var("PATH").unwrap();
            assert!(path.starts_with("/opt/sdk/bin"));
        }
        assert_eq!(std::env::var_os("PATH"), before);
    }

    #[test]
    fn scoped_var_restored_after_panic() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let key = "CHERIBUILD_SCOPED_TEST";
        std::env::remove_var(key);
        let result = std::panic::catch_unwind(|| {
            let _guard = ScopedEnvVar::set(key, "1");
            assert_eq!(std::env::var(key).unwrap(), "1");
            panic!("step failed");
        });
        assert!(result.is_err());
        assert!(std::env::var_os(key).is_none());
    }
}

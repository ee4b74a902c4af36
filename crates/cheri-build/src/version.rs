//! Host compiler version gating.

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use cheri_targets::HostPlatform;
use regex::Regex;
pub use semver::Version;
use tracing::debug;

use crate::error::{BuildError, Result};
use crate::exec::{CommandRunner, CommandSpec};

/// Result of checking one host tool requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    Satisfied {
        found: Version,
    },
    Missing {
        reason: String,
        remediation: Option<String>,
    },
    TooOld {
        found: Version,
        required: Version,
        remediation: String,
    },
}

impl DependencyOutcome {
    /// Turn an unmet requirement into a [`BuildError::Dependency`].
    pub fn into_result(self, project: &str) -> Result<Version> {
        match self {
            DependencyOutcome::Satisfied { found } => Ok(found),
            outcome => Err(BuildError::Dependency {
                project: project.to_string(),
                outcome,
            }),
        }
    }
}

impl fmt::Display for DependencyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyOutcome::Satisfied { found } => write!(f, "found version {found}"),
            DependencyOutcome::Missing {
                reason,
                remediation,
            } => {
                write!(f, "{reason}")?;
                if let Some(hint) = remediation {
                    write!(f, "\n{hint}")?;
                }
                Ok(())
            }
            DependencyOutcome::TooOld {
                found,
                required,
                remediation,
            } => write!(
                f,
                "version {found} is too old, at least {required} is required\n{remediation}"
            ),
        }
    }
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"version (\d+)\.(\d+)(?:\.(\d+))?").expect("version regex is valid")
    })
}

/// First `version X.Y[.Z]` in `text`; `0.0.0` when there is none.
///
/// A component too large for `u64` makes the whole match unparseable, so it
/// also yields `0.0.0` rather than a partially zeroed version.
pub fn parse_compiler_version(text: &str) -> Version {
    let Some(captures) = version_regex().captures(text) else {
        return Version::new(0, 0, 0);
    };
    let component = |i: usize| match captures.get(i) {
        Some(m) => m.as_str().parse::<u64>().ok(),
        None => Some(0),
    };
    match (component(1), component(2), component(3)) {
        (Some(major), Some(minor), Some(patch)) => Version::new(major, minor, patch),
        _ => Version::new(0, 0, 0),
    }
}

/// Compare a reported version against a requirement.
pub fn compare_versions(found: Version, required: &Version, remediation: impl FnOnce() -> String) -> DependencyOutcome {
    if found < *required {
        DependencyOutcome::TooOld {
            found,
            required: required.clone(),
            remediation: remediation(),
        }
    } else {
        DependencyOutcome::Satisfied { found }
    }
}

/// Minimum version requirement for a host compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionGate {
    /// Resolved compiler path; `None` when it could not be found.
    pub program: Option<PathBuf>,
    pub required: Version,
    pub remediation: String,
}

impl VersionGate {
    /// Gate on host clang, with a hint for installing it on `host`.
    pub fn clang(program: Option<PathBuf>, required: Version, host: &HostPlatform) -> Self {
        let remediation = clang_install_hint(host, &required);
        Self {
            program,
            required,
            remediation,
        }
    }

    /// Ask the compiler for its version and classify the result.
    ///
    /// `<cc> -v` is read-only, so it also runs in pretend mode.
    pub fn check(&self, runner: &dyn CommandRunner) -> Result<DependencyOutcome> {
        let program = match &self.program {
            Some(program) if program.exists() => program,
            Some(program) => {
                return Ok(DependencyOutcome::Missing {
                    reason: format!("{} does not exist", program.display()),
                    remediation: Some(self.remediation.clone()),
                })
            }
            None => {
                return Ok(DependencyOutcome::Missing {
                    reason: "no host compiler configured or found on PATH".into(),
                    remediation: Some(self.remediation.clone()),
                })
            }
        };

        let output = runner.run(
            &CommandSpec::new(program)
                .arg("-v")
                .capture_output()
                .read_only()
                .allow_failure(),
        )?;
        let found = parse_compiler_version(&output.combined());
        debug!("{} reports version {found}", program.display());
        Ok(compare_versions(found, &self.required, || self.remediation.clone()))
    }
}

/// How to get a new enough clang on `host`.
pub fn clang_install_hint(host: &HostPlatform, required: &Version) -> String {
    let (major, minor) = (required.major, required.minor);
    if host.is_freebsd() {
        format!("Try running `pkg install clang{major}{minor}` and set clang-path to /usr/local/bin/clang{major}{minor}")
    } else if host.is_ubuntu() {
        format!(
            "Add the LLVM apt repository from https://apt.llvm.org/ and run \
             `apt-get install clang-{major}.{minor}`, then set clang-path to /usr/bin/clang-{major}.{minor}"
        )
    } else {
        format!("Install clang {major}.{minor} or newer with your package manager and set clang-path")
    }
}

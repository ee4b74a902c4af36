//! Build errors.

use std::io;
use std::path::{Path, PathBuf};

use cheri_targets::TargetError;

use crate::version::DependencyOutcome;

/// Errors that can occur while driving a project build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Target or path resolution failed (e.g. install dir outside the rootfs).
    #[error("configuration error: {0}")]
    Target(#[from] TargetError),

    /// A substitution key has no `@KEY@` placeholder in the template.
    #[error("toolchain template has no placeholder @{key}@ (template and code out of sync)")]
    TemplateKeyMissing { key: String },

    /// Placeholders were left unsubstituted.
    #[error("toolchain template still contains placeholders after substitution:\n{text}")]
    UnconsumedPlaceholders { text: String },

    /// The caller's configure environment already defines a derived key.
    #[error("configure environment already defines {key}")]
    EnvironmentCollision { key: String },

    /// A host tool is missing or too old.
    #[error("{project}: {outcome}")]
    Dependency {
        project: String,
        outcome: DependencyOutcome,
    },

    /// Build output did not have the expected shape.
    #[error("{detail}")]
    UpstreamLayout { detail: String },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed with {}{}", exit_description(*code), stderr_suffix(stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external command could not be started.
    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Whether the error signals a programmer or template-version mistake
    /// rather than a problem with the user's setup.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            BuildError::TemplateKeyMissing { .. }
                | BuildError::UnconsumedPlaceholders { .. }
                | BuildError::EnvironmentCollision { .. }
        )
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
        move |source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

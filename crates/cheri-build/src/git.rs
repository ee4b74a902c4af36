//! Git checkouts at pinned revisions.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::exec::{CommandRunner, CommandSpec};

/// Where a source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub url: String,
    /// Revision to check out after updating; `None` (or empty) means latest.
    pub revision: Option<String>,
    /// Branch to clone initially.
    pub initial_branch: Option<String>,
}

impl GitSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: None,
            initial_branch: None,
        }
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision.filter(|r| !r.is_empty());
        self
    }

    pub fn with_initial_branch(mut self, branch: impl Into<String>) -> Self {
        self.initial_branch = Some(branch.into());
        self
    }

    /// Clone into `dir` or update the existing checkout there, then check out
    /// the pinned revision.
    pub fn update(&self, dir: &Path, runner: &dyn CommandRunner) -> Result<()> {
        if dir.join(".git").exists() {
            info!("updating {}", dir.display());
            runner.run(
                &CommandSpec::new("git")
                    .args(["pull", "--rebase"])
                    .current_dir(dir),
            )?;
        } else {
            info!("cloning {} into {}", self.url, dir.display());
            let mut clone = CommandSpec::new("git").arg("clone");
            if let Some(branch) = &self.initial_branch {
                clone = clone.args(["--branch", branch.as_str()]);
            }
            runner.run(&clone.arg(self.url.as_str()).arg(dir.display().to_string()))?;
        }

        if let Some(revision) = &self.revision {
            runner.run(
                &CommandSpec::new("git")
                    .args(["checkout", revision.as_str()])
                    .current_dir(dir),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRunner;

    #[test]
    fn clones_missing_checkout_with_branch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new(false);
        GitSource::new("https://example.org/lld.git")
            .with_initial_branch("cheri")
            .update(&dir.path().join("lld"), &runner)
            .unwrap();
        let lines = runner.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("git clone --branch cheri https://example.org/lld.git "));
    }

    #[test]
    fn pulls_existing_checkout_and_pins_revision() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let runner = RecordingRunner::new(false);
        GitSource::new("https://example.org/llvm.git")
            .with_revision(Some("abc123".into()))
            .update(dir.path(), &runner)
            .unwrap();
        assert_eq!(runner.lines(), vec!["git pull --rebase", "git checkout abc123"]);
        assert_eq!(runner.commands()[1].cwd.as_deref(), Some(dir.path()));
    }

    #[test]
    fn empty_revision_means_latest() {
        let source = GitSource::new("u").with_revision(Some(String::new()));
        assert!(source.revision.is_none());
    }
}

//! Toolchain-description template substitution.
//!
//! Templates contain `@NAME@` placeholders. Substitution is plain textual
//! replace-all per key: no escaping, no nesting. Every supplied key must have
//! a placeholder and no placeholder may survive.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// The CheriBSD CMake toolchain template shipped with the crate.
pub const CHERIBSD_TOOLCHAIN_TEMPLATE: &str = include_str!("../files/CheriBSDToolchain.cmake.in");

/// A value substituted for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Substituted verbatim.
    Single(String),
    /// Joined with single spaces, in order.
    List(Vec<String>),
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Single(value) => f.write_str(value),
            TemplateValue::List(values) => f.write_str(&values.join(" ")),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Single(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Single(value)
    }
}

impl From<&Path> for TemplateValue {
    fn from(value: &Path) -> Self {
        TemplateValue::Single(value.display().to_string())
    }
}

impl From<PathBuf> for TemplateValue {
    fn from(value: PathBuf) -> Self {
        TemplateValue::from(value.as_path())
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(values: Vec<String>) -> Self {
        TemplateValue::List(values)
    }
}

impl From<&[String]> for TemplateValue {
    fn from(values: &[String]) -> Self {
        TemplateValue::List(values.to_vec())
    }
}

/// A template with `@NAME@` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainTemplate {
    text: String,
}

impl ToolchainTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The bundled CheriBSD CMake toolchain template.
    pub fn cheribsd() -> Self {
        Self::new(CHERIBSD_TOOLCHAIN_TEMPLATE)
    }

    /// Load a template from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(BuildError::io(path))?;
        Ok(Self::new(text))
    }

    /// Substitute every `(key, value)` pair and return the finished text.
    ///
    /// Fails with [`BuildError::TemplateKeyMissing`] before substituting
    /// anything if a key has no placeholder, and with
    /// [`BuildError::UnconsumedPlaceholders`] if an `@` is left afterwards.
    pub fn render<I, K>(&self, substitutions: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, TemplateValue)>,
        K: AsRef<str>,
    {
        let substitutions: Vec<(String, String)> = substitutions
            .into_iter()
            .map(|(key, value)| (placeholder(key.as_ref()), value.to_string()))
            .collect();

        if let Some((missing, _)) = substitutions
            .iter()
            .find(|(placeholder, _)| !self.text.contains(placeholder.as_str()))
        {
            return Err(BuildError::TemplateKeyMissing {
                key: missing.trim_matches('@').to_string(),
            });
        }

        let mut rendered = self.text.clone();
        for (placeholder, value) in &substitutions {
            rendered = rendered.replace(placeholder.as_str(), value);
        }

        if rendered.contains('@') {
            return Err(BuildError::UnconsumedPlaceholders { text: rendered });
        }
        Ok(rendered)
    }
}

fn placeholder(key: &str) -> String {
    format!("@{key}@")
}

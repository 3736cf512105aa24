//! Ordered catalog of symbolic classes the classifier can predict.

use std::fmt;
use std::path::Path;

use crate::shared::constants::{DEFAULT_LABELS, UNKNOWN_LABEL};
use crate::shared::startup_error::StartupError;

/// A predicted class: a catalog entry, or `Unknown` when the classifier's
/// output index has no catalog entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    Catalog { index: usize, name: String },
    Unknown,
}

impl Label {
    pub fn name(&self) -> &str {
        match self {
            Label::Catalog { name, .. } => name,
            Label::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable after startup. Entry `i` names classifier output `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    pub fn new(labels: Vec<String>) -> Result<Self, StartupError> {
        if labels.is_empty() {
            return Err(StartupError::EmptyCatalog);
        }
        Ok(Self { labels })
    }

    /// Reads one label per line; surrounding whitespace and blank lines are
    /// ignored.
    pub fn from_file(path: &Path) -> Result<Self, StartupError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StartupError::InvalidConfig(format!(
                "cannot read labels file {}: {e}",
                path.display()
            ))
        })?;
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Maps a classifier output index to its label; out-of-range indices
    /// become [`Label::Unknown`].
    pub fn resolve(&self, index: usize) -> Label {
        match self.labels.get(index) {
            Some(name) => Label::Catalog {
                index,
                name: name.clone(),
            },
            None => Label::Unknown,
        }
    }
}

impl Default for LabelCatalog {
    /// Digits `0-9` followed by `A-Z`.
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

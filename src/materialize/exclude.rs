//! Exclusion rules for copying a base project
//!
//! Generated and IDE/VCS metadata directories are never copied. Pruning
//! `autogen` matters most: a stale copy makes the generator skip files.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Names pruned at any depth of the base project tree
const DEFAULT_EXCLUDES: &[&str] = &[
    "autogen",
    ".git",
    ".settings",
    ".projectlinkstore",
    ".project",
    ".pdm",
    ".cproject",
    ".uceditor",
];

/// Errors for exclusion rules
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Exclusion rules for filtering the copy walk
#[derive(Debug)]
pub struct ExcludeRules {
    glob_set: GlobSet,
}

impl ExcludeRules {
    /// Create exclusion rules with the default names
    pub fn new() -> Result<Self, ExcludeError> {
        Self::with_names(&[])
    }

    /// Create rules with extra names or patterns on top of the defaults
    pub fn with_names(extra: &[&str]) -> Result<Self, ExcludeError> {
        let mut builder = GlobSetBuilder::new();

        for name in DEFAULT_EXCLUDES.iter().chain(extra) {
            if !name.is_empty() {
                builder.add(Glob::new(&format!("**/{name}"))?);
            }
        }

        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Check if a path relative to the project root should be skipped
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.glob_set.is_match(path_str.as_ref())
    }
}

//! Project materialization
//!
//! Copies the base project into the build directory, removes the files the
//! generator must recreate, and writes the synthesized descriptor plus the
//! GBL metadata side file.

mod exclude;

pub use exclude::{ExcludeError, ExcludeRules};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use serde_yaml::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::descriptor::{DescriptorError, ProjectDescriptor, DESCRIPTOR_EXTENSION};

/// Name of the GBL metadata side file
pub const GBL_METADATA_FILE: &str = "gbl_metadata.yaml";

/// Directory holding component config headers
pub const CONFIG_DIR: &str = "config";

/// RAIL config headers, always regenerated
const STALE_HEADER_PATTERN: &str = "sl_rail_*.h";

/// Board, stack and RTOS config headers, always regenerated
const STALE_HEADERS: &[&str] = &[
    "sl_memory_config.h",
    "sl_board_control_config.h",
    "FreeRTOSConfig.h",
];

/// Errors for materialization
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Exclude rules error: {0}")]
    ExcludeError(#[from] ExcludeError),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Path is not within project root: {0}")]
    PathNotInProject(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> MaterializeError + '_ {
    move |source| MaterializeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Files produced by materialization
#[derive(Debug, Clone)]
pub struct MaterializedProject {
    /// Build directory
    pub root: PathBuf,
    /// The synthesized `<project>.slcp`
    pub descriptor_path: PathBuf,
    /// The GBL metadata side file
    pub metadata_path: PathBuf,
    /// Number of files copied from the base project
    pub files_copied: usize,
    /// Stale headers that existed and were deleted
    pub removed_headers: Vec<PathBuf>,
}

/// Copies a base project into a build directory
pub struct Materializer {
    /// Base project directory
    source: PathBuf,
    /// Build directory
    destination: PathBuf,
    /// Exclusion rules
    exclude: ExcludeRules,
}

impl Materializer {
    /// Create a materializer with the default exclusions
    pub fn new(source: PathBuf, destination: PathBuf) -> Result<Self, MaterializeError> {
        Ok(Self {
            source,
            destination,
            exclude: ExcludeRules::new()?,
        })
    }

    /// Copy the base project tree, pruning excluded entries during the walk.
    ///
    /// Existing files in the destination are overwritten; files not in the
    /// base project are left alone. Symlinks are followed.
    pub fn copy_tree(&self) -> Result<usize, MaterializeError> {
        fs::create_dir_all(&self.destination).map_err(io_err(&self.destination))?;

        let mut copied = 0;
        let walker = WalkDir::new(&self.source)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.source)
                    .map(|rel| rel.as_os_str().is_empty() || !self.exclude.is_excluded(rel))
                    .unwrap_or(false)
            });

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            let rel_path = path
                .strip_prefix(&self.source)
                .map_err(|_| MaterializeError::PathNotInProject(path.to_path_buf()))?;

            if rel_path.as_os_str().is_empty() {
                continue;
            }

            let target = self.destination.join(rel_path);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(io_err(&target))?;
            } else {
                fs::copy(path, &target).map_err(io_err(path))?;
                copied += 1;
            }
        }

        debug!(files = copied, from = %self.source.display(), "copied base project");
        Ok(copied)
    }

    /// Delete config headers the generator will not reliably overwrite.
    ///
    /// Missing files are not an error. Returns the files that were deleted.
    pub fn remove_stale_headers(&self) -> Result<Vec<PathBuf>, MaterializeError> {
        let config_dir = self.destination.join(CONFIG_DIR);
        let mut candidates: Vec<PathBuf> = Vec::new();

        if config_dir.is_dir() {
            let rail: GlobMatcher = Glob::new(STALE_HEADER_PATTERN)?.compile_matcher();
            for entry in fs::read_dir(&config_dir).map_err(io_err(&config_dir))? {
                let entry = entry.map_err(io_err(&config_dir))?;
                if rail.is_match(entry.file_name()) {
                    candidates.push(entry.path());
                }
            }
            candidates.sort();
        }
        candidates.extend(STALE_HEADERS.iter().map(|name| config_dir.join(name)));

        let mut removed = Vec::new();
        for path in candidates {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale config header");
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(MaterializeError::Io { path, source }),
            }
        }

        Ok(removed)
    }

    /// Copy the project and write the synthesized files.
    ///
    /// `base_descriptor` is the descriptor file of the base project; its copy
    /// is deleted and replaced by `<project_name>.slcp`.
    pub fn materialize(
        &self,
        base_descriptor: &Path,
        project_name: &str,
        descriptor: &ProjectDescriptor,
        gbl_metadata: &Value,
    ) -> Result<MaterializedProject, MaterializeError> {
        let files_copied = self.copy_tree()?;

        if let Some(name) = base_descriptor.file_name() {
            let copied = self.destination.join(name);
            match fs::remove_file(&copied) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(MaterializeError::Io { path: copied, source }),
            }
        }

        let removed_headers = self.remove_stale_headers()?;

        let descriptor_path = self
            .destination
            .join(format!("{project_name}.{DESCRIPTOR_EXTENSION}"));
        descriptor.write(&descriptor_path)?;

        let metadata_path = self.destination.join(GBL_METADATA_FILE);
        let metadata = serde_yaml::to_string(gbl_metadata)?;
        fs::write(&metadata_path, metadata).map_err(io_err(&metadata_path))?;

        info!(
            project = %descriptor_path.display(),
            files = files_copied,
            "materialized project"
        );

        Ok(MaterializedProject {
            root: self.destination.clone(),
            descriptor_path,
            metadata_path,
            files_copied,
            removed_headers,
        })
    }
}

//! Firmware build manifest
//!
//! A manifest names a base project and describes how to retarget it:
//! the device, component deltas, configuration values, SLC defines, C defines
//! injected into generated headers, and GBL packaging metadata.

mod overrides;

pub use overrides::{apply_overrides, Override, OverrideError};

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::descriptor::{scalar_string, ComponentRef};

/// Errors for manifest loading
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("manifest {0} is not a mapping")]
    NotAMapping(PathBuf),

    #[error("override error: {0}")]
    Override(#[from] OverrideError),

    #[error("base project `{0}` must be a relative path inside the projects root")]
    BaseProjectOutsideRoot(String),

    #[error("manifest {0} has no projects root (expected <root>/<dir>/<manifest>)")]
    NoProjectsRoot(PathBuf),
}

/// Ordered `name: value` map whose values are coerced to strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct ValueMap {
    entries: Vec<(String, String)>,
}

impl ValueMap {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl TryFrom<Mapping> for ValueMap {
    type Error = String;

    fn try_from(mapping: Mapping) -> Result<Self, Self::Error> {
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = scalar_string(&key).ok_or("map keys must be scalars")?;
            let value =
                scalar_string(&value).ok_or_else(|| format!("value for `{key}` must be a scalar"))?;
            entries.push((key, value));
        }
        Ok(Self { entries })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Per-target patch instructions for a base project
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    /// Base project directory, relative to the projects root
    pub base_project: String,

    /// Target device (chip) identifier, installed as a component
    pub device: String,

    #[serde(default)]
    pub add_components: Vec<ComponentRef>,

    #[serde(default)]
    pub remove_components: Vec<ComponentRef>,

    /// Merged into the descriptor's `configuration` list
    #[serde(default)]
    pub configuration: ValueMap,

    /// Merged into the descriptor's `define` list
    #[serde(default)]
    pub slcp_defines: ValueMap,

    /// Injected into generated headers after project generation
    #[serde(default)]
    pub c_defines: ValueMap,

    /// GBL packaging metadata, written out verbatim
    pub gbl: Value,

    #[serde(default)]
    pub toolchain_settings: Vec<Value>,
}

impl Manifest {
    /// Parse manifest YAML, apply overrides, then validate into a typed manifest
    pub fn from_yaml(text: &str, overrides: &[Override]) -> Result<Self, serde_yaml::Error> {
        let mut doc: Mapping = serde_yaml::from_str(text)?;
        apply_overrides(&mut doc, overrides)
            .map_err(|e| <serde_yaml::Error as serde::de::Error>::custom(e.to_string()))?;
        serde_yaml::from_value(Value::Mapping(doc))
    }

    /// Load a manifest file and apply overrides
    pub fn load(path: &Path, overrides: &[Override]) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: Value = serde_yaml::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Mapping(mut doc) = raw else {
            return Err(ManifestError::NotAMapping(path.to_path_buf()));
        };

        apply_overrides(&mut doc, overrides)?;

        serde_yaml::from_value(Value::Mapping(doc)).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory of the base project.
    ///
    /// Manifests live one level below the projects root
    /// (`<root>/manifests/<target>.yaml`); the base project is resolved
    /// against that root and must stay inside it.
    pub fn base_project_dir(&self, manifest_path: &Path) -> Result<PathBuf, ManifestError> {
        let root = manifest_path
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| ManifestError::NoProjectsRoot(manifest_path.to_path_buf()))?;

        let relative = Path::new(&self.base_project);
        let inside = !self.base_project.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside {
            return Err(ManifestError::BaseProjectOutsideRoot(self.base_project.clone()));
        }

        Ok(root.join(relative))
    }
}

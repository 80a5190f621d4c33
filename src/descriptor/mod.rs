//! SLC project descriptor (`*.slcp`) model
//!
//! Only the fields the synthesizer touches are typed. Everything else in the
//! file (project name, labels, component instances, entry conditions, ...)
//! is carried through verbatim in the `extra` maps.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// File extension of project descriptors
pub const DESCRIPTOR_EXTENSION: &str = "slcp";

/// Errors for descriptor loading and writing
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("no .slcp descriptor found in {0}")]
    NotFound(PathBuf),

    #[error("expected one .slcp descriptor in {dir}, found {}", .found.len())]
    Ambiguous { dir: PathBuf, found: Vec<PathBuf> },
}

/// A component reference (`{id: ..., instance: [...]}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub id: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl ComponentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Mapping::new(),
        }
    }
}

/// A `{name, value}` entry from the `configuration` or `define` lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,

    #[serde(deserialize_with = "deserialize_scalar_string")]
    pub value: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            extra: Mapping::new(),
        }
    }
}

/// An SDK extension the project depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkExtension {
    pub id: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// Chip/board-agnostic build description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    #[serde(default)]
    pub component: Vec<ComponentRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<NamedValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub define: Vec<NamedValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toolchain_settings: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sdk_extension: Vec<SdkExtension>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl ProjectDescriptor {
    /// Parse a descriptor from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Serialize to YAML text
    pub fn to_yaml(&self) -> Result<String, DescriptorError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load a descriptor file
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| DescriptorError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the descriptor to `path`
    pub fn write(&self, path: &Path) -> Result<(), DescriptorError> {
        let yaml = self.to_yaml()?;
        fs::write(path, yaml).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Names set through the descriptor's own `define` list
    pub fn define_names(&self) -> impl Iterator<Item = &str> {
        self.define.iter().map(|d| d.name.as_str())
    }
}

/// Find the single `*.slcp` file directly inside `dir`
pub fn find_descriptor(dir: &Path) -> Result<PathBuf, DescriptorError> {
    let entries = fs::read_dir(dir).map_err(|source| DescriptorError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DescriptorError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == DESCRIPTOR_EXTENSION) {
            found.push(path);
        }
    }

    match found.len() {
        0 => Err(DescriptorError::NotFound(dir.to_path_buf())),
        1 => Ok(found.remove(0)),
        _ => {
            found.sort();
            Err(DescriptorError::Ambiguous {
                dir: dir.to_path_buf(),
                found,
            })
        }
    }
}

/// Render a YAML scalar the way configuration values are written.
///
/// Booleans become `True`/`False` and null becomes `None`, matching the
/// spelling existing manifests rely on. Sequences and mappings have no
/// string form.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => Some("None".to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn deserialize_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_string(&value)
        .ok_or_else(|| serde::de::Error::custom("expected a scalar configuration value"))
}

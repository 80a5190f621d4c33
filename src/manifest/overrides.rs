//! `key=JSON` manifest overrides
//!
//! Overrides replace whole top-level manifest keys before the manifest is
//! validated. They are applied in command-line order, so the last override
//! for a key wins.

use std::str::FromStr;

use serde_yaml::{Mapping, Value};

/// Errors for override parsing
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("override must be of the form `key=json`: {0}")]
    MissingSeparator(String),

    #[error("override key is empty: {0}")]
    EmptyKey(String),

    #[error("invalid JSON in override for `{key}`: {source}")]
    InvalidJson {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("override for `{key}` cannot be represented as YAML: {source}")]
    Convert {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A single `key=JSON` override
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub key: String,
    pub value: serde_json::Value,
}

impl FromStr for Override {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, json) = s
            .split_once('=')
            .ok_or_else(|| OverrideError::MissingSeparator(s.to_string()))?;

        if key.is_empty() {
            return Err(OverrideError::EmptyKey(s.to_string()));
        }

        let value = serde_json::from_str(json).map_err(|source| OverrideError::InvalidJson {
            key: key.to_string(),
            source,
        })?;

        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

/// Apply overrides to a raw manifest document, in order
pub fn apply_overrides(doc: &mut Mapping, overrides: &[Override]) -> Result<(), OverrideError> {
    for o in overrides {
        let value: Value = serde_yaml::to_value(&o.value).map_err(|source| OverrideError::Convert {
            key: o.key.clone(),
            source,
        })?;
        doc.insert(Value::String(o.key.clone()), value);
    }
    Ok(())
}

//! Tool configuration
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Host config (`$XDG_CONFIG_HOME/slcp-synth/config.toml`)
//! 3. Command-line flags

mod defaults;
mod merge;

pub use defaults::{BuiltinDefaults, POSTBUILD_RELATIVE};
pub use merge::{deep_merge, merge_layers};

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::toolchain::BuildSystem;

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "slcp-synth";
/// Host config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("no {0} configured and no default on this platform")]
    Missing(&'static str),

    #[error("{key} folder {} does not exist", .path.display())]
    NotADirectory { key: &'static str, path: PathBuf },
}

/// Where a layer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,
    /// File path for file layers
    pub path: Option<PathBuf>,
    /// SHA-256 of the raw file bytes
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    sdk: Option<PathBuf>,
    toolchain: Option<PathBuf>,
    postbuild: Option<PathBuf>,
    build_system: Option<BuildSystem>,
    git_repo: Option<PathBuf>,
}

/// Resolved tool configuration
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// SDK root
    pub sdk: PathBuf,
    /// GNU ARM toolchain root
    pub toolchain: PathBuf,
    /// Post-build executable that packages the GBL
    pub postbuild: PathBuf,
    pub build_system: BuildSystem,
    /// Repository whose revision feeds `git_repo_hash`
    pub git_repo: PathBuf,
    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl ToolConfig {
    /// Build from the platform defaults, an optional host file and CLI values
    pub fn build(host_config: Option<&Path>, cli: Value) -> Result<Self, ConfigError> {
        Self::build_with_defaults(&BuiltinDefaults::default(), host_config, cli)
    }

    pub fn build_with_defaults(
        defaults: &BuiltinDefaults,
        host_config: Option<&Path>,
        cli: Value,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![defaults.to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = host_config.filter(|p| p.exists()) {
            let (value, digest) = load_toml_file(path)?;
            debug!(path = %path.display(), digest = %digest, "loaded host config");
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Host,
                path: Some(path.to_path_buf()),
                digest: Some(digest),
            });
        }

        layers.push(cli);
        sources.push(ConfigSource {
            origin: ConfigOrigin::Cli,
            path: None,
            digest: None,
        });

        let raw: RawConfig = serde_json::from_value(merge_layers(layers))?;
        Self::resolve(raw, sources)
    }

    fn resolve(raw: RawConfig, sources: Vec<ConfigSource>) -> Result<Self, ConfigError> {
        let sdk = ensure_dir("sdk", raw.sdk)?;
        let toolchain = ensure_dir("toolchain", raw.toolchain)?;
        let git_repo = raw
            .git_repo
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| PathBuf::from("."));
        let postbuild = raw
            .postbuild
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| git_repo.join(POSTBUILD_RELATIVE));

        Ok(Self {
            sdk,
            toolchain,
            postbuild,
            build_system: raw.build_system.unwrap_or_default(),
            git_repo,
            sources,
        })
    }
}

/// Default host config location
pub fn host_config_path() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| defaults::home_dir().map(|home| home.join(".config")))?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn ensure_dir(key: &'static str, path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let path = expand_home(&path.ok_or(ConfigError::Missing(key))?);
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory { key, path });
    }
    Ok(path)
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), defaults::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = hex::encode(Sha256::digest(text.as_bytes()));

    let table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok((toml_to_json(toml::Value::Table(table)), digest))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

//! Built-in defaults (lowest layer)

use std::env;
use std::path::PathBuf;

use serde_json::{json, Map, Value};

use crate::toolchain::BuildSystem;

/// Toolchain bundled with Simplicity Studio on macOS
const MACOS_TOOLCHAIN: &str =
    "/Applications/Simplicity Studio.app/Contents/Eclipse/developer/toolchains/gnu_arm/12.2.rel1_2023.7";

/// SDK location relative to the home directory on macOS
const MACOS_SDK: &str = "SimplicityStudio/SDKs/gecko_sdk";

/// Post-build tool location relative to the repository root
pub const POSTBUILD_RELATIVE: &str = "tools/create_gbl.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDefaults {
    /// SDK root, only known on macOS
    pub sdk: Option<PathBuf>,
    /// GNU ARM toolchain root, only known on macOS
    pub toolchain: Option<PathBuf>,
    pub build_system: BuildSystem,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                sdk: home_dir().map(|home| home.join(MACOS_SDK)),
                toolchain: Some(PathBuf::from(MACOS_TOOLCHAIN)),
                build_system: BuildSystem::default(),
            }
        } else {
            Self {
                sdk: None,
                toolchain: None,
                build_system: BuildSystem::default(),
            }
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a JSON layer for merging
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(sdk) = &self.sdk {
            map.insert("sdk".into(), json!(sdk.to_string_lossy()));
        }
        if let Some(toolchain) = &self.toolchain {
            map.insert("toolchain".into(), json!(toolchain.to_string_lossy()));
        }
        map.insert("build_system".into(), json!(self.build_system.as_str()));
        Value::Object(map)
    }
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

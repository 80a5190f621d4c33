//! External tool ports
//!
//! The synthesizer drives two external collaborators:
//! - a project generator (`slc`) that turns a descriptor into a build tree
//! - a build driver (CMake+Ninja or Make) that compiles and packages it
//!
//! Both sit behind traits so the pipeline can run against fakes in tests.

mod driver;
mod slc;

pub use driver::{driver_for, CmakeNinjaDriver, MakeDriver};
pub use slc::{check_sdk_extensions, SlcGenerator, SLC_EXECUTABLES};

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Toolchain identifier passed to the generator
pub const GENERATOR_TOOLCHAIN: &str = "toolchain_gcc";

/// Kind of build tree the generator emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    #[default]
    Cmake,
    Makefile,
}

impl BuildSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystem::Cmake => "cmake",
            BuildSystem::Makefile => "makefile",
        }
    }

    /// Root of the generated CMake tree
    pub fn cmake_root(build_dir: &Path, project: &str) -> PathBuf {
        build_dir.join(format!("{project}_cmake"))
    }

    /// Where the build driver leaves the packaged artifact
    pub fn artifact_path(&self, build_dir: &Path, project: &str) -> PathBuf {
        match self {
            BuildSystem::Cmake => Self::cmake_root(build_dir, project).join(format!("{project}.gbl")),
            BuildSystem::Makefile => build_dir.join("build/debug").join(format!("{project}.gbl")),
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildSystem {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmake" => Ok(BuildSystem::Cmake),
            "makefile" => Ok(BuildSystem::Makefile),
            other => Err(ToolError::UnknownBuildSystem(other.to_string())),
        }
    }
}

/// External tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("none of {} found in PATH", .candidates.join(", "))]
    NotFound { candidates: Vec<String> },

    #[error("referenced extension not present in SDK: {0}")]
    MissingExtension(PathBuf),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed with {status}")]
    Failed { tool: String, status: String },

    #[error("unknown build system `{0}` (expected cmake or makefile)")]
    UnknownBuildSystem(String),

    #[error("build artifact not produced: {0}")]
    MissingArtifact(PathBuf),
}

/// Inputs for one generator run
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// Synthesized project descriptor
    pub descriptor: &'a Path,
    /// Export destination (the build directory)
    pub destination: &'a Path,
    /// SDK root
    pub sdk: &'a Path,
    /// Toolchain identifier understood by the generator
    pub toolchain: &'a str,
    pub build_system: BuildSystem,
}

/// Inputs for one build driver run
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub build_dir: &'a Path,
    /// Project name (stem of the descriptor and generated files)
    pub project: &'a str,
    pub sdk: &'a Path,
    /// GNU ARM toolchain root
    pub toolchain: &'a Path,
    /// Post-build executable that packages the GBL
    pub postbuild: &'a Path,
}

/// Project generator port
pub trait ProjectGenerator {
    /// Materialize a build tree, including config headers under
    /// `autogen/` and `config/`, from the descriptor
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<(), ToolError>;
}

/// Build driver port
pub trait BuildDriver {
    fn build_system(&self) -> BuildSystem;

    /// Build the generated tree and return the packaged artifact
    fn build(&self, request: &BuildRequest<'_>) -> Result<PathBuf, ToolError>;
}

/// Find the first of `candidates` on `PATH`
pub fn find_executable(candidates: &[&str]) -> Result<PathBuf, ToolError> {
    let path = env::var_os("PATH").unwrap_or_default();
    find_in_dirs(candidates, env::split_paths(&path).collect())
}

/// Find the first of `candidates` in `dirs`, in candidate-major order
fn find_in_dirs(candidates: &[&str], dirs: Vec<PathBuf>) -> Result<PathBuf, ToolError> {
    for name in candidates {
        for dir in &dirs {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Ok(candidate);
            }
        }
    }

    Err(ToolError::NotFound {
        candidates: candidates.iter().map(|s| s.to_string()).collect(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a command to completion, failing on spawn errors and nonzero exit
pub(crate) fn run_checked(command: &mut Command, tool: &str) -> Result<(), ToolError> {
    debug!(command = ?command, "running external tool");

    let status = command.status().map_err(|source| ToolError::Spawn {
        tool: tool.to_string(),
        source,
    })?;

    if !status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: status.to_string(),
        });
    }

    Ok(())
}

//! Native build drivers

use std::path::PathBuf;
use std::process::Command;
use std::thread;

use tracing::info;

use super::{run_checked, BuildDriver, BuildRequest, BuildSystem, ToolError};

/// Environment variable naming the GNU ARM toolchain root
pub const ARM_GCC_DIR: &str = "ARM_GCC_DIR";

/// Environment variable naming the post-build executable
pub const POST_BUILD_EXE: &str = "POST_BUILD_EXE";

/// Configures the generated CMake tree with Ninja and builds it
#[derive(Debug, Clone, Default)]
pub struct CmakeNinjaDriver;

impl BuildDriver for CmakeNinjaDriver {
    fn build_system(&self) -> BuildSystem {
        BuildSystem::Cmake
    }

    fn build(&self, request: &BuildRequest<'_>) -> Result<PathBuf, ToolError> {
        let root = BuildSystem::cmake_root(request.build_dir, request.project);
        info!(root = %root.display(), "building with cmake + ninja");

        let mut configure = Command::new("cmake");
        configure
            .args(["-G", "Ninja", "-DCMAKE_TOOLCHAIN_FILE=toolchain.cmake", "."])
            .current_dir(&root)
            .env(ARM_GCC_DIR, request.toolchain)
            .env(POST_BUILD_EXE, request.postbuild);
        run_checked(&mut configure, "cmake")?;

        let mut ninja = Command::new("ninja");
        ninja.arg("-C").arg(&root);
        run_checked(&mut ninja, "ninja")?;

        existing_artifact(self.build_system().artifact_path(request.build_dir, request.project))
    }
}

/// Builds the generated Makefile project with parallel make
#[derive(Debug, Clone, Default)]
pub struct MakeDriver;

impl BuildDriver for MakeDriver {
    fn build_system(&self) -> BuildSystem {
        BuildSystem::Makefile
    }

    fn build(&self, request: &BuildRequest<'_>) -> Result<PathBuf, ToolError> {
        let jobs = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        info!(build_dir = %request.build_dir.display(), jobs, "building with make");

        let mut make = Command::new("make");
        make.arg("-C")
            .arg(request.build_dir)
            .arg("-f")
            .arg(format!("{}.Makefile", request.project))
            .arg(format!("-j{jobs}"))
            .arg(format!("{ARM_GCC_DIR}={}", request.toolchain.display()))
            .arg(format!("{POST_BUILD_EXE}={}", request.postbuild.display()));
        run_checked(&mut make, "make")?;

        existing_artifact(self.build_system().artifact_path(request.build_dir, request.project))
    }
}

fn existing_artifact(path: PathBuf) -> Result<PathBuf, ToolError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ToolError::MissingArtifact(path))
    }
}

/// The real driver for a build system
pub fn driver_for(build_system: BuildSystem) -> Box<dyn BuildDriver> {
    match build_system {
        BuildSystem::Cmake => Box::new(CmakeNinjaDriver),
        BuildSystem::Makefile => Box::new(MakeDriver),
    }
}

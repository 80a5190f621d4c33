//! SLC project generator

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::{find_executable, run_checked, GenerateRequest, ProjectGenerator, ToolError};
use crate::descriptor::SdkExtension;

/// Generator executables, in lookup order (plain `slc` does not run on macOS)
pub const SLC_EXECUTABLES: &[&str] = &["slc-cli", "slc"];

/// `slc generate` invocation
#[derive(Debug, Clone)]
pub struct SlcGenerator {
    executable: PathBuf,
}

impl SlcGenerator {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Locate `slc-cli` or `slc` on `PATH`
    pub fn locate() -> Result<Self, ToolError> {
        find_executable(SLC_EXECUTABLES).map(Self::new)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl ProjectGenerator for SlcGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<(), ToolError> {
        info!(
            descriptor = %request.descriptor.display(),
            output = request.build_system.as_str(),
            "generating project"
        );

        let mut command = Command::new(&self.executable);
        command
            .arg("generate")
            .arg("--project-file")
            .arg(request.descriptor)
            .arg("--export-destination")
            .arg(request.destination)
            .arg("--sdk")
            .arg(request.sdk)
            .arg("--toolchain")
            .arg(request.toolchain)
            .arg("--output-type")
            .arg(request.build_system.as_str());

        run_checked(&mut command, "slc")
    }
}

/// Check that every SDK extension the project references is installed
pub fn check_sdk_extensions(sdk: &Path, extensions: &[SdkExtension]) -> Result<(), ToolError> {
    for extension in extensions {
        let expected = sdk.join("extension").join(format!("{}_extension", extension.id));
        if !expected.is_dir() {
            return Err(ToolError::MissingExtension(expected));
        }
    }
    Ok(())
}

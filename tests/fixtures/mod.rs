//! Test fixtures for pipeline tests
//!
//! Provides:
//! - a projects root with one base project and one target manifest
//! - an SDK directory with extension folders
//! - fake generator and build driver ports

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use slcp_synth::toolchain::{
    BuildDriver, BuildRequest, BuildSystem, GenerateRequest, ProjectGenerator, ToolError,
};
use slcp_synth::PipelineConfig;
use tempfile::TempDir;

pub const BASE_PROJECT: &str = "zwave_app";

pub const BASE_SLCP: &str = r#"project_name: zwave_app
label: Z-Wave app
component:
  - id: brd4204d
  - id: efr32zg23b010f512im48
  - id: zw_core
  - id: led_driver
    instance: [led0]
configuration:
  - name: SL_TX_POWER
    value: "5"
  - name: SL_RETRIES
    value: "3"
define:
  - name: ZW_BETA
    value: "0"
toolchain_settings:
  - option: gcc_linker_option
    value: -Wl,--gc-sections
sdk_extension:
  - id: zwave
"#;

pub const MANIFEST: &str = r#"base_project: zwave_app
device: EFR32ZG23B020F512IM48
add_components:
  - id: zw_region_us
remove_components:
  - id: led_driver
    instance: [led0]
configuration:
  SL_TX_POWER: 14
slcp_defines:
  ZW_BETA: 1
c_defines:
  BUILD_REV: '"rev-{git_repo_hash}"'
  APP_FLAG: 1
gbl:
  fw_type: ncp
  version: 1.2.3
toolchain_settings:
  - option: optimize
    value: size
"#;

/// Header with a guarded placeholder for `APP_FLAG`
pub const APP_CONFIG_H: &str = "#ifndef APP_CONFIG_H
#define APP_CONFIG_H

#ifndef APP_FLAG
#define APP_FLAG                0
#endif

#endif";

/// Header with a warning placeholder for `BUILD_REV`
pub const VERSION_H: &str = "#pragma once
#warning \"BUILD_REV not configured\"
#define BUILD_REV  \"unset\"";

pub const CMAKE_CONFIG: &str = "target_compile_options(zwave_app PUBLIC
    $<$<COMPILE_LANGUAGE:C>:-imacros sl_gcc_preinclude.h>
)
";

/// Directory layout of one test run
pub struct Workspace {
    pub dir: TempDir,
    pub manifest: PathBuf,
    pub base: PathBuf,
    pub build: PathBuf,
    pub sdk: PathBuf,
    pub toolchain: PathBuf,
    pub output: PathBuf,
}

pub fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_manifest(MANIFEST)
    }

    pub fn with_manifest(manifest: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("projects");
        let base = root.join(BASE_PROJECT);

        write(&base.join("zwave_app.slcp"), BASE_SLCP);
        write(&base.join("app.c"), "int main(void) { return 0; }\n");
        write(&base.join("config/sl_rail_util_pti_config.h"), "#define STALE 1\n");
        write(&base.join("config/sl_memory_config.h"), "#define STALE 1\n");
        write(&base.join("config/app_settings.h"), "#define KEEP 1\n");
        write(&base.join("autogen/sl_stale.h"), "#define STALE 1\n");
        write(&base.join(".git/HEAD"), "ref: refs/heads/main\n");

        let manifest_path = root.join("manifests/target.yaml");
        write(&manifest_path, manifest);

        let sdk = dir.path().join("sdk");
        fs::create_dir_all(sdk.join("extension/zwave_extension")).unwrap();
        let toolchain = dir.path().join("gcc");
        fs::create_dir_all(&toolchain).unwrap();

        let build = dir.path().join("build");
        let output = dir.path().join("out/firmware.gbl");

        Self {
            manifest: manifest_path,
            base,
            build,
            sdk,
            toolchain,
            output,
            dir,
        }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            manifest_path: self.manifest.clone(),
            output_artifact: self.output.clone(),
            build_dir: self.build.clone(),
            sdk: self.sdk.clone(),
            toolchain: self.toolchain.clone(),
            postbuild: PathBuf::from("/opt/tools/create_gbl.py"),
            overrides: Vec::new(),
        }
    }

    pub fn read_build(&self, relative: &str) -> String {
        fs::read_to_string(self.build.join(relative)).unwrap()
    }
}

/// What the fake generator was asked to do
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub descriptor: PathBuf,
    pub destination: PathBuf,
    pub sdk: PathBuf,
    pub toolchain: String,
    pub build_system: BuildSystem,
}

/// Writes a fixed set of headers and build files into the destination
pub struct FakeGenerator {
    /// (path relative to the build directory, contents)
    pub headers: Vec<(String, String)>,
    pub calls: RefCell<Vec<GenerateCall>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::with_headers(&[
            ("autogen/sl_version.h", VERSION_H),
            ("config/app_config.h", APP_CONFIG_H),
        ])
    }

    pub fn with_headers(headers: &[(&str, &str)]) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ProjectGenerator for FakeGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<(), ToolError> {
        self.calls.borrow_mut().push(GenerateCall {
            descriptor: request.descriptor.to_path_buf(),
            destination: request.destination.to_path_buf(),
            sdk: request.sdk.to_path_buf(),
            toolchain: request.toolchain.to_string(),
            build_system: request.build_system,
        });

        let project = request
            .descriptor
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap();

        for (path, contents) in &self.headers {
            write(&request.destination.join(path), contents);
        }

        match request.build_system {
            BuildSystem::Cmake => write(
                &BuildSystem::cmake_root(request.destination, project)
                    .join(format!("{project}.cmake")),
                CMAKE_CONFIG,
            ),
            BuildSystem::Makefile => write(
                &request.destination.join(format!("{project}.Makefile")),
                "all:\n\t@echo build\n",
            ),
        }
        Ok(())
    }
}

/// Generator standing in for a missing `slc`
pub struct FailingGenerator;

impl ProjectGenerator for FailingGenerator {
    fn generate(&self, _request: &GenerateRequest<'_>) -> Result<(), ToolError> {
        Err(ToolError::Failed {
            tool: "slc".to_string(),
            status: "exit status: 1".to_string(),
        })
    }
}

/// Writes a fake GBL where the real driver would leave it
pub struct FakeDriver {
    pub system: BuildSystem,
    pub builds: RefCell<Vec<PathBuf>>,
}

impl FakeDriver {
    pub fn new(system: BuildSystem) -> Self {
        Self {
            system,
            builds: RefCell::new(Vec::new()),
        }
    }
}

impl BuildDriver for FakeDriver {
    fn build_system(&self) -> BuildSystem {
        self.system
    }

    fn build(&self, request: &BuildRequest<'_>) -> Result<PathBuf, ToolError> {
        self.builds.borrow_mut().push(request.build_dir.to_path_buf());
        let artifact = self.system.artifact_path(request.build_dir, request.project);
        write(&artifact, "GBL");
        Ok(artifact)
    }
}

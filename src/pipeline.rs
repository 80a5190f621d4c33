//! End-to-end synthesis pipeline
//!
//! Stages run strictly in order:
//! 1. load the manifest and apply overrides
//! 2. locate and load the base project descriptor
//! 3. resolve components and merge configuration/defines
//! 4. materialize the project into the build directory
//! 5. run the project generator
//! 6. inject `c_defines` into the generated headers
//! 7. fix up the generated build files
//! 8. build and copy the artifact to its destination

use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

use slcp_defines::{
    inject_headers, DefineBinding, DefineInjector, InjectError, InjectionReport, TemplateEnv,
};
use tracing::{debug, info};

use crate::config::{ConfigError, ToolConfig};
use crate::descriptor::{find_descriptor, DescriptorError, ProjectDescriptor};
use crate::manifest::{Manifest, ManifestError, Override};
use crate::materialize::{MaterializeError, Materializer, CONFIG_DIR};
use crate::resolve::{synthesize, SynthesizedProject};
use crate::rewrite::{
    append_postbuild_target, cmake_config_path, rewrite_cmake_file, standard_remaps, RewriteError,
};
use crate::toolchain::{
    check_sdk_extensions, BuildDriver, BuildRequest, BuildSystem, GenerateRequest,
    ProjectGenerator, ToolError, GENERATOR_TOOLCHAIN,
};

/// Generated header roots, scanned in this order
pub const HEADER_ROOTS: &[&str] = &["autogen", CONFIG_DIR];

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Process exit code for this error
    ///
    /// - 2: bad input (manifest, descriptor, config, templates)
    /// - 3: headers and requested defines disagree
    /// - 4: an external tool is missing or failed
    /// - 1: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) | PipelineError::Manifest(_) => 2,
            PipelineError::Descriptor(DescriptorError::Io { .. })
            | PipelineError::Descriptor(DescriptorError::Serialize(_)) => 1,
            PipelineError::Descriptor(_) => 2,
            PipelineError::Materialize(_) => 1,
            PipelineError::Tool(_) => 4,
            PipelineError::Inject(InjectError::Template { .. }) => 2,
            PipelineError::Inject(InjectError::Io { .. }) => 1,
            PipelineError::Inject(_) => 3,
            PipelineError::Rewrite(RewriteError::UnsafePath { .. }) => 2,
            PipelineError::Rewrite(_) => 1,
            PipelineError::Io { .. } => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Inputs of one synthesis run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub manifest_path: PathBuf,
    /// Where the packaged artifact is copied
    pub output_artifact: PathBuf,
    /// Working directory for the materialized project
    pub build_dir: PathBuf,
    pub sdk: PathBuf,
    pub toolchain: PathBuf,
    pub postbuild: PathBuf,
    /// Manifest overrides, applied in order
    pub overrides: Vec<Override>,
}

impl PipelineConfig {
    pub fn new(
        manifest_path: PathBuf,
        output_artifact: PathBuf,
        build_dir: PathBuf,
        tools: &ToolConfig,
    ) -> Self {
        Self {
            manifest_path,
            output_artifact,
            build_dir,
            sdk: tools.sdk.clone(),
            toolchain: tools.toolchain.clone(),
            postbuild: tools.postbuild.clone(),
            overrides: Vec::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<Override>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// The synthesized project written to the build directory
#[derive(Debug, Clone)]
pub struct PreparedProject {
    pub manifest: Manifest,
    /// Stem of the descriptor and of every generated build file
    pub name: String,
    pub synthesized: SynthesizedProject,
    pub descriptor_path: PathBuf,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub project: String,
    pub artifact: PathBuf,
    /// Headers rewritten by define injection
    pub patched_headers: Vec<PathBuf>,
    pub bindings: Vec<DefineBinding>,
}

/// Synthesis pipeline over a generator and a build driver
pub struct Pipeline<'a> {
    config: PipelineConfig,
    generator: &'a dyn ProjectGenerator,
    driver: &'a dyn BuildDriver,
    env: TemplateEnv,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: PipelineConfig,
        generator: &'a dyn ProjectGenerator,
        driver: &'a dyn BuildDriver,
        env: TemplateEnv,
    ) -> Self {
        Self {
            config,
            generator,
            driver,
            env,
        }
    }

    pub fn build_system(&self) -> BuildSystem {
        self.driver.build_system()
    }

    /// Run every stage and copy the artifact to its destination
    pub fn run(&self) -> PipelineResult<PipelineSummary> {
        let prepared = self.prepare()?;
        self.generate(&prepared)?;
        let injection = self.inject(&prepared)?;
        self.rewrite(&prepared.name)?;
        let artifact = self.build(&prepared.name)?;

        Ok(PipelineSummary {
            project: prepared.name,
            artifact,
            patched_headers: injection.patched,
            bindings: injection.bindings,
        })
    }

    /// Load inputs, synthesize the descriptor and materialize the project
    pub fn prepare(&self) -> PipelineResult<PreparedProject> {
        let manifest_path = &self.config.manifest_path;
        let manifest = Manifest::load(manifest_path, &self.config.overrides)?;
        info!(
            manifest = %manifest_path.display(),
            device = %manifest.device,
            overrides = self.config.overrides.len(),
            "loaded manifest"
        );

        let base_dir = manifest.base_project_dir(manifest_path)?;
        let name = base_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ManifestError::BaseProjectOutsideRoot(manifest.base_project.clone()))?;

        let base_descriptor = find_descriptor(&base_dir)?;
        let base = ProjectDescriptor::load(&base_descriptor)?;
        debug!(descriptor = %base_descriptor.display(), "loaded base project");

        let synthesized = synthesize(&base, &manifest);
        info!(
            components = synthesized.descriptor.component.len(),
            stripped = synthesized.components.stripped.len(),
            "resolved components"
        );

        let materialized = Materializer::new(base_dir, self.config.build_dir.clone())?.materialize(
            &base_descriptor,
            &name,
            &synthesized.descriptor,
            &manifest.gbl,
        )?;

        Ok(PreparedProject {
            manifest,
            name,
            synthesized,
            descriptor_path: materialized.descriptor_path,
        })
    }

    /// Clear the previous generator output, check SDK extensions and run the generator
    pub fn generate(&self, prepared: &PreparedProject) -> PipelineResult<()> {
        let cmake_root = BuildSystem::cmake_root(&self.config.build_dir, &prepared.name);
        match fs::remove_dir_all(&cmake_root) {
            Ok(()) => debug!(path = %cmake_root.display(), "removed previous generator output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PipelineError::Io {
                    path: cmake_root,
                    source,
                })
            }
        }

        check_sdk_extensions(&self.config.sdk, &prepared.synthesized.descriptor.sdk_extension)?;

        let descriptor = absolute(&prepared.descriptor_path)?;
        let destination = absolute(&self.config.build_dir)?;
        let sdk = absolute(&self.config.sdk)?;
        let request = GenerateRequest {
            descriptor: &descriptor,
            destination: &destination,
            sdk: &sdk,
            toolchain: GENERATOR_TOOLCHAIN,
            build_system: self.build_system(),
        };
        info!(build_system = %request.build_system, "generating project");
        self.generator.generate(&request)?;
        Ok(())
    }

    /// Inject the manifest's `c_defines` into generated headers
    pub fn inject(&self, prepared: &PreparedProject) -> PipelineResult<InjectionReport> {
        let injector = DefineInjector::new(
            prepared.manifest.c_defines.entries().iter().cloned(),
            self.env.clone(),
        )
        .with_descriptor_defines(prepared.synthesized.descriptor.define_names());

        let roots: Vec<PathBuf> = HEADER_ROOTS
            .iter()
            .map(|root| self.config.build_dir.join(root))
            .collect();

        let report = inject_headers(&roots, injector)?;
        info!(
            defines = report.bindings.len(),
            headers = report.patched.len(),
            "injected defines"
        );
        Ok(report)
    }

    /// Apply build-system specific fixes to the generated files
    pub fn rewrite(&self, project: &str) -> PipelineResult<()> {
        let build_dir = &self.config.build_dir;
        match self.build_system() {
            BuildSystem::Cmake => {
                let remaps = standard_remaps(&self.config.sdk, build_dir, &self.config.toolchain)?;
                let cmake_config =
                    cmake_config_path(&BuildSystem::cmake_root(build_dir, project), project);
                rewrite_cmake_file(&cmake_config, &remaps)?;
                info!(path = %cmake_config.display(), "rewrote cmake config");
            }
            BuildSystem::Makefile => {
                let makefile = append_postbuild_target(
                    build_dir,
                    project,
                    &self.config.postbuild,
                    &self.config.sdk,
                )?;
                info!(path = %makefile.display(), "added post-build target");
            }
        }
        Ok(())
    }

    /// Build and copy the artifact to the output path
    pub fn build(&self, project: &str) -> PipelineResult<PathBuf> {
        let build_dir = absolute(&self.config.build_dir)?;
        let sdk = absolute(&self.config.sdk)?;
        let toolchain = absolute(&self.config.toolchain)?;
        let request = BuildRequest {
            build_dir: &build_dir,
            project,
            sdk: &sdk,
            toolchain: &toolchain,
            postbuild: &self.config.postbuild,
        };
        let artifact = self.driver.build(&request)?;

        let output = &self.config.output_artifact;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&artifact, output).map_err(|source| PipelineError::Io {
            path: artifact.clone(),
            source,
        })?;

        info!(artifact = %output.display(), "wrote artifact");
        Ok(output.clone())
    }
}

fn absolute(path: &Path) -> PipelineResult<PathBuf> {
    path::absolute(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

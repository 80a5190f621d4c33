//! SLC project synthesizer
//!
//! Retargets a chip/board-agnostic Simplicity Studio project to a concrete
//! device using a per-target manifest, generates it with `slc`, injects
//! configured C defines into the generated headers and builds a GBL.

pub mod config;
pub mod descriptor;
pub mod manifest;
pub mod materialize;
pub mod pipeline;
pub mod resolve;
pub mod revision;
pub mod rewrite;
pub mod toolchain;

pub use config::{ConfigError, ToolConfig};
pub use descriptor::{ComponentRef, NamedValue, ProjectDescriptor};
pub use manifest::{Manifest, Override};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineResult, PipelineSummary};
pub use resolve::{synthesize, SynthesizedProject};
pub use toolchain::{BuildDriver, BuildSystem, ProjectGenerator, ToolError};

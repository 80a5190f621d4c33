//! `slcp-synth` command-line entry point

use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde_json::{Map, Value};
use slcp_synth::config::{host_config_path, ToolConfig};
use slcp_synth::manifest::Override;
use slcp_synth::pipeline::{Pipeline, PipelineConfig, PipelineError};
use slcp_synth::revision;
use slcp_synth::toolchain::{driver_for, BuildSystem, SlcGenerator};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slcp-synth")]
#[command(about = "Synthesize and build a device-specific SLC project", version)]
struct Cli {
    /// Firmware build manifest
    #[arg(long)]
    manifest: PathBuf,

    /// Output GBL file
    #[arg(long)]
    output_gbl: PathBuf,

    /// Temporary build directory
    #[arg(long)]
    build_dir: PathBuf,

    /// Build system [default: cmake]
    #[arg(long)]
    build_system: Option<BuildSystem>,

    /// Path to the Gecko SDK
    #[arg(long)]
    sdk: Option<PathBuf>,

    /// Path to the GCC toolchain
    #[arg(long)]
    toolchain: Option<PathBuf>,

    /// Post-build executable
    #[arg(long)]
    postbuild: Option<PathBuf>,

    /// Repository whose revision is substituted for `{git_repo_hash}`
    #[arg(long)]
    git_repo: Option<PathBuf>,

    /// Override a manifest key with JSON (`key=json`, repeatable)
    #[arg(long = "override", value_name = "KEY=JSON")]
    overrides: Vec<Override>,

    /// Tool config file (default: ~/.config/slcp-synth/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    /// Flags that take part in config layering
    fn config_layer(&self) -> Value {
        let mut layer = Map::new();
        let paths = [
            ("sdk", &self.sdk),
            ("toolchain", &self.toolchain),
            ("postbuild", &self.postbuild),
            ("git_repo", &self.git_repo),
        ];
        for (key, path) in paths {
            if let Some(path) = path {
                layer.insert(key.into(), Value::String(path.to_string_lossy().into_owned()));
            }
        }
        if let Some(build_system) = self.build_system {
            layer.insert("build_system".into(), Value::String(build_system.to_string()));
        }
        Value::Object(layer)
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let host_config = cli.config.clone().or_else(host_config_path);
    let tools = ToolConfig::build(host_config.as_deref(), cli.config_layer())?;
    for source in &tools.sources {
        debug!(
            origin = ?source.origin,
            path = ?source.path,
            digest = source.digest.as_deref().unwrap_or("-"),
            "config layer"
        );
    }

    let generator = SlcGenerator::locate()?;
    debug!(slc = %generator.executable().display(), "using project generator");
    let driver = driver_for(tools.build_system);
    let env = revision::template_env(&tools.git_repo)?;

    let config = PipelineConfig::new(cli.manifest, cli.output_gbl, cli.build_dir, &tools)
        .with_overrides(cli.overrides);
    let summary = Pipeline::new(config, &generator, driver.as_ref(), env).run()?;

    info!(
        project = %summary.project,
        artifact = %summary.artifact.display(),
        headers = summary.patched_headers.len(),
        "done"
    );
    Ok(())
}

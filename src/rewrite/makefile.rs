//! Post-build hook for generated Makefile projects

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{self, Path, PathBuf};

use super::RewriteError;
use crate::toolchain::BuildSystem;

fn absolute(path: &Path) -> Result<PathBuf, RewriteError> {
    path::absolute(path).map_err(|source| RewriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Text of the `post-build` target.
///
/// The post-build tool packages the GBL from the project's `.slpb` file.
/// Both recipe lines are prefixed with `-` so make ignores their failure.
pub fn postbuild_target(postbuild: &Path, slpb: &Path, artifact_dir: &Path, sdk: &Path) -> String {
    format!(
        "\npost-build:\n\t-{} postbuild \"{}\" --parameter build_dir:\"{}\" --parameter sdk_dir:\"{}\"\n\t-@echo ' '",
        postbuild.display(),
        slpb.display(),
        artifact_dir.display(),
        sdk.display(),
    )
}

/// Append the `post-build` target to `<build_dir>/<project>.Makefile`.
///
/// Returns the Makefile path.
pub fn append_postbuild_target(
    build_dir: &Path,
    project: &str,
    postbuild: &Path,
    sdk: &Path,
) -> Result<PathBuf, RewriteError> {
    let makefile = build_dir.join(format!("{project}.Makefile"));
    let slpb = absolute(&build_dir.join(format!("{project}.slpb")))?;
    let artifact = BuildSystem::Makefile.artifact_path(build_dir, project);
    let artifact_dir = absolute(artifact.parent().unwrap_or(build_dir))?;
    let sdk = absolute(sdk)?;

    let target = postbuild_target(postbuild, &slpb, &artifact_dir, &sdk);

    let mut file = OpenOptions::new()
        .append(true)
        .open(&makefile)
        .map_err(|source| RewriteError::Io {
            path: makefile.clone(),
            source,
        })?;
    file.write_all(target.as_bytes())
        .map_err(|source| RewriteError::Io {
            path: makefile.clone(),
            source,
        })?;

    Ok(makefile)
}

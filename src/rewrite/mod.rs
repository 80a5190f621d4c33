//! Build descriptor rewriting
//!
//! Fixes applied to the generator's output before the native build runs.

mod cmake;
mod makefile;

pub use cmake::{
    cmake_config_path, fix_shell_quoting, prefix_map_block, rewrite_cmake_config,
    rewrite_cmake_file, standard_remaps, PathRemap, LOGICAL_SDK, LOGICAL_SRC, LOGICAL_TOOLCHAIN,
};
pub use makefile::{append_postbuild_target, postbuild_target};

use std::io;
use std::path::PathBuf;

/// Errors for build descriptor rewriting
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("cannot map {path} in compile options: {reason}")]
    UnsafePath { path: PathBuf, reason: &'static str },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

//! Injection of resolved C defines into generated configuration headers.
//!
//! The project generator emits config headers with placeholder values. This
//! crate replaces the placeholders for a requested set of defines and proves
//! that every requested define was written exactly once across all headers.
//! Headers are planned entirely in memory; nothing is written unless the run
//! is consistent.

mod engine;
mod template;

pub use engine::{DefineBinding, DefineInjector, HeaderPatch};
pub use template::{TemplateEnv, TemplateError, GIT_REPO_HASH};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// Errors raised by define injection
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("{path}: guard `{guard}` does not match #define {define}")]
    GuardMismatch {
        define: String,
        guard: String,
        path: PathBuf,
    },

    #[error("{path}: guarded define {define} is also set in the project's define list")]
    GuardConflict { define: String, path: PathBuf },

    #[error("{path}: unexpected warning before #define {define}: {line}")]
    MalformedWarning {
        define: String,
        line: String,
        path: PathBuf,
    },

    #[error("invalid value template for {define}: {source}")]
    Template {
        define: String,
        #[source]
        source: TemplateError,
    },

    #[error("{}", describe_inconsistency(.double_consumed, .unused))]
    Inconsistent {
        double_consumed: Vec<String>,
        unused: Vec<String>,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_inconsistency(double_consumed: &[String], unused: &[String]) -> String {
    let mut parts = Vec::new();
    if !double_consumed.is_empty() {
        parts.push(format!("defines used twice: {}", double_consumed.join(", ")));
    }
    if !unused.is_empty() {
        parts.push(format!("defines were unused: {}", unused.join(", ")));
    }
    parts.join("; ")
}

/// Outcome of a consistent injection run
#[derive(Debug, Clone)]
pub struct InjectionReport {
    /// Headers that were rewritten, in scan order
    pub patched: Vec<PathBuf>,
    /// Final state of every requested define
    pub bindings: Vec<DefineBinding>,
}

/// List the `*.h` files directly under each root, sorted by name per root.
///
/// Roots that do not exist are skipped.
pub fn collect_headers(roots: &[PathBuf]) -> Result<Vec<PathBuf>, InjectError> {
    let mut headers = Vec::new();

    for root in roots {
        if !root.is_dir() {
            continue;
        }

        let entries = fs::read_dir(root).map_err(|source| InjectError::Io {
            path: root.clone(),
            source,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| InjectError::Io {
                path: root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "h") {
                found.push(path);
            }
        }
        found.sort();
        headers.extend(found);
    }

    Ok(headers)
}

/// Scan and patch every header under `roots`.
///
/// All headers are read and patched in memory first. If the injector
/// reports an inconsistency no file is touched.
pub fn inject_headers(
    roots: &[PathBuf],
    mut injector: DefineInjector,
) -> Result<InjectionReport, InjectError> {
    let mut patches = Vec::new();

    for header in collect_headers(roots)? {
        let text = read_header(&header)?;
        if let Some(patch) = injector.patch_text(&header, &text)? {
            patches.push(patch);
        }
    }

    let bindings = injector.finish()?;

    let mut patched = Vec::with_capacity(patches.len());
    for patch in patches {
        let summary: Vec<String> = patch
            .written
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        info!(path = %patch.path.display(), defines = %summary.join(", "), "patching header");

        fs::write(&patch.path, &patch.contents).map_err(|source| InjectError::Io {
            path: patch.path.clone(),
            source,
        })?;
        patched.push(patch.path);
    }

    Ok(InjectionReport { patched, bindings })
}

fn read_header(path: &Path) -> Result<String, InjectError> {
    fs::read_to_string(path).map_err(|source| InjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

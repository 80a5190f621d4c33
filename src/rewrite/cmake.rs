//! Generated CMake config normalization
//!
//! Two fixes are applied to `<project>_cmake/<project>.cmake`:
//! - an `add_compile_options` block with `-ffile-prefix-map` entries is
//!   prepended so objects do not embed machine-specific absolute paths
//! - generator expressions carrying `-imacros`/`-x` flags are rewritten to
//!   `SHELL:` form inside quotes, which the generator gets wrong

use std::borrow::Cow;
use std::fs;
use std::path::{self, Path, PathBuf};

use super::RewriteError;

/// Logical path the SDK root is mapped to
pub const LOGICAL_SDK: &str = "/gecko_sdk";
/// Logical path the build directory is mapped to
pub const LOGICAL_SRC: &str = "/src";
/// Logical path the toolchain root is mapped to
pub const LOGICAL_TOOLCHAIN: &str = "/toolchain";

/// Flag fragments that need `SHELL:` grouping
const SHELL_FLAGS: &[&str] = &[":-imacros ", ":-x "];
const SHELL_MARKER: &str = ">:SHELL:";

/// An absolute root and the stable path it is mapped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRemap {
    pub absolute: PathBuf,
    pub logical: String,
}

impl PathRemap {
    /// Make `path` absolute (without resolving symlinks) and map it
    pub fn new(path: &Path, logical: impl Into<String>) -> Result<Self, RewriteError> {
        let absolute = path::absolute(path).map_err(|source| RewriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            absolute,
            logical: logical.into(),
        })
    }

    /// The `-ffile-prefix-map` option for this remap.
    ///
    /// Paths containing a double quote cannot be expressed in the quoted
    /// option and are rejected; there is no escaping.
    pub fn compile_option(&self) -> Result<String, RewriteError> {
        let absolute = self.absolute.to_str().ok_or_else(|| RewriteError::UnsafePath {
            path: self.absolute.clone(),
            reason: "path is not valid UTF-8",
        })?;
        if absolute.contains('"') {
            return Err(RewriteError::UnsafePath {
                path: self.absolute.clone(),
                reason: "path contains a double quote",
            });
        }
        Ok(format!("-ffile-prefix-map={}={}", absolute, self.logical))
    }
}

/// SDK, build directory and toolchain remaps, in that order
pub fn standard_remaps(
    sdk: &Path,
    build_dir: &Path,
    toolchain: &Path,
) -> Result<Vec<PathRemap>, RewriteError> {
    Ok(vec![
        PathRemap::new(sdk, LOGICAL_SDK)?,
        PathRemap::new(build_dir, LOGICAL_SRC)?,
        PathRemap::new(toolchain, LOGICAL_TOOLCHAIN)?,
    ])
}

/// Path of the generated CMake config for `project`
pub fn cmake_config_path(cmake_root: &Path, project: &str) -> PathBuf {
    cmake_root.join(format!("{project}.cmake"))
}

/// Lines of the `add_compile_options(...)` block
pub fn prefix_map_block(remaps: &[PathRemap]) -> Result<Vec<String>, RewriteError> {
    let mut block = Vec::with_capacity(remaps.len() + 2);
    block.push("add_compile_options(".to_string());
    for remap in remaps {
        block.push(format!("    \"{}\"", remap.compile_option()?));
    }
    block.push(")".to_string());
    Ok(block)
}

/// Quote a generator-expression line that needs `SHELL:` grouping.
///
/// Lines already carrying the marker are left alone, so the fix can be
/// applied to its own output.
pub fn fix_shell_quoting(line: &str) -> Cow<'_, str> {
    if line.contains(SHELL_MARKER) || !SHELL_FLAGS.iter().any(|flag| line.contains(flag)) {
        return Cow::Borrowed(line);
    }

    Cow::Owned(format!("    \"{}\"", line.replace(">:", SHELL_MARKER).trim()))
}

/// Rewrite the text of a generated CMake config
pub fn rewrite_cmake_config(text: &str, remaps: &[PathRemap]) -> Result<String, RewriteError> {
    let mut lines = prefix_map_block(remaps)?;
    lines.extend(text.split('\n').map(|line| fix_shell_quoting(line).into_owned()));
    Ok(lines.join("\n"))
}

/// Rewrite a generated CMake config file in place
pub fn rewrite_cmake_file(path: &Path, remaps: &[PathRemap]) -> Result<(), RewriteError> {
    let text = fs::read_to_string(path).map_err(|source| RewriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rewritten = rewrite_cmake_config(&text, remaps)?;
    fs::write(path, rewritten).map_err(|source| RewriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remap(path: &str, logical: &str) -> PathRemap {
        PathRemap {
            absolute: PathBuf::from(path),
            logical: logical.to_string(),
        }
    }

    #[test]
    fn test_prefix_map_block() {
        let remaps = vec![
            remap("/opt/sdk", LOGICAL_SDK),
            remap("/work/build", LOGICAL_SRC),
            remap("/opt/gcc", LOGICAL_TOOLCHAIN),
        ];
        let block = prefix_map_block(&remaps).unwrap();
        assert_eq!(
            block,
            vec![
                "add_compile_options(",
                "    \"-ffile-prefix-map=/opt/sdk=/gecko_sdk\"",
                "    \"-ffile-prefix-map=/work/build=/src\"",
                "    \"-ffile-prefix-map=/opt/gcc=/toolchain\"",
                ")",
            ]
        );
    }

    #[test]
    fn test_quote_in_root_rejected() {
        let remaps = vec![remap("/opt/we\"ird", LOGICAL_SDK)];
        assert!(matches!(
            prefix_map_block(&remaps),
            Err(RewriteError::UnsafePath { .. })
        ));
    }

    #[test]
    fn test_remap_makes_path_absolute() {
        let r = PathRemap::new(Path::new("relative/dir"), LOGICAL_SRC).unwrap();
        assert!(r.absolute.is_absolute());
        assert!(r.absolute.ends_with("relative/dir"));
    }

    #[test]
    fn test_fix_shell_quoting() {
        assert_eq!(
            fix_shell_quoting("  $<$<COMPILE_LANGUAGE:C>:-imacros sl_gcc_preinclude.h>"),
            "    \"$<$<COMPILE_LANGUAGE:C>:SHELL:-imacros sl_gcc_preinclude.h>\""
        );
        assert_eq!(
            fix_shell_quoting("    $<$<COMPILE_LANGUAGE:ASM>:-x assembler-with-cpp>"),
            "    \"$<$<COMPILE_LANGUAGE:ASM>:SHELL:-x assembler-with-cpp>\""
        );
    }

    #[test]
    fn test_fix_shell_quoting_leaves_other_lines() {
        for line in [
            "target_compile_options(app PUBLIC",
            "    $<$<COMPILE_LANGUAGE:C>:-Os>",
            "    \"$<$<COMPILE_LANGUAGE:C>:SHELL:-imacros sl_gcc_preinclude.h>\"",
            "",
        ] {
            assert!(matches!(fix_shell_quoting(line), Cow::Borrowed(l) if l == line));
        }
    }

    #[test]
    fn test_rewrite_cmake_config() {
        let text = "target_compile_options(app PUBLIC\n    $<$<COMPILE_LANGUAGE:C>:-imacros sl_gcc_preinclude.h>\n)\n";
        let remaps = vec![remap("/opt/sdk", LOGICAL_SDK)];

        let out = rewrite_cmake_config(text, &remaps).unwrap();
        assert_eq!(
            out,
            "add_compile_options(\n    \"-ffile-prefix-map=/opt/sdk=/gecko_sdk\"\n)\n\
             target_compile_options(app PUBLIC\n    \"$<$<COMPILE_LANGUAGE:C>:SHELL:-imacros sl_gcc_preinclude.h>\"\n)\n"
        );
    }
}

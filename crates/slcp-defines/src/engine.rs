//! Line-oriented header patching.
//!
//! A generated config header typically declares an unset option as one of:
//!
//! ```c
//! #ifndef SL_OPTION                       #warning "SL_OPTION not configured"
//! #define SL_OPTION          0            #define SL_OPTION          0
//! #endif
//! ```
//!
//! The injector rewrites the `#define` with the resolved value (keeping the
//! column alignment), turns a matching `#ifndef` guard into `#if 1` and drops
//! a "not configured" warning. It tracks how often each requested define was
//! written so that [`DefineInjector::finish`] can prove every request landed
//! exactly once.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

use crate::template::TemplateEnv;
use crate::InjectError;

/// Replacement for an include guard whose value is now supplied
const ALWAYS_TRUE_GUARD: &str = "#if 1";

fn ifndef_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#ifndef\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid guard regex"))
}

fn warning_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^#warning ".*? not configured""#).expect("valid warning regex"))
}

/// A requested define and where it ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineBinding {
    /// Macro name
    pub name: String,
    /// Value template as written in the manifest
    pub template: String,
    /// Rendered value, set on first consumption
    pub value: Option<String>,
    /// Every header the define was written into, in scan order
    pub consumed_in: Vec<PathBuf>,
}

impl DefineBinding {
    fn new(name: String, template: String) -> Self {
        Self {
            name,
            template,
            value: None,
            consumed_in: Vec::new(),
        }
    }

    pub fn consumption_count(&self) -> usize {
        self.consumed_in.len()
    }
}

/// The rewritten contents of one header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPatch {
    pub path: PathBuf,
    pub contents: String,
    /// (name, value) pairs written into this header
    pub written: Vec<(String, String)>,
}

/// Run-scoped define injection state.
///
/// One injector is created per pipeline run and fed every header in turn.
/// It holds no global state, so independent runs never observe each other.
#[derive(Debug)]
pub struct DefineInjector {
    bindings: Vec<DefineBinding>,
    env: TemplateEnv,
    /// Names the project descriptor already sets through its own define list
    descriptor_defines: BTreeSet<String>,
}

impl DefineInjector {
    /// Create an injector for `requests` (name, value template), in order.
    pub fn new<I, N, T>(requests: I, env: TemplateEnv) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            bindings: requests
                .into_iter()
                .map(|(n, t)| DefineBinding::new(n.into(), t.into()))
                .collect(),
            env,
            descriptor_defines: BTreeSet::new(),
        }
    }

    /// Register names set through the descriptor's define list.
    ///
    /// A guarded placeholder for one of these names is a conflict: the
    /// descriptor value would be silently shadowed.
    pub fn with_descriptor_defines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor_defines
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Patch one header's text.
    ///
    /// Returns `None` when no requested define occurs in it. Structural
    /// violations (a guard for another macro, a malformed warning, a guard
    /// shadowing a descriptor define) fail immediately. Repeated
    /// consumption is only recorded here and reported by [`finish`].
    ///
    /// [`finish`]: DefineInjector::finish
    pub fn patch_text(
        &mut self,
        path: &Path,
        text: &str,
    ) -> Result<Option<HeaderPatch>, InjectError> {
        let mut lines: Vec<String> = Vec::new();
        let mut written = Vec::new();

        for line in text.split('\n') {
            let Some(index) = self.match_binding(line) else {
                lines.push(line.to_string());
                continue;
            };

            let name = self.bindings[index].name.clone();
            let directive = format!("#define {name}");
            let rest = line
                .split_once(directive.as_str())
                .map(|(_, rest)| rest)
                .unwrap_or_default();
            let alignment = &rest[..rest.len() - rest.trim_start().len()];

            if let Some(prev) = lines.last_mut() {
                if prev.contains("#ifndef") {
                    let guarded = ifndef_regex()
                        .captures(prev)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str());
                    if guarded != Some(name.as_str()) {
                        return Err(InjectError::GuardMismatch {
                            define: name,
                            guard: prev.clone(),
                            path: path.to_path_buf(),
                        });
                    }
                    if self.descriptor_defines.contains(&name) {
                        return Err(InjectError::GuardConflict {
                            define: name,
                            path: path.to_path_buf(),
                        });
                    }
                    *prev = ALWAYS_TRUE_GUARD.to_string();
                } else if prev.contains("#warning") {
                    if !warning_regex().is_match(prev) {
                        return Err(InjectError::MalformedWarning {
                            define: name,
                            line: prev.clone(),
                            path: path.to_path_buf(),
                        });
                    }
                    lines.pop();
                }
            }

            let binding = &mut self.bindings[index];
            let value = self
                .env
                .render(&binding.template)
                .map_err(|source| InjectError::Template {
                    define: name.clone(),
                    source,
                })?;

            debug!(define = %name, value = %value, path = %path.display(), "injecting define");
            lines.push(format!("{directive}{alignment}{value}"));
            binding.value = Some(value.clone());
            binding.consumed_in.push(path.to_path_buf());
            written.push((name, value));
        }

        if written.is_empty() {
            return Ok(None);
        }

        Ok(Some(HeaderPatch {
            path: path.to_path_buf(),
            contents: lines.join("\n"),
            written,
        }))
    }

    /// First requested define declared on `line`.
    ///
    /// The trailing space keeps `FOO` from matching `#define FOO_BAR`.
    fn match_binding(&self, line: &str) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| line.contains(&format!("#define {} ", b.name)))
    }

    /// Check that every request was consumed exactly once.
    ///
    /// Reports all double-consumed and all unused names together.
    pub fn finish(self) -> Result<Vec<DefineBinding>, InjectError> {
        let double_consumed: Vec<String> = self
            .bindings
            .iter()
            .filter(|b| b.consumption_count() > 1)
            .map(|b| b.name.clone())
            .collect();
        let unused: Vec<String> = self
            .bindings
            .iter()
            .filter(|b| b.consumption_count() == 0)
            .map(|b| b.name.clone())
            .collect();

        if double_consumed.is_empty() && unused.is_empty() {
            Ok(self.bindings)
        } else {
            Err(InjectError::Inconsistent {
                double_consumed,
                unused,
            })
        }
    }
}

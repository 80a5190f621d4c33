//! Value templates for C defines.
//!
//! Templates use `{name}` placeholders, with `{{` and `}}` as literal braces.
//! Every placeholder must name a variable present in the [`TemplateEnv`].

use std::collections::BTreeMap;

/// Variable holding the short source-control revision of the build.
pub const GIT_REPO_HASH: &str = "git_repo_hash";

/// Errors produced while rendering a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template variable `{name}` in {template:?}")]
    UnknownVariable { name: String, template: String },

    #[error("unclosed `{{` in {template:?}")]
    Unclosed { template: String },

    #[error("single `}}` in {template:?}")]
    Unmatched { template: String },
}

/// Variables available to define templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateEnv {
    vars: BTreeMap<String, String>,
}

impl TemplateEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment with only the revision variable set
    pub fn with_revision(revision: impl Into<String>) -> Self {
        Self::new().with_var(GIT_REPO_HASH, revision)
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitute every placeholder in `template`.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(TemplateError::Unclosed {
                                    template: template.to_string(),
                                })
                            }
                        }
                    }
                    let value = self.get(&name).ok_or_else(|| TemplateError::UnknownVariable {
                        name: name.clone(),
                        template: template.to_string(),
                    })?;
                    out.push_str(value);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => {
                    return Err(TemplateError::Unmatched {
                        template: template.to_string(),
                    })
                }
                c => out.push(c),
            }
        }

        Ok(out)
    }
}

//! Source-control revision for define templates
//!
//! The revision is the first 8 hex digits of `HEAD`. A dirty worktree gets a
//! `-dirty-<hash>` suffix, where `<hash>` is the first 8 hex digits of the
//! SHA-256 of `git diff`.

use std::path::Path;
use std::process::Command;

use sha2::{Digest, Sha256};
use slcp_defines::TemplateEnv;
use tracing::debug;

use crate::toolchain::ToolError;

const SHORT_LEN: usize = 8;

fn git(repo: &Path, args: &[&str]) -> Result<String, ToolError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|source| ToolError::Spawn {
            tool: "git".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: format!("git {}", args.join(" ")),
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Build a revision id from the commit hash and optional dirty diff
pub fn format_revision(head: &str, dirty_diff: Option<&str>) -> String {
    let mut id: String = head.chars().take(SHORT_LEN).collect();

    if let Some(diff) = dirty_diff {
        let digest = hex::encode(Sha256::digest(diff.as_bytes()));
        id.push_str("-dirty-");
        id.push_str(&digest[..SHORT_LEN]);
    }

    id
}

/// Revision id of the git repository at `repo`
pub fn git_commit_id(repo: &Path) -> Result<String, ToolError> {
    let head = git(repo, &["rev-parse", "HEAD"])?;
    let status = git(repo, &["status", "--porcelain"])?;

    let diff = if status.is_empty() {
        None
    } else {
        Some(git(repo, &["diff"])?)
    };

    let id = format_revision(&head, diff.as_deref());
    debug!(repo = %repo.display(), revision = %id, "resolved revision");
    Ok(id)
}

/// Template environment for C define values
pub fn template_env(repo: &Path) -> Result<TemplateEnv, ToolError> {
    git_commit_id(repo).map(TemplateEnv::with_revision)
}

//! Branch naming: deterministic identities for change-sets and git ref
//! sanitization.
use std::path::Path;

use log::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{changes::types::ChangeSet, config::PR_BRANCH_PREFIX};

pub const REF_HEADS_PREFIX: &str = "refs/heads/";

/// A fully qualified, sanitized `refs/heads/...` ref. Can only be built
/// through [`BranchRef::sanitize`], so holding one means the ref is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef(String);

impl BranchRef {
    /// Sanitizes `name` into a branch ref following git's ref format rules.
    /// Returns `None` when nothing usable is left.
    pub fn sanitize(name: &str) -> Option<Self> {
        let sanitized = sanitize_ref_name(name);

        if name == REF_HEADS_PREFIX
            || name == "refs/heads/@"
            || sanitized.is_empty()
            || sanitized == "@"
        {
            warn!("invalid ref was generated from {name:?}");
            return None;
        }

        Some(Self(format!("{REF_HEADS_PREFIX}{sanitized}")))
    }

    pub fn as_ref_str(&self) -> &str {
        &self.0
    }

    /// The short branch name, without `refs/heads/`.
    pub fn branch_name(&self) -> &str {
        self.0.strip_prefix(REF_HEADS_PREFIX).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_segment(segment: &str) -> String {
    let mut segment = segment.strip_prefix('.').unwrap_or(segment);
    segment = segment.strip_suffix('.').unwrap_or(segment);

    let mut segment = match segment.strip_suffix(".lock") {
        Some(stem) => format!("{stem}_lock"),
        None => segment.to_string(),
    };

    for pattern in ["..", "~", "^", ":", "?", "*", "[", "@{", "\\"] {
        segment = segment.replace(pattern, "_");
    }

    segment.retain(|c| !(c as u32 <= 32 || c as u32 == 127));

    segment
}

fn sanitize_ref_name(name: &str) -> String {
    name.split('/')
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Produces the unique suffix of a change-set's branch name.
///
/// Equal dependency sets, file change sets and manifest names always hash
/// to the same identifier, which is what lets a later run find the branch
/// and requests of an earlier one. With `always_new` a random identifier
/// is returned instead.
pub fn branch_identity(change_set: &ChangeSet, always_new: bool) -> String {
    if always_new {
        return Uuid::new_v4().to_string();
    }

    let mut dependencies = change_set.dependencies.iter().collect::<Vec<_>>();
    dependencies.sort_by_key(|dep| dep.identity_key());

    let mut files = change_set.file_changes.iter().collect::<Vec<_>>();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut hasher = Sha256::new();

    for dep in dependencies {
        hasher.update(dep.identity_key().as_bytes());
    }

    for file in files {
        hasher.update(&file.content);
    }

    if let Some(name) = change_set
        .manifest_path
        .as_deref()
        .and_then(|path| Path::new(path).file_name())
    {
        hasher.update(name.to_string_lossy().as_bytes());
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    Uuid::from_bytes(bytes).to_string()
}

/// Computes the ref of the branch carrying `change_set`. Requests against a
/// base other than the default branch get the base name as a prefix.
pub fn contribution_branch_ref(
    change_set: &ChangeSet,
    base_branch: &str,
    default_branch: &str,
    always_new: bool,
) -> Option<BranchRef> {
    let mut name = PR_BRANCH_PREFIX.to_string();

    if base_branch != default_branch {
        name = format!("{base_branch}_{name}");
    }

    name.push_str(&branch_identity(change_set, always_new));

    let branch_ref = BranchRef::sanitize(&name);

    debug!("generated branch ref {branch_ref:?}");

    branch_ref
}

use std::cmp::Ordering;

use serde_json::Value;

use crate::platform::request::PullRequest;

/// A dependency bump applied by the scanner's autofix.
///
/// Equality and ordering only look at `(name, current_version)`: two bumps
/// of the same dependency from the same version are the same logical
/// change, whatever they were upgraded to.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub ecosystem: String,
    pub name: String,
    pub current_version: String,
    pub new_version: String,
}

impl Dependency {
    pub fn new(
        ecosystem: impl Into<String>,
        name: impl Into<String>,
        current_version: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
            current_version: current_version.into(),
            new_version: new_version.into(),
        }
    }

    /// The `name + currentVersion` key used for sorting and hashing.
    pub fn identity_key(&self) -> String {
        format!("{}{}", self.name, self.current_version)
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.current_version == other.current_version
    }
}

impl Eq for Dependency {}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.current_version.cmp(&other.current_version))
    }
}

/// Raw content of a file to be committed, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: Vec<u8>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

impl PartialOrd for FileChange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileChange {
    // path first; content only breaks ties so Ord agrees with Eq
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .cmp(&other.path)
            .then_with(|| self.content.cmp(&other.content))
    }
}

/// One unit of work destined for a single pull/merge request.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Project identifier taken from the report url's `pid` parameter.
    pub project_id: String,
    pub dependencies: Vec<Dependency>,
    pub file_changes: Vec<FileChange>,
    /// Raw scan report, forwarded to the text generation service.
    pub report: Value,
    /// Path of the manifest/solution the report was produced for, when the
    /// report carries one.
    pub manifest_path: Option<String>,
    pull_request: Option<PullRequest>,
}

impl ChangeSet {
    pub fn new(
        project_id: impl Into<String>,
        dependencies: Vec<Dependency>,
        file_changes: Vec<FileChange>,
        report: Value,
        manifest_path: Option<String>,
    ) -> Self {
        let mut change_set = Self {
            project_id: project_id.into(),
            dependencies: vec![],
            file_changes: vec![],
            report,
            manifest_path,
            pull_request: None,
        };
        change_set.extend_unique(dependencies, file_changes);
        change_set
    }

    pub fn pull_request(&self) -> Option<&PullRequest> {
        self.pull_request.as_ref()
    }

    /// Records the request opened for this change-set. Once set, the
    /// change-set is frozen and later merges are ignored.
    pub fn set_pull_request(&mut self, pr: PullRequest) {
        self.pull_request = Some(pr);
    }

    /// Adds a file to the change-set unless an identical one is present.
    pub fn add_file_change(&mut self, change: FileChange) {
        if !self.file_changes.contains(&change) {
            self.file_changes.push(change);
        }
    }

    /// Unions `other` into this change-set: dependencies, file changes and
    /// the autofix entries of the underlying report.
    pub fn merge(&mut self, other: &ChangeSet) {
        if self.pull_request.is_some() {
            log::warn!(
                "refusing to merge into change-set {} after its request was recorded",
                self.project_id
            );
            return;
        }

        self.extend_unique(
            other.dependencies.clone(),
            other.file_changes.clone(),
        );

        let others = autofix_changes(&other.report).cloned().unwrap_or_default();

        if let Some(Value::Array(changes)) = self
            .report
            .get_mut("autofix")
            .and_then(|autofix| autofix.get_mut("changes"))
        {
            for change in others {
                if !changes.contains(&change) {
                    changes.push(change);
                }
            }
        }

        if self.manifest_path.is_none() {
            self.manifest_path = other.manifest_path.clone();
        }
    }

    fn extend_unique(
        &mut self,
        dependencies: Vec<Dependency>,
        file_changes: Vec<FileChange>,
    ) {
        for dep in dependencies {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }

        for change in file_changes {
            self.add_file_change(change);
        }
    }
}

fn autofix_changes(report: &Value) -> Option<&Vec<Value>> {
    report.get("autofix")?.get("changes")?.as_array()
}

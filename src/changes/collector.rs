//! Turns scanner sentinel reports and locally modified manifests into
//! change-sets.
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use color_eyre::eyre::WrapErr;
use glob::Pattern;
use log::*;
use regex::Regex;
use serde_json::Value;

use crate::{
    changes::{
        report::ScanReport,
        types::{ChangeSet, FileChange},
    },
    error::CollectionError,
    result::Result,
};

/// File name pattern of the sentinel reports the scanner leaves beside
/// each manifest it fixed.
pub const SENTINEL_REPORT_PATTERN: &str = ".pr_report_*.json";

static SUPPORTED_MANIFEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(pom\.xml|composer\.json|Gemfile|Gemfile\.lock|Pipfile|Pipfile\.lock|package\.json|package-lock\.json|yarn\.lock|.*\..+proj)$",
    )
    .expect("manifest pattern is valid")
});

/// Whether `file_name` is a manifest or lockfile gitbot may commit.
pub fn is_supported_manifest(file_name: &str) -> bool {
    SUPPORTED_MANIFEST.is_match(file_name)
}

/// Collects change-sets below a working directory.
pub struct ChangeCollector {
    root: PathBuf,
    git_changes: Vec<String>,
}

impl ChangeCollector {
    /// `git_changes` are locally modified tracked files, relative to `root`.
    pub fn new(root: &Path, git_changes: Vec<String>) -> Result<Self> {
        let root = root.canonicalize().wrap_err_with(|| {
            format!("unable to resolve working directory {}", root.display())
        })?;

        Ok(Self { root, git_changes })
    }

    /// Finds every sentinel report below the root, in path order.
    pub fn find_reports(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/**/{SENTINEL_REPORT_PATTERN}",
            Pattern::escape(&self.root.to_string_lossy())
        );

        let mut reports = vec![];

        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) if !is_inside_git_dir(&path) => reports.push(path),
                Ok(_) => {}
                Err(err) => warn!("skipping unreadable path: {err}"),
            }
        }

        reports.sort();

        Ok(reports)
    }

    /// Builds one change-set per sentinel report, dropping incomplete ones,
    /// and merges those that share a project id.
    pub fn collect(&self) -> Result<Vec<ChangeSet>> {
        let mut change_sets: Vec<ChangeSet> = vec![];

        for report_path in self.find_reports()? {
            match self.generate(&report_path) {
                Ok(change_set) => {
                    match change_sets
                        .iter_mut()
                        .find(|c| c.project_id == change_set.project_id)
                    {
                        Some(existing) => {
                            debug!(
                                "merging changes of {} into project {}",
                                self.relative(&report_path),
                                existing.project_id
                            );
                            existing.merge(&change_set);
                        }
                        None => change_sets.push(change_set),
                    }
                }
                Err(err) => {
                    info!(
                        "no change-set generated from {}: {err}",
                        self.relative(&report_path)
                    );
                }
            }
        }

        Ok(change_sets)
    }

    /// Builds the change-set described by a single sentinel report. Any
    /// missing piece (dependencies, file changes, project id) discards the
    /// whole change-set.
    pub fn generate(
        &self,
        report_path: &Path,
    ) -> std::result::Result<ChangeSet, CollectionError> {
        debug!("loading report {}", self.relative(report_path));

        let (raw, report) = load_report(report_path)?;

        let report_dir = report_path.parent().unwrap_or(&self.root);
        let manifests = self.listed_manifests(report_dir, &report);

        let viable = self
            .git_changes
            .iter()
            .any(|change| manifests.contains(&self.root.join(change)));

        if !viable {
            return Err(CollectionError::NoCorrelatedChanges(
                report_path.to_path_buf(),
            ));
        }

        debug!(
            "viable changes found in {}, collecting change-set",
            self.relative(report_dir)
        );

        let file_changes = self.read_file_changes(&manifests)?;
        if file_changes.is_empty() {
            return Err(CollectionError::NoCorrelatedChanges(
                report_path.to_path_buf(),
            ));
        }

        let dependencies = report.dependencies();
        if dependencies.is_empty() {
            return Err(CollectionError::NoDependencies(
                report_path.to_path_buf(),
            ));
        }

        let project_id =
            report
                .project_id()
                .ok_or_else(|| CollectionError::NoProjectId {
                    path: report_path.to_path_buf(),
                    url: report.url.clone(),
                })?;

        let change_set = ChangeSet::new(
            project_id,
            dependencies,
            file_changes,
            raw,
            report.solution_path(),
        );

        debug!("generated change-set {change_set:?}");

        Ok(change_set)
    }

    /// Manifests referenced by the report that live in `report_dir`.
    fn listed_manifests(
        &self,
        report_dir: &Path,
        report: &ScanReport,
    ) -> Vec<PathBuf> {
        let mut manifests = vec![];

        for change in report.changes() {
            for location in change.locations.iter() {
                let location = Path::new(location);
                let path = if location.is_absolute() {
                    location.to_path_buf()
                } else {
                    self.root.join(location)
                };

                if path.parent() == Some(report_dir)
                    && !manifests.contains(&path)
                {
                    manifests.push(path);
                }
            }
        }

        manifests
    }

    fn read_file_changes(
        &self,
        manifests: &[PathBuf],
    ) -> std::result::Result<Vec<FileChange>, CollectionError> {
        let mut file_changes = vec![];

        for change in self.git_changes.iter() {
            let path = self.root.join(change);

            let supported = path
                .file_name()
                .map(|name| is_supported_manifest(&name.to_string_lossy()))
                .unwrap_or(false);

            if !supported || !manifests.contains(&path) {
                continue;
            }

            let content = fs::read(&path).map_err(|err| {
                CollectionError::UnreadableManifest {
                    path: path.clone(),
                    reason: err.to_string(),
                }
            })?;

            debug!("loaded manifest change for {change}");
            file_changes.push(FileChange::new(change.clone(), content));
        }

        Ok(file_changes)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

fn load_report(
    path: &Path,
) -> std::result::Result<(Value, ScanReport), CollectionError> {
    let unreadable = |reason: String| CollectionError::UnreadableReport {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let raw: Value =
        serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;
    let report: ScanReport = serde_json::from_value(raw.clone())
        .map_err(|e| unreadable(e.to_string()))?;

    Ok((raw, report))
}

fn is_inside_git_dir(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == ".git"))
}

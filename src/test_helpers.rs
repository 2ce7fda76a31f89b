//! Common test helper functions shared across test modules.
//!
//! This module provides reusable fixtures: a scratch git repository and an
//! in-memory platform that keeps state between calls, so repeated runs
//! can be exercised against the same remote.
use std::{collections::HashMap, fs, path::Path, sync::Mutex};

use async_trait::async_trait;
use git2::{Repository, Signature};
use serde_json::json;

use crate::{
    changes::types::{ChangeSet, Dependency, FileChange},
    config::LabelSpec,
    platform::{
        request::{
            CommitRequest, CreateBranchRequest, CreateIssueRequest,
            CreatePrRequest, GetPrRequest, Issue, IssueState, PullRequest,
            UpdatePrRequest,
        },
        traits::Platform,
    },
};

/// Initialises a git repository at `path` with `files` committed.
///
/// # Example
/// ```ignore
/// init_repo_with_files(tmp.path(), &[("package.json", "{}")]);
/// ```
pub fn init_repo_with_files(path: &Path, files: &[(&str, &str)]) {
    let repo = Repository::init(path).unwrap();
    let mut index = repo.index().unwrap();

    for (rel, content) in files {
        let full = path.join(rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();
        index.add_path(Path::new(rel)).unwrap();
    }

    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = Signature::now("test", "test@example.com").unwrap();

    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .unwrap();
}

/// The `package.json` content after bumping minimist to 1.2.7.
pub const BUMPED_PACKAGE_JSON: &str =
    r#"{"dependencies":{"minimist":"1.2.7"}}"#;
/// The `package.json` content before the bump.
pub const ORIGINAL_PACKAGE_JSON: &str =
    r#"{"dependencies":{"minimist":"1.1.1"}}"#;

/// A change-set bumping minimist from 1.1.1 to 1.2.7 in `package.json`.
pub fn minimist_change_set() -> ChangeSet {
    ChangeSet::new(
        "b407fb0d-abbf-aaaa-aaaa-aaaaaaaaaaaa",
        vec![Dependency::new("nodejs", "minimist", "1.1.1", "1.2.7")],
        vec![FileChange::new("package.json", BUMPED_PACKAGE_JSON)],
        json!({
            "url": "https://www.meterian.com/projects/?pid=b407fb0d-abbf-aaaa-aaaa-aaaaaaaaaaaa",
            "autofix": {
                "changes": [{
                    "name": "minimist",
                    "version": "1.1.1",
                    "language": "nodejs",
                    "upgradedTo": "1.2.7"
                }]
            }
        }),
        None,
    )
}

#[derive(Debug, Clone)]
struct FakePull {
    pr: PullRequest,
    base: String,
    open: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    /// branch -> path -> content
    branches: HashMap<String, HashMap<String, Vec<u8>>>,
    pulls: Vec<FakePull>,
    labels: Vec<String>,
    item_labels: HashMap<u64, Vec<String>>,
    issues: Vec<Issue>,
    updates: Vec<UpdatePrRequest>,
    commits: usize,
    commit_attempts: usize,
    create_branch_calls: usize,
    next_number: u64,
    fail_commits: bool,
    fail_labels: bool,
    fail_pr_creation: bool,
}

impl FakeState {
    fn next_number(&mut self) -> u64 {
        self.next_number += 1;
        self.next_number
    }
}

/// In-memory [`Platform`] behaving like a GitHub repository owned by
/// `meterian`.
pub struct FakePlatform {
    default_branch: String,
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub const OWNER: &'static str = "meterian";

    pub fn new(default_branch: &str) -> Self {
        let mut state = FakeState::default();
        state
            .branches
            .insert(default_branch.to_string(), HashMap::new());

        Self {
            default_branch: default_branch.to_string(),
            state: Mutex::new(state),
        }
    }

    /// Sets the content of `path` on `branch`, creating the branch.
    pub fn set_file(&self, branch: &str, path: &str, content: &str) {
        self.state
            .lock()
            .unwrap()
            .branches
            .entry(branch.to_string())
            .or_default()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .branches
            .get(branch)
            .and_then(|files| files.get(path).cloned())
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains_key(branch)
    }

    pub fn add_issue(&self, issue: Issue) {
        let mut state = self.state.lock().unwrap();
        state.next_number = state.next_number.max(issue.number);
        state.issues.push(issue);
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.state.lock().unwrap().issues.clone()
    }

    /// Labels applied to the pull request or issue `number`.
    pub fn issue_labels(&self, number: u64) -> Vec<String> {
        self.pr_labels(number)
    }

    pub fn pr_labels(&self, number: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .item_labels
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pulls(&self) -> Vec<PullRequest> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .iter()
            .map(|p| p.pr.clone())
            .collect()
    }

    pub fn close_pull(&self, number: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(pull) = state.pulls.iter_mut().find(|p| p.pr.number == number)
        {
            pull.open = false;
        }
    }

    pub fn updates(&self) -> Vec<UpdatePrRequest> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn commit_attempts(&self) -> usize {
        self.state.lock().unwrap().commit_attempts
    }

    pub fn create_branch_calls(&self) -> usize {
        self.state.lock().unwrap().create_branch_calls
    }

    pub fn fail_commits(&self) {
        self.state.lock().unwrap().fail_commits = true;
    }

    pub fn fail_labels(&self) {
        self.state.lock().unwrap().fail_labels = true;
    }

    pub fn fail_pr_creation(&self, fail: bool) {
        self.state.lock().unwrap().fail_pr_creation = fail;
    }

    fn list_pulls(&self, open: bool, req: GetPrRequest) -> Vec<PullRequest> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .iter()
            .filter(|p| p.open == open)
            .filter(|p| {
                req.head
                    .as_ref()
                    .is_none_or(|head| *head == self.head_filter_key(&p.pr.head_branch))
            })
            .filter(|p| req.base.as_ref().is_none_or(|base| *base == p.base))
            .map(|p| p.pr.clone())
            .collect()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn full_name(&self) -> String {
        format!("{}/repo", Self::OWNER)
    }

    fn owner(&self) -> String {
        Self::OWNER.to_string()
    }

    fn default_branch(&self) -> String {
        self.default_branch.clone()
    }

    fn has_issues_enabled(&self) -> bool {
        true
    }

    async fn is_remote_branch(&self, branch: &str) -> bool {
        self.has_branch(branch)
    }

    async fn create_branch(&self, req: CreateBranchRequest) -> bool {
        let mut state = self.state.lock().unwrap();
        state.create_branch_calls += 1;

        if state.branches.contains_key(&req.branch) {
            return true;
        }

        let Some(base) = state.branches.get(&req.base_branch).cloned() else {
            return false;
        };

        state.branches.insert(req.branch, base);
        true
    }

    async fn commit_changes(&self, req: CommitRequest) -> bool {
        let mut state = self.state.lock().unwrap();
        state.commit_attempts += 1;

        if state.fail_commits || req.file_changes.is_empty() {
            return false;
        }

        let Some(base) = state.branches.get(&req.base_branch).cloned() else {
            return false;
        };

        let changed = req
            .file_changes
            .into_iter()
            .filter(|change| base.get(&change.path) != Some(&change.content))
            .collect::<Vec<_>>();

        if changed.is_empty() {
            return false;
        }

        let Some(files) = state.branches.get_mut(&req.branch) else {
            return false;
        };

        for change in changed {
            files.insert(change.path, change.content);
        }

        state.commits += 1;
        true
    }

    async fn ensure_label(&self, label: LabelSpec) -> bool {
        let mut state = self.state.lock().unwrap();

        if state.fail_labels {
            return false;
        }

        if !state.labels.contains(&label.name) {
            state.labels.push(label.name);
        }

        true
    }

    async fn create_pull_request(
        &self,
        req: CreatePrRequest,
    ) -> Option<PullRequest> {
        let mut state = self.state.lock().unwrap();

        if state.fail_pr_creation {
            return None;
        }

        let number = state.next_number();
        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/repo/pull/{number}", Self::OWNER),
            title: req.title,
            body: req.body,
            head_branch: req.head_branch,
        };

        state.item_labels.insert(number, req.labels);
        state.pulls.push(FakePull {
            pr: pr.clone(),
            base: req.base_branch,
            open: true,
        });

        Some(pr)
    }

    async fn update_pull_request(&self, req: UpdatePrRequest) -> bool {
        let mut state = self.state.lock().unwrap();

        let Some(pull) =
            state.pulls.iter_mut().find(|p| p.pr.number == req.number)
        else {
            return false;
        };

        pull.pr.title = req.title.clone();
        pull.pr.body = req.body.clone();
        state.updates.push(req);
        true
    }

    async fn get_open_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_pulls(true, req)
    }

    async fn get_closed_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_pulls(false, req)
    }

    fn head_filter_key(&self, branch: &str) -> String {
        format!("{}:{branch}", Self::OWNER)
    }

    async fn create_issue(&self, req: CreateIssueRequest) -> Option<Issue> {
        let mut state = self.state.lock().unwrap();

        let number = state.next_number();
        let issue = Issue {
            number,
            url: format!("https://github.com/{}/repo/issues/{number}", Self::OWNER),
            title: req.title,
            body: req.body,
            state: IssueState::Open,
        };

        state.item_labels.insert(number, req.labels);
        state.issues.push(issue.clone());

        Some(issue)
    }

    async fn search_issues_by_title(&self, title: &str) -> Option<Vec<Issue>> {
        Some(
            self.state
                .lock()
                .unwrap()
                .issues
                .iter()
                .filter(|i| i.title.contains(title))
                .cloned()
                .collect(),
        )
    }
}

//! Traits related to remote code-hosting platforms
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    config::LabelSpec,
    platform::request::{
        CommitRequest, CreateBranchRequest, CreateIssueRequest,
        CreatePrRequest, GetPrRequest, Issue, PullRequest, UpdatePrRequest,
    },
};

/// Capabilities every platform adapter provides.
///
/// Implementations never return errors: API failures are logged and
/// reported as `false`, `None` or an empty list.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    /// `owner/name` (GitHub) or `group/project` (GitLab).
    fn full_name(&self) -> String;
    fn owner(&self) -> String;
    fn default_branch(&self) -> String;
    fn has_issues_enabled(&self) -> bool;

    async fn is_remote_branch(&self, branch: &str) -> bool;

    /// Creates the branch unless it already exists. Returns `true` when the
    /// branch exists afterwards.
    async fn create_branch(&self, req: CreateBranchRequest) -> bool;

    /// Commits every file whose content differs from the remote copy in a
    /// single commit. Returns `false` when nothing differs or the write
    /// fails.
    async fn commit_changes(&self, req: CommitRequest) -> bool;

    /// Gets or creates a label by name. Existing labels are left untouched.
    async fn ensure_label(&self, label: LabelSpec) -> bool;

    async fn create_pull_request(
        &self,
        req: CreatePrRequest,
    ) -> Option<PullRequest>;

    async fn update_pull_request(&self, req: UpdatePrRequest) -> bool;

    async fn get_open_pulls(&self, req: GetPrRequest) -> Vec<PullRequest>;

    async fn get_closed_pulls(&self, req: GetPrRequest) -> Vec<PullRequest>;

    /// Formats a branch name the way the pull request listing expects it
    /// in its head filter.
    fn head_filter_key(&self, branch: &str) -> String;

    async fn create_issue(&self, req: CreateIssueRequest) -> Option<Issue>;

    /// Issues whose title matches `title`. `None` means the search itself
    /// failed.
    async fn search_issues_by_title(&self, title: &str) -> Option<Vec<Issue>>;
}

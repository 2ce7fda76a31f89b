use crate::{changes::types::FileChange, config::CommitAuthor};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Pull or merge request as seen on the remote platform.
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub body: String,
    /// Source branch name, without `refs/heads/`.
    pub head_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Issue as seen on the remote platform.
pub struct Issue {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub body: String,
    pub state: IssueState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Filter for listing pull requests. `head` must already be in the
/// platform's head filter key format.
pub struct GetPrRequest {
    pub head: Option<String>,
    pub base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to open a new pull request.
pub struct CreatePrRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to edit the text of an existing pull request.
pub struct UpdatePrRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to create `branch` off the head of `base_branch`.
pub struct CreateBranchRequest {
    pub base_branch: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request for a single commit on `branch` covering every file change.
/// Files are compared with their content on `base_branch`; identical ones
/// are left out.
pub struct CommitRequest {
    pub author: CommitAuthor,
    pub message: String,
    pub branch: String,
    pub base_branch: String,
    pub file_changes: Vec<FileChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

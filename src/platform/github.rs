//! Implements the Platform trait for Github
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use color_eyre::eyre::{OptionExt, eyre};
use log::*;
use octocrab::{
    Octocrab,
    models::{self, IssueState as GithubIssueState, repos::Object},
    params::{self, repos::Reference},
};
use reqwest::StatusCode;

use crate::{
    config::LabelSpec,
    error::GitbotError,
    platform::{
        config::RemoteConfig,
        request::{
            CommitRequest, CreateBranchRequest, CreateIssueRequest,
            CreatePrRequest, GetPrRequest, Issue, IssueState, PullRequest,
            UpdatePrRequest,
        },
        traits::Platform,
    },
    result::Result,
};

mod types;

use types::{
    BLOB_ENCODING, GitObject, GithubBlob, GithubCommit, GithubCommitAuthor,
    GithubTree, GithubTreeEntry, TREE_BLOB_MODE, TREE_BLOB_TYPE,
};

const PAGE_SIZE: u8 = 100;

/// GitHub platform implementation using Octocrab for API interactions.
pub struct Github {
    base_uri: String,
    instance: Octocrab,
    owner: String,
    repo: String,
    full_name: String,
    default_branch: String,
    has_issues: bool,
}

impl Github {
    /// Create GitHub client with personal access token authentication and
    /// load the repository metadata.
    pub async fn new(config: RemoteConfig) -> Result<Self> {
        let base_uri = config.api_base_url.trim_end_matches('/').to_string();
        let (owner, repo) = split_repository(&config.repository)?;

        let instance = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(base_uri.clone())?
            .build()?;

        let repository =
            instance.repos(&owner, &repo).get().await.map_err(|err| {
                debug!("failed to load repository {}: {err:?}", config.repository);
                GitbotError::RepositoryNotFound {
                    repository: config.repository.clone(),
                    platform: config.platform.to_string(),
                }
            })?;

        let default_branch = repository.default_branch.ok_or_eyre(format!(
            "failed to find default branch for github repo: {}",
            config.repository
        ))?;

        Ok(Self {
            full_name: repository
                .full_name
                .unwrap_or_else(|| config.repository.clone()),
            owner: repository.owner.map(|o| o.login).unwrap_or(owner),
            has_issues: repository.has_issues.unwrap_or(false),
            base_uri,
            instance,
            repo,
            default_branch,
        })
    }

    fn git_endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/{path}",
            self.base_uri, self.owner, self.repo
        )
    }

    async fn branch_sha(&self, branch: &str) -> Result<String> {
        let reference = self
            .instance
            .repos(&self.owner, &self.repo)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await?;

        match reference.object {
            Object::Commit { sha, .. } => Ok(sha),
            _ => Err(eyre!("failed to find sha of branch {branch}")),
        }
    }

    /// Git blob id of `path` on `branch`, `None` when the file does not
    /// exist there.
    async fn get_file_sha(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        let result = self
            .instance
            .repos(&self.owner, &self.repo)
            .get_content()
            .path(path)
            .r#ref(branch)
            .send()
            .await;

        match result {
            Err(octocrab::Error::GitHub { source, .. })
                if source.status_code == StatusCode::NOT_FOUND =>
            {
                debug!("no remote file found for path: {path}");
                Ok(None)
            }
            Err(err) => Err(eyre!(
                "encountered error getting file contents for path: {path}: {err}"
            )),
            Ok(mut data) => {
                let items = data.take_items();
                Ok(items.first().map(|item| item.sha.clone()))
            }
        }
    }

    async fn create_blob(&self, content: &[u8]) -> Result<GitObject> {
        let blob = GithubBlob {
            content: STANDARD.encode(content),
            encoding: BLOB_ENCODING.into(),
        };

        let created: GitObject = self
            .instance
            .post(self.git_endpoint("blobs"), Some(&blob))
            .await?;

        Ok(created)
    }

    async fn create_tree(&self, tree: GithubTree) -> Result<GitObject> {
        debug!("creating tree starting from: {}", tree.base_tree);

        let created: GitObject = self
            .instance
            .post(self.git_endpoint("trees"), Some(&tree))
            .await?;

        debug!("created new tree: {}", created.sha);

        Ok(created)
    }

    async fn try_commit(&self, req: &CommitRequest) -> Result<bool> {
        let mut entries = vec![];

        for change in req.file_changes.iter() {
            let remote =
                self.get_file_sha(&change.path, &req.base_branch).await?;

            if remote.as_deref() == Some(blob_sha(&change.content)?.as_str()) {
                debug!(
                    "{} is unchanged on {}, skipping",
                    change.path, req.base_branch
                );
                continue;
            }

            let blob = self.create_blob(&change.content).await?;

            entries.push(GithubTreeEntry {
                path: change
                    .path
                    .strip_prefix("./")
                    .unwrap_or(&change.path)
                    .to_string(),
                mode: TREE_BLOB_MODE.into(),
                sha: blob.sha,
                kind: TREE_BLOB_TYPE.into(),
            });
        }

        if entries.is_empty() {
            info!("no file differs from the content of {}", req.base_branch);
            return Ok(false);
        }

        let parent_sha = self.branch_sha(&req.branch).await?;

        let tree = self
            .create_tree(GithubTree {
                base_tree: parent_sha.clone(),
                tree: entries,
            })
            .await?;

        let commit: GitObject = self
            .instance
            .post(
                self.git_endpoint("commits"),
                Some(&GithubCommit {
                    message: req.message.clone(),
                    tree: tree.sha,
                    parents: vec![parent_sha],
                    author: GithubCommitAuthor {
                        name: req.author.username.clone(),
                        email: req.author.email.clone(),
                    },
                }),
            )
            .await?;

        info!("created commit for branch {}: sha: {}", req.branch, commit.sha);

        let _: serde_json::Value = self
            .instance
            .patch(
                self.git_endpoint(&format!("refs/heads/{}", req.branch)),
                Some(&serde_json::json!({
                  "sha": commit.sha,
                  "force": false
                })),
            )
            .await?;

        Ok(true)
    }

    async fn list_pulls(
        &self,
        state: params::State,
        req: GetPrRequest,
    ) -> Result<Vec<PullRequest>> {
        let pulls = self.instance.pulls(&self.owner, &self.repo);
        let mut builder = pulls.list().state(state).per_page(PAGE_SIZE);

        if let Some(head) = req.head {
            builder = builder.head(head);
        }

        if let Some(base) = req.base {
            builder = builder.base(base);
        }

        let page = builder.send().await?;
        let pulls = self.instance.all_pages(page).await?;

        Ok(pulls.into_iter().map(to_pull_request).collect())
    }

    async fn try_create_pull_request(
        &self,
        req: CreatePrRequest,
    ) -> Result<PullRequest> {
        let pr = self
            .instance
            .pulls(&self.owner, &self.repo)
            .create(req.title, req.head_branch, req.base_branch)
            .body(req.body)
            .send()
            .await?;

        if !req.labels.is_empty()
            && let Err(err) = self
                .instance
                .issues(&self.owner, &self.repo)
                .add_labels(pr.number, &req.labels)
                .await
        {
            warn!("unable to label pull request #{}", pr.number);
            debug!("label error: {err:?}");
        }

        Ok(to_pull_request(pr))
    }

    /// Every issue whose title matches `title`, across all result pages.
    async fn try_search_issues(&self, title: &str) -> Result<Vec<Issue>> {
        let query = format!("repo:{} type:issue {title} in:title", self.full_name);

        let page = self
            .instance
            .search()
            .issues_and_pull_requests(&query)
            .per_page(PAGE_SIZE)
            .send()
            .await?;

        let issues = self.instance.all_pages(page).await?;

        Ok(issues.into_iter().map(to_issue).collect())
    }

    async fn try_ensure_label(&self, label: &LabelSpec) -> Result<()> {
        let issues = self.instance.issues(&self.owner, &self.repo);

        match issues.get_label(&label.name).await {
            Ok(_) => {
                debug!("label {} already exists", label.name);
                Ok(())
            }
            Err(octocrab::Error::GitHub { source, .. })
                if source.status_code == StatusCode::NOT_FOUND =>
            {
                info!("creating label {}", label.name);
                issues
                    .create_label(&label.name, &label.color, &label.description)
                    .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Platform for Github {
    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    fn owner(&self) -> String {
        self.owner.clone()
    }

    fn default_branch(&self) -> String {
        self.default_branch.clone()
    }

    fn has_issues_enabled(&self) -> bool {
        self.has_issues
    }

    async fn is_remote_branch(&self, branch: &str) -> bool {
        match self
            .instance
            .repos(&self.owner, &self.repo)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                debug!("branch {branch} lookup failed: {err:?}");
                false
            }
        }
    }

    async fn create_branch(&self, req: CreateBranchRequest) -> bool {
        if self.is_remote_branch(&req.branch).await {
            debug!("branch {} already exists", req.branch);
            return true;
        }

        let sha = match self.branch_sha(&req.base_branch).await {
            Ok(sha) => sha,
            Err(err) => {
                warn!("unable to resolve base branch {}", req.base_branch);
                debug!("{err:?}");
                return false;
            }
        };

        match self
            .instance
            .repos(&self.owner, &self.repo)
            .create_ref(&Reference::Branch(req.branch.clone()), sha)
            .await
        {
            Ok(_) => {
                info!("created branch {} off {}", req.branch, req.base_branch);
                true
            }
            Err(err) => {
                error!("unable to create branch {}", req.branch);
                debug!("{err:?}");
                false
            }
        }
    }

    async fn commit_changes(&self, req: CommitRequest) -> bool {
        if req.file_changes.is_empty() {
            return false;
        }

        match self.try_commit(&req).await {
            Ok(committed) => committed,
            Err(err) => {
                warn!("unable to commit changes to {}", req.branch);
                debug!("{err:?}");
                false
            }
        }
    }

    async fn ensure_label(&self, label: LabelSpec) -> bool {
        match self.try_ensure_label(&label).await {
            Ok(()) => true,
            Err(err) => {
                warn!("unable to get or create label {}", label.name);
                debug!("{err:?}");
                false
            }
        }
    }

    async fn create_pull_request(
        &self,
        req: CreatePrRequest,
    ) -> Option<PullRequest> {
        let head = req.head_branch.clone();

        match self.try_create_pull_request(req).await {
            Ok(pr) => Some(pr),
            Err(err) => {
                error!("unable to open pull request from {head}");
                debug!("{err:?}");
                None
            }
        }
    }

    async fn update_pull_request(&self, req: UpdatePrRequest) -> bool {
        match self
            .instance
            .pulls(&self.owner, &self.repo)
            .update(req.number)
            .title(req.title)
            .body(req.body)
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!("unable to update pull request #{}", req.number);
                debug!("{err:?}");
                false
            }
        }
    }

    async fn get_open_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_pulls(params::State::Open, req)
            .await
            .unwrap_or_else(|err| {
                warn!("unable to list open pull requests");
                debug!("{err:?}");
                vec![]
            })
    }

    async fn get_closed_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_pulls(params::State::Closed, req)
            .await
            .unwrap_or_else(|err| {
                warn!("unable to list closed pull requests");
                debug!("{err:?}");
                vec![]
            })
    }

    fn head_filter_key(&self, branch: &str) -> String {
        format!("{}:{branch}", self.owner)
    }

    async fn create_issue(&self, req: CreateIssueRequest) -> Option<Issue> {
        match self
            .instance
            .issues(&self.owner, &self.repo)
            .create(req.title)
            .body(req.body)
            .labels(req.labels)
            .send()
            .await
        {
            Ok(issue) => Some(to_issue(issue)),
            Err(err) => {
                error!("unable to open issue");
                debug!("{err:?}");
                None
            }
        }
    }

    async fn search_issues_by_title(&self, title: &str) -> Option<Vec<Issue>> {
        match self.try_search_issues(title).await {
            Ok(issues) => Some(issues),
            Err(err) => {
                warn!("unable to search issues of {}", self.full_name);
                debug!("{err:?}");
                None
            }
        }
    }
}

/// Splits `owner/name` into its two parts.
fn split_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GitbotError::InvalidArgs(format!(
            "repository must be in the form owner/name, got {repository}"
        ))
        .into()),
    }
}

/// Git blob id of `content`, the same id the contents API reports for a
/// file with identical bytes.
fn blob_sha(content: &[u8]) -> Result<String> {
    Ok(git2::Oid::hash_object(git2::ObjectType::Blob, content)?.to_string())
}

fn to_pull_request(pr: models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        title: pr.title.unwrap_or_default(),
        body: pr.body.unwrap_or_default(),
        head_branch: pr.head.ref_field,
    }
}

fn to_issue(issue: models::issues::Issue) -> Issue {
    Issue {
        number: issue.number,
        url: issue.html_url.to_string(),
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        state: match issue.state {
            GithubIssueState::Open => IssueState::Open,
            _ => IssueState::Closed,
        },
    }
}

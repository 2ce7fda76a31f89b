//! Implements the Platform trait for Gitlab
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use color_eyre::eyre::{OptionExt, eyre};
use gitlab::{
    AsyncGitlab, GitlabBuilder,
    api::{
        ApiError, AsyncQuery, Pagination, ignore,
        merge_requests::MergeRequestState,
        paged,
        projects::{
            Project,
            issues::{CreateIssue, Issues},
            labels::{CreateLabel, Labels},
            merge_requests::{
                CreateMergeRequest, EditMergeRequest, MergeRequests,
            },
            repository::{
                branches::{Branch, CreateBranch},
                commits::{CommitAction, CommitActionType, CreateCommit},
                files::File,
            },
        },
    },
};
use log::*;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use url::Url;

use crate::{
    changes::types::FileChange,
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
    BranchInfo, CreatedCommit, FileInfo, IssueInfo, LabelInfo,
    MergeRequestInfo, ProjectInfo,
};

const OPENED_STATE: &str = "opened";

/// GitLab platform implementation using the async gitlab client.
pub struct Gitlab {
    gl: AsyncGitlab,
    project: String,
    owner: String,
    default_branch: String,
    has_issues: bool,
}

impl Gitlab {
    /// Create GitLab client with token authentication and load the project
    /// metadata.
    pub async fn new(config: RemoteConfig) -> Result<Self> {
        let (host, insecure) = host_from_url(&config.api_base_url)?;
        let token = config.token.expose_secret();

        let mut builder = GitlabBuilder::new(host, token);
        if insecure {
            builder.insecure();
        }

        let gl = builder.build_async().await.map_err(|err| {
            debug!("gitlab authentication failed: {err:?}");
            GitbotError::PlatformUnavailable {
                platform: config.platform.to_string(),
                env_var: config.platform.token_env_var(),
            }
        })?;

        let endpoint = Project::builder()
            .project(config.repository.as_str())
            .build()?;

        let project: ProjectInfo =
            endpoint.query_async(&gl).await.map_err(|err| {
                debug!("failed to load project {}: {err:?}", config.repository);
                GitbotError::RepositoryNotFound {
                    repository: config.repository.clone(),
                    platform: config.platform.to_string(),
                }
            })?;

        let default_branch = project.default_branch.ok_or_eyre(format!(
            "failed to find default branch for gitlab project: {}",
            config.repository
        ))?;

        Ok(Self {
            gl,
            project: project.path_with_namespace,
            owner: project.namespace.full_path,
            default_branch,
            has_issues: project.issues_enabled,
        })
    }

    /// Raw content of `path` on `branch`, `None` when the file does not
    /// exist there.
    async fn get_file_content(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Option<Vec<u8>>> {
        let endpoint = File::builder()
            .project(self.project.as_str())
            .file_path(path)
            .ref_(branch)
            .build()?;

        let result: std::result::Result<FileInfo, _> =
            endpoint.query_async(&self.gl).await;

        match result {
            Ok(file) => {
                let content = STANDARD.decode(file.content.trim())?;
                Ok(Some(content))
            }
            Err(ApiError::GitlabWithStatus { status, .. })
                if status == StatusCode::NOT_FOUND =>
            {
                debug!("no remote file found for path: {path}");
                Ok(None)
            }
            Err(err) => Err(eyre!(
                "encountered error getting file contents for path: {path}: {err}"
            )),
        }
    }

    async fn try_commit(&self, req: &CommitRequest) -> Result<bool> {
        let mut changed: Vec<(CommitActionType, &FileChange)> = vec![];

        for change in req.file_changes.iter() {
            let base =
                self.get_file_content(&change.path, &req.base_branch).await?;

            if base.as_deref() == Some(change.content.as_slice()) {
                debug!(
                    "{} is unchanged on {}, skipping",
                    change.path, req.base_branch
                );
                continue;
            }

            let on_branch =
                self.get_file_content(&change.path, &req.branch).await?;

            let action = match on_branch {
                Some(_) => CommitActionType::Update,
                None => CommitActionType::Create,
            };

            changed.push((action, change));
        }

        if changed.is_empty() {
            info!("no file differs from the content of {}", req.base_branch);
            return Ok(false);
        }

        let mut actions = vec![];

        for (action, change) in changed {
            actions.push(
                CommitAction::builder()
                    .action(action)
                    .file_path(change.path.as_str())
                    .content(change.content.as_slice())
                    .build()?,
            );
        }

        let endpoint = CreateCommit::builder()
            .project(self.project.as_str())
            .branch(req.branch.as_str())
            .commit_message(req.message.as_str())
            .author_name(req.author.username.as_str())
            .author_email(req.author.email.as_str())
            .actions(actions.into_iter())
            .build()?;

        let commit: CreatedCommit = endpoint.query_async(&self.gl).await?;

        info!("created commit for branch {}: sha: {}", req.branch, commit.id);

        Ok(true)
    }

    async fn list_merge_requests(
        &self,
        state: MergeRequestState,
        req: GetPrRequest,
    ) -> Result<Vec<PullRequest>> {
        let mut builder = MergeRequests::builder();
        builder.project(self.project.as_str()).state(state);

        if let Some(head) = req.head.as_deref() {
            builder.source_branch(head);
        }

        if let Some(base) = req.base.as_deref() {
            builder.target_branch(base);
        }

        let endpoint = builder.build()?;

        let merge_requests: Vec<MergeRequestInfo> =
            paged(endpoint, Pagination::All)
                .query_async(&self.gl)
                .await?;

        Ok(merge_requests.into_iter().map(to_pull_request).collect())
    }

    async fn try_create_merge_request(
        &self,
        req: CreatePrRequest,
    ) -> Result<PullRequest> {
        let endpoint = CreateMergeRequest::builder()
            .project(self.project.as_str())
            .source_branch(req.head_branch.as_str())
            .target_branch(req.base_branch.as_str())
            .title(req.title.as_str())
            .description(req.body.as_str())
            .build()?;

        let merge_request: MergeRequestInfo =
            endpoint.query_async(&self.gl).await?;

        if !req.labels.is_empty() {
            let endpoint = EditMergeRequest::builder()
                .project(self.project.as_str())
                .merge_request(merge_request.iid)
                .labels(req.labels.iter())
                .build()?;

            if let Err(err) = ignore(endpoint).query_async(&self.gl).await {
                warn!("unable to label merge request !{}", merge_request.iid);
                debug!("label error: {err:?}");
            }
        }

        Ok(to_pull_request(merge_request))
    }

    async fn try_ensure_label(&self, label: &LabelSpec) -> Result<()> {
        let endpoint = Labels::builder().project(self.project.as_str()).build()?;

        let labels: Vec<LabelInfo> = paged(endpoint, Pagination::All)
            .query_async(&self.gl)
            .await?;

        if labels.iter().any(|l| l.name == label.name) {
            debug!("label {} already exists", label.name);
            return Ok(());
        }

        info!("creating label {}", label.name);

        let endpoint = CreateLabel::builder()
            .project(self.project.as_str())
            .name(label.name.as_str())
            .color(format!("#{}", label.color))
            .description(label.description.as_str())
            .build()?;

        let _: LabelInfo = endpoint.query_async(&self.gl).await?;

        Ok(())
    }

    async fn try_create_issue(&self, req: CreateIssueRequest) -> Result<Issue> {
        let endpoint = CreateIssue::builder()
            .project(self.project.as_str())
            .title(req.title.as_str())
            .description(req.body.as_str())
            .labels(req.labels.iter())
            .build()?;

        let issue: IssueInfo = endpoint.query_async(&self.gl).await?;

        Ok(to_issue(issue))
    }

    async fn try_search_issues(&self, title: &str) -> Result<Vec<Issue>> {
        let endpoint = Issues::builder()
            .project(self.project.as_str())
            .search(title)
            .build()?;

        let issues: Vec<IssueInfo> = paged(endpoint, Pagination::All)
            .query_async(&self.gl)
            .await?;

        Ok(issues.into_iter().map(to_issue).collect())
    }
}

#[async_trait]
impl Platform for Gitlab {
    fn full_name(&self) -> String {
        self.project.clone()
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
        let endpoint = match Branch::builder()
            .project(self.project.as_str())
            .branch(branch)
            .build()
        {
            Ok(endpoint) => endpoint,
            Err(err) => {
                debug!("invalid branch query for {branch}: {err:?}");
                return false;
            }
        };

        let result: std::result::Result<BranchInfo, _> =
            endpoint.query_async(&self.gl).await;

        match result {
            Ok(found) => found.name == branch,
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

        let result = async {
            let endpoint = CreateBranch::builder()
                .project(self.project.as_str())
                .branch(req.branch.as_str())
                .ref_(req.base_branch.as_str())
                .build()?;

            let _: BranchInfo = endpoint.query_async(&self.gl).await?;

            Result::Ok(())
        }
        .await;

        match result {
            Ok(()) => {
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

        match self.try_create_merge_request(req).await {
            Ok(pr) => Some(pr),
            Err(err) => {
                error!("unable to open merge request from {head}");
                debug!("{err:?}");
                None
            }
        }
    }

    async fn update_pull_request(&self, req: UpdatePrRequest) -> bool {
        let result = async {
            let endpoint = EditMergeRequest::builder()
                .project(self.project.as_str())
                .merge_request(req.number)
                .title(req.title.as_str())
                .description(req.body.as_str())
                .build()?;

            ignore(endpoint).query_async(&self.gl).await?;

            Result::Ok(())
        }
        .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!("unable to update merge request !{}", req.number);
                debug!("{err:?}");
                false
            }
        }
    }

    async fn get_open_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_merge_requests(MergeRequestState::Opened, req)
            .await
            .unwrap_or_else(|err| {
                warn!("unable to list open merge requests");
                debug!("{err:?}");
                vec![]
            })
    }

    async fn get_closed_pulls(&self, req: GetPrRequest) -> Vec<PullRequest> {
        self.list_merge_requests(MergeRequestState::Closed, req)
            .await
            .unwrap_or_else(|err| {
                warn!("unable to list closed merge requests");
                debug!("{err:?}");
                vec![]
            })
    }

    fn head_filter_key(&self, branch: &str) -> String {
        branch.to_string()
    }

    async fn create_issue(&self, req: CreateIssueRequest) -> Option<Issue> {
        match self.try_create_issue(req).await {
            Ok(issue) => Some(issue),
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
                warn!("unable to search issues of {}", self.project);
                debug!("{err:?}");
                None
            }
        }
    }
}

/// Extracts the `host[:port]` the gitlab client expects from an api url,
/// and whether plain http must be used.
fn host_from_url(api_base_url: &str) -> Result<(String, bool)> {
    let url = Url::parse(api_base_url).map_err(|err| {
        GitbotError::InvalidArgs(format!("invalid api url {api_base_url}: {err}"))
    })?;

    let host = url.host_str().ok_or_else(|| {
        GitbotError::InvalidArgs(format!("no host found in {api_base_url}"))
    })?;

    if url.path() != "/" {
        return Err(GitbotError::InvalidArgs(format!(
            "api url {api_base_url} must not contain a path"
        ))
        .into());
    }

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok((host, url.scheme() == "http"))
}

fn to_pull_request(mr: MergeRequestInfo) -> PullRequest {
    PullRequest {
        number: mr.iid,
        url: mr.web_url,
        title: mr.title,
        body: mr.description.unwrap_or_default(),
        head_branch: mr.source_branch,
    }
}

fn to_issue(issue: IssueInfo) -> Issue {
    Issue {
        number: issue.iid,
        url: issue.web_url,
        title: issue.title,
        body: issue.description.unwrap_or_default(),
        state: if issue.state == OPENED_STATE {
            IssueState::Open
        } else {
            IssueState::Closed
        },
    }
}

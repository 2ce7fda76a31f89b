//! Pull request reconciliation: one branch, one commit and one request per
//! change-set, never more than one request for the same content.
use std::time::Duration;

use log::*;

use crate::{
    branch::{BranchRef, contribution_branch_ref},
    changes::types::{ChangeSet, FileChange},
    config::{COMMIT_RETRY_DELAY_MS, COMMIT_RETRY_LIMIT, CommitAuthor, LabelSpec},
    message::{MessageGenerator, MessageOptions, TextContent},
    platform::{
        request::{
            CommitRequest, CreateBranchRequest, CreatePrRequest, GetPrRequest,
            PullRequest, UpdatePrRequest,
        },
        traits::Platform,
    },
};

/// Settings shared by every change-set of a run.
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub author: CommitAuthor,
    pub label: LabelSpec,
    /// Use a random branch identity, disabling reuse of earlier branches.
    pub always_open_prs: bool,
    /// Extra file committed with every change-set (the PDF report).
    pub extra_file: Option<FileChange>,
    pub commit_retry_limit: u32,
    pub commit_retry_delay: Duration,
}

impl ReconcilerOptions {
    pub fn new(author: CommitAuthor, label: LabelSpec) -> Self {
        Self {
            author,
            label,
            always_open_prs: false,
            extra_file: None,
            commit_retry_limit: COMMIT_RETRY_LIMIT,
            commit_retry_delay: Duration::from_millis(COMMIT_RETRY_DELAY_MS),
        }
    }
}

/// Result of reconciling a single change-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new request was opened.
    Submitted(PullRequest),
    /// A request already exists (or existed) for the branch.
    Deduplicated {
        open: Vec<PullRequest>,
        closed: Vec<PullRequest>,
    },
    /// The generated branch ref was invalid.
    InvalidBranch,
    /// The branch could not be created.
    BranchUnavailable,
    /// Every commit attempt failed or there was nothing to commit.
    CommitFailed,
    /// The commit landed but the request could not be opened.
    SubmissionFailed,
    /// No text could be generated for the change-set.
    NoTextContent,
}

pub struct PullRequestReconciler<'a> {
    platform: &'a dyn Platform,
    options: ReconcilerOptions,
}

impl<'a> PullRequestReconciler<'a> {
    pub fn new(platform: &'a dyn Platform, options: ReconcilerOptions) -> Self {
        Self { platform, options }
    }

    /// Reconciles every change-set in turn and returns those for which a
    /// new request was opened.
    pub async fn reconcile_all(
        &self,
        change_sets: Vec<ChangeSet>,
        generator: &dyn MessageGenerator,
        base_branch: &str,
    ) -> Vec<ChangeSet> {
        let options =
            MessageOptions::pull_request(self.options.extra_file.is_some());

        let mut submitted = vec![];

        for mut change_set in change_sets {
            let outcome = match generator.generate(&change_set.report, options).await
            {
                Some(text) => {
                    self.reconcile(&mut change_set, &text, base_branch).await
                }
                None => ReconcileOutcome::NoTextContent,
            };

            debug!("change-set {} reconciled: {outcome:?}", change_set.project_id);

            if matches!(outcome, ReconcileOutcome::Submitted(_)) {
                submitted.push(change_set);
            }
        }

        submitted
    }

    /// Drives a single change-set from branch creation to an opened request.
    pub async fn reconcile(
        &self,
        change_set: &mut ChangeSet,
        text: &TextContent,
        base_branch: &str,
    ) -> ReconcileOutcome {
        for change in change_set.file_changes.iter() {
            debug!("change detected: {}", change.path);
        }

        if let Some(extra) = self.options.extra_file.clone() {
            debug!("adding {} to the change-set", extra.path);
            change_set.add_file_change(extra);
        }

        let branch_ref = contribution_branch_ref(
            change_set,
            base_branch,
            &self.platform.default_branch(),
            self.options.always_open_prs,
        );

        self.reconcile_on_branch(change_set, text, base_branch, branch_ref)
            .await
    }

    async fn reconcile_on_branch(
        &self,
        change_set: &mut ChangeSet,
        text: &TextContent,
        base_branch: &str,
        branch_ref: Option<BranchRef>,
    ) -> ReconcileOutcome {
        let labels = self.labels().await;

        let Some(branch_ref) = branch_ref else {
            println!("Invalid branch ref was generated, hence no pull request will be opened");
            return ReconcileOutcome::InvalidBranch;
        };

        let branch = branch_ref.branch_name().to_string();

        if !self
            .platform
            .create_branch(CreateBranchRequest {
                base_branch: base_branch.to_string(),
                branch: branch.clone(),
            })
            .await
        {
            println!("Unable to create branch {branch}");
            return ReconcileOutcome::BranchUnavailable;
        }

        let filter = GetPrRequest {
            head: Some(self.platform.head_filter_key(&branch)),
            base: Some(base_branch.to_string()),
        };

        let open = self.platform.get_open_pulls(filter.clone()).await;
        let closed = self.platform.get_closed_pulls(filter).await;

        if !open.is_empty() || !closed.is_empty() {
            info!("a pull request for branch {branch} has already been opened");

            if let Some(pr) = open.first() {
                self.refresh_text(pr, text).await;
            }

            return ReconcileOutcome::Deduplicated { open, closed };
        }

        let message = commit_message(change_set);

        let committed = self
            .commit_with_retry(CommitRequest {
                author: self.options.author.clone(),
                message,
                branch: branch.clone(),
                base_branch: base_branch.to_string(),
                file_changes: change_set.file_changes.clone(),
            })
            .await;

        if !committed {
            error!("changes were not committed, unable to proceed with submission");
            return ReconcileOutcome::CommitFailed;
        }

        let pr = self
            .platform
            .create_pull_request(CreatePrRequest {
                title: text.title.clone(),
                body: text.message.clone(),
                head_branch: branch.clone(),
                base_branch: base_branch.to_string(),
                labels,
            })
            .await;

        match pr {
            Some(pr) => {
                debug!("successful submission ({})", pr.url);
                change_set.set_pull_request(pr.clone());
                ReconcileOutcome::Submitted(pr)
            }
            None => {
                error!(
                    "unexpected, unsuccessful submission: changes were committed to {branch} but no pull request was opened"
                );
                ReconcileOutcome::SubmissionFailed
            }
        }
    }

    async fn labels(&self) -> Vec<String> {
        if self.platform.ensure_label(self.options.label.clone()).await {
            vec![self.options.label.name.clone()]
        } else {
            warn!(
                "label {} unavailable, submitting without labels",
                self.options.label.name
            );
            vec![]
        }
    }

    /// Edits the title and body of `pr` where the fresh text differs.
    async fn refresh_text(&self, pr: &PullRequest, text: &TextContent) {
        let title_changed = !text.title.is_empty() && text.title != pr.title;
        let body_changed = !text.message.is_empty() && text.message != pr.body;

        if !title_changed && !body_changed {
            return;
        }

        info!("updating text of pull request #{}", pr.number);

        self.platform
            .update_pull_request(UpdatePrRequest {
                number: pr.number,
                title: if title_changed {
                    text.title.clone()
                } else {
                    pr.title.clone()
                },
                body: if body_changed {
                    text.message.clone()
                } else {
                    pr.body.clone()
                },
            })
            .await;
    }

    async fn commit_with_retry(&self, req: CommitRequest) -> bool {
        let limit = self.options.commit_retry_limit.max(1);

        for attempt in 1..=limit {
            if self.platform.commit_changes(req.clone()).await {
                return true;
            }

            if attempt < limit {
                debug!("commit attempt {attempt} failed, retrying");
                tokio::time::sleep(self.options.commit_retry_delay).await;
            }
        }

        let paths = req
            .file_changes
            .iter()
            .map(|c| c.path.as_str())
            .collect::<Vec<_>>();

        warn!(
            "maximum retry limit exceeded, failed to commit changes to {paths:?} on branch {}",
            req.branch
        );

        false
    }
}

/// `Autofix`, followed by one line per dependency bump.
pub fn commit_message(change_set: &ChangeSet) -> String {
    let mut message = String::from("Autofix");

    if !change_set.dependencies.is_empty() {
        message.push_str("\n\n");
    }

    for dep in change_set.dependencies.iter() {
        message.push_str(&format!(
            "- updated {} from {} to {}\n",
            dep.name, dep.current_version, dep.new_version
        ));
    }

    message
}

#[cfg(test)]
mod tests;

//! Issue reconciliation: open an issue for the findings unless an
//! identical one already exists, open or closed.
use log::*;

use crate::{
    config::LabelSpec,
    message::TextContent,
    platform::{
        request::{CreateIssueRequest, Issue, IssueState},
        traits::Platform,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Empty title: there is nothing to report.
    NothingToReport,
    IssuesDisabled,
    /// Existing issues could not be listed, so nothing was created.
    SearchFailed,
    AlreadyOpen(Issue),
    /// An identical issue was closed; it is never reopened.
    AlreadyClosed(Issue),
    Opened(Issue),
    CreationFailed,
}

impl IssueOutcome {
    /// Console message describing the outcome.
    pub fn summary(&self) -> String {
        match self {
            IssueOutcome::NothingToReport => "No problems were detected in your repository therefore no issues will be opened".into(),
            IssueOutcome::IssuesDisabled => "This repository does not have issues enabled, no issues will be opened".into(),
            IssueOutcome::SearchFailed => "Unable to retrieve issues".into(),
            IssueOutcome::AlreadyOpen(issue) => format!(
                "The issue has already been opened, view it here:\n{}",
                issue.url
            ),
            IssueOutcome::AlreadyClosed(issue) => format!(
                "The issue already exists and it has been closed, view it here:\n{}",
                issue.url
            ),
            IssueOutcome::Opened(issue) => format!(
                "A new issue has been opened, view it here:\n{}",
                issue.url
            ),
            IssueOutcome::CreationFailed => "Unable to create new issue".into(),
        }
    }
}

pub struct IssueReconciler<'a> {
    platform: &'a dyn Platform,
    label: LabelSpec,
}

impl<'a> IssueReconciler<'a> {
    pub fn new(platform: &'a dyn Platform, label: LabelSpec) -> Self {
        Self { platform, label }
    }

    pub async fn reconcile(&self, text: &TextContent) -> IssueOutcome {
        if text.title.is_empty() {
            return IssueOutcome::NothingToReport;
        }

        if !self.platform.has_issues_enabled() {
            return IssueOutcome::IssuesDisabled;
        }

        let Some(issues) = self.platform.search_issues_by_title(&text.title).await
        else {
            return IssueOutcome::SearchFailed;
        };

        debug!("found {} issues matching the title", issues.len());

        if let Some(existing) = issues
            .into_iter()
            .find(|i| i.title == text.title && i.body == text.message)
        {
            return match existing.state {
                IssueState::Open => IssueOutcome::AlreadyOpen(existing),
                IssueState::Closed => IssueOutcome::AlreadyClosed(existing),
            };
        }

        let labels = if self.platform.ensure_label(self.label.clone()).await {
            vec![self.label.name.clone()]
        } else {
            warn!("label {} unavailable, opening issue without labels", self.label.name);
            vec![]
        };

        match self
            .platform
            .create_issue(CreateIssueRequest {
                title: text.title.clone(),
                body: text.message.clone(),
                labels,
            })
            .await
        {
            Some(issue) => IssueOutcome::Opened(issue),
            None => IssueOutcome::CreationFailed,
        }
    }
}

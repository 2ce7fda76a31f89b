//! Optional bookkeeping of the requests opened during a run.
use chrono::Utc;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{
    changes::types::ChangeSet,
    config::PR_BRANCH_PREFIX,
    platform::request::{GetPrRequest, PullRequest},
    platform::traits::Platform,
};

/// Reporting endpoint receiving the run summary.
pub const RECORD_ENDPOINT: &str =
    "https://services3.www.meterian.io/api/v1/gitbot/prs/record";
/// Environment variable holding the reporting token.
pub const RECORD_TOKEN_ENV_VAR: &str = "METERIAN_API_TOKEN";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub language: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordedDependency {
    pub library: Library,
    pub version: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordedPr {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordEntry {
    pub dependency: RecordedDependency,
    pub prs: Vec<RecordedPr>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRecord {
    pub created_at: String,
    pub entries: Vec<RecordEntry>,
    pub open_pr_links: Vec<String>,
}

impl PrRecord {
    /// Builds the summary from the submitted change-sets and the requests
    /// currently open on the repository.
    pub fn build(submitted: &[ChangeSet], open_pulls: &[PullRequest]) -> Self {
        let mut entries: Vec<RecordEntry> = vec![];

        for change_set in submitted {
            let Some(pr) = change_set.pull_request() else {
                continue;
            };

            for dep in change_set.dependencies.iter() {
                let recorded = RecordedPr {
                    title: pr.title.clone(),
                    url: pr.url.clone(),
                };

                match entries.iter_mut().find(|e| {
                    e.dependency.library.name == dep.name
                        && e.dependency.version == dep.current_version
                }) {
                    Some(entry) => entry.prs.push(recorded),
                    None => entries.push(RecordEntry {
                        dependency: RecordedDependency {
                            library: Library {
                                name: dep.name.clone(),
                                language: dep.ecosystem.clone(),
                            },
                            version: dep.current_version.clone(),
                        },
                        prs: vec![recorded],
                    }),
                }
            }
        }

        let open_pr_links = open_pulls
            .iter()
            .filter(|pr| pr.head_branch.contains(PR_BRANCH_PREFIX))
            .map(|pr| pr.url.clone())
            .collect();

        Self {
            created_at: Utc::now().to_rfc3339(),
            entries,
            open_pr_links,
        }
    }
}

/// Posts run summaries to the reporting endpoint. Failures are logged
/// only.
pub struct PrRecorder {
    client: reqwest::Client,
    endpoint: String,
    token: SecretString,
}

impl PrRecorder {
    pub fn new(endpoint: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }

    pub async fn record(
        &self,
        platform: &dyn Platform,
        submitted: &[ChangeSet],
    ) {
        let open_pulls = platform.get_open_pulls(GetPrRequest::default()).await;
        let record = PrRecord::build(submitted, &open_pulls);

        debug!("recording {} entries", record.entries.len());

        match self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(&record)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("recorded opened pull requests");
            }
            Ok(response) => {
                warn!(
                    "unable to record opened pull requests, status code: {}",
                    response.status()
                );
            }
            Err(err) => {
                warn!("unable to record opened pull requests: {err}");
            }
        }
    }
}

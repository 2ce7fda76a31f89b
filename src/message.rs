//! Title and body generation through the remote gitbot service.
use async_trait::async_trait;
use log::*;
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::result::Result;

/// Service turning a scan report into request text.
pub const MESSAGE_ENDPOINT: &str =
    "https://services3.www.meterian.io/api/v1/gitbot/results/parse/";

/// Which kind of text the service should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageOptions {
    pub autofix: bool,
    pub issue: bool,
    pub report: bool,
}

impl MessageOptions {
    /// Options for pull request text. `with_report` mentions the attached
    /// PDF report.
    pub fn pull_request(with_report: bool) -> Self {
        Self {
            autofix: true,
            issue: false,
            report: with_report,
        }
    }

    pub fn issue() -> Self {
        Self {
            autofix: false,
            issue: true,
            report: false,
        }
    }
}

/// Generated title and body. An empty title means there is nothing to
/// report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextContent {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    report: &'a Value,
    options: MessageOptions,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Returns `None` when no text could be produced.
    async fn generate(
        &self,
        report: &Value,
        options: MessageOptions,
    ) -> Option<TextContent>;
}

/// [`MessageGenerator`] calling the gitbot HTTP service.
pub struct HttpMessageGenerator {
    client: reqwest::Client,
    url: Url,
}

impl HttpMessageGenerator {
    /// `exclude` is forwarded to the service as an exclusion filter.
    pub fn new(endpoint: &str, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: message_url(endpoint, exclude)?,
        })
    }
}

#[async_trait]
impl MessageGenerator for HttpMessageGenerator {
    async fn generate(
        &self,
        report: &Value,
        options: MessageOptions,
    ) -> Option<TextContent> {
        debug!("requesting text content with options {options:?}");

        let response = match self
            .client
            .post(self.url.clone())
            .json(&MessageRequest { report, options })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("unsuccessful call to gitbot: {err}");
                return None;
            }
        };

        let status = response.status();

        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            error!("unsuccessful call to gitbot, status code: {status}, response: {text}");
            return None;
        }

        match response.json::<TextContent>().await {
            Ok(content) => Some(content),
            Err(err) => {
                error!("unable to parse gitbot response: {err}");
                None
            }
        }
    }
}

fn message_url(endpoint: &str, exclude: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;

    if let Some(filter) = exclude {
        url.query_pairs_mut().append_pair("exclude", filter);
    }

    Ok(url)
}

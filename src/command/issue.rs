//! Issue action.
use serde_json::Value;

use crate::{
    config::ContributionLabels,
    error::GitbotError,
    message::{MessageGenerator, MessageOptions},
    platform::traits::Platform,
    reconciler::issue::{IssueOutcome, IssueReconciler},
    result::Result,
};

/// Generates the issue text from `report` and opens the issue unless an
/// identical one exists.
pub async fn execute(
    platform: &dyn Platform,
    generator: &dyn MessageGenerator,
    report: &Value,
) -> Result<IssueOutcome> {
    let text = generator
        .generate(report, MessageOptions::issue())
        .await
        .ok_or(GitbotError::NoTextContent("issue"))?;

    let outcome = IssueReconciler::new(platform, ContributionLabels::default().issue)
        .reconcile(&text)
        .await;

    println!("{}", outcome.summary());

    Ok(outcome)
}

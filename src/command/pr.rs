//! Pull/merge request action.
use std::env;

use log::*;
use secrecy::SecretString;

use crate::{
    changes::{
        collector::ChangeCollector,
        types::{ChangeSet, FileChange},
    },
    cli::Args,
    config::ContributionLabels,
    message::MessageGenerator,
    platform::traits::Platform,
    reconciler::pull_request::{PullRequestReconciler, ReconcilerOptions},
    recorder::{PrRecorder, RECORD_TOKEN_ENV_VAR},
    result::Result,
};

/// Collects the change-sets of the working directory and reconciles each
/// of them against `platform`. Returns the change-sets for which a new
/// request was opened.
pub async fn execute(
    args: &Args,
    platform: &dyn Platform,
    generator: &dyn MessageGenerator,
    git_changes: Vec<String>,
    extra_file: Option<FileChange>,
) -> Result<Vec<ChangeSet>> {
    let collector = ChangeCollector::new(&args.workdir, git_changes)?;
    let change_sets = collector.collect()?;

    info!("collected {} change-sets", change_sets.len());

    let mut options =
        ReconcilerOptions::new(args.author(), ContributionLabels::default().pr);
    options.always_open_prs = args.always_open_prs;
    options.extra_file = extra_file;

    let submitted = PullRequestReconciler::new(platform, options)
        .reconcile_all(change_sets, generator, &args.branch)
        .await;

    print_summary(&submitted);

    if args.record_prs {
        record(args, platform, &submitted).await;
    }

    Ok(submitted)
}

fn print_summary(submitted: &[ChangeSet]) {
    let urls = submitted
        .iter()
        .filter_map(|c| c.pull_request())
        .map(|pr| pr.url.as_str())
        .collect::<Vec<_>>();

    if urls.is_empty() {
        println!("No pull requests were opened");
        return;
    }

    println!("The following pull requests were opened:");

    for url in urls {
        println!("  {url}");
    }
}

async fn record(args: &Args, platform: &dyn Platform, submitted: &[ChangeSet]) {
    match env::var(RECORD_TOKEN_ENV_VAR) {
        Ok(token) if !token.is_empty() => {
            PrRecorder::new(&args.record_endpoint, SecretString::from(token))
                .record(platform, submitted)
                .await;
        }
        _ => {
            warn!(
                "{RECORD_TOKEN_ENV_VAR} is not set, opened pull requests will not be recorded"
            );
        }
    }
}

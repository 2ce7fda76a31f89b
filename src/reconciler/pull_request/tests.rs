use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use super::*;
use crate::{
    config::ContributionLabels,
    message::MockMessageGenerator,
    platform::traits::MockPlatform,
    test_helpers::{
        BUMPED_PACKAGE_JSON, FakePlatform, ORIGINAL_PACKAGE_JSON,
        minimist_change_set,
    },
};

fn options() -> ReconcilerOptions {
    let mut options = ReconcilerOptions::new(
        CommitAuthor::github_default(),
        ContributionLabels::default().pr,
    );
    options.commit_retry_delay = Duration::ZERO;
    options
}

fn text() -> TextContent {
    TextContent {
        title: "[meterian] Fix for minimist".into(),
        message: "Upgraded minimist from 1.1.1 to 1.2.7".into(),
    }
}

fn platform() -> FakePlatform {
    let platform = FakePlatform::new("main");
    platform.set_file("main", "package.json", ORIGINAL_PACKAGE_JSON);
    platform
}

fn pull(number: u64, branch: &str) -> PullRequest {
    PullRequest {
        number,
        url: format!("https://github.com/meterian/repo/pull/{number}"),
        title: text().title,
        body: text().message,
        head_branch: branch.into(),
    }
}

#[test]
fn commit_message_lists_every_dependency() {
    let message = commit_message(&minimist_change_set());
    assert_eq!(
        message,
        "Autofix\n\n- updated minimist from 1.1.1 to 1.2.7\n"
    );
}

#[test]
fn commit_message_without_dependencies() {
    let mut change_set = minimist_change_set();
    change_set.dependencies.clear();
    assert_eq!(commit_message(&change_set), "Autofix");
}

#[tokio::test]
async fn submits_labelled_pull_request() {
    let platform = platform();
    let reconciler = PullRequestReconciler::new(&platform, options());
    let mut change_set = minimist_change_set();

    let outcome = reconciler.reconcile(&mut change_set, &text(), "main").await;

    let ReconcileOutcome::Submitted(pr) = outcome else {
        panic!("expected a submission, got {outcome:?}");
    };
    assert!(pr.head_branch.starts_with("meterian-bot/pr/"));
    assert_eq!(pr.title, "[meterian] Fix for minimist");
    assert_eq!(platform.commits(), 1);
    assert_eq!(platform.pr_labels(pr.number), vec!["meterian-bot-pr"]);
    assert_eq!(
        platform.file(&pr.head_branch, "package.json"),
        Some(BUMPED_PACKAGE_JSON.as_bytes().to_vec())
    );
    assert_eq!(
        platform.file("main", "package.json"),
        Some(ORIGINAL_PACKAGE_JSON.as_bytes().to_vec())
    );
    assert_eq!(change_set.pull_request(), Some(&pr));
}

#[tokio::test]
async fn second_run_is_deduplicated() {
    let platform = platform();
    let reconciler = PullRequestReconciler::new(&platform, options());

    let first = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;
    let second = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let ReconcileOutcome::Submitted(pr) = first else {
        panic!("expected a submission, got {first:?}");
    };
    assert_eq!(
        second,
        ReconcileOutcome::Deduplicated {
            open: vec![pr],
            closed: vec![],
        }
    );
    assert_eq!(platform.pulls().len(), 1);
    assert_eq!(platform.commits(), 1);
    assert!(platform.updates().is_empty());
}

#[tokio::test]
async fn changed_text_refreshes_open_pull_request() {
    let platform = platform();
    let reconciler = PullRequestReconciler::new(&platform, options());

    reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let fresh = TextContent {
        title: text().title,
        message: "Upgraded minimist, see the attached report".into(),
    };
    let outcome = reconciler
        .reconcile(&mut minimist_change_set(), &fresh, "main")
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Deduplicated { .. }));

    let updates = platform.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].title, "[meterian] Fix for minimist");
    assert_eq!(updates[0].body, "Upgraded minimist, see the attached report");
    assert_eq!(platform.pulls()[0].body, fresh.message);
}

#[tokio::test]
async fn empty_fresh_text_keeps_existing_text() {
    let platform = platform();
    let reconciler = PullRequestReconciler::new(&platform, options());

    reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let blank = TextContent {
        title: "".into(),
        message: "".into(),
    };
    reconciler
        .reconcile(&mut minimist_change_set(), &blank, "main")
        .await;

    assert!(platform.updates().is_empty());
}

#[tokio::test]
async fn closed_pull_request_blocks_resubmission() {
    let platform = platform();
    let reconciler = PullRequestReconciler::new(&platform, options());

    let ReconcileOutcome::Submitted(pr) = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await
    else {
        panic!("expected a submission");
    };

    platform.close_pull(pr.number);

    let outcome = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let ReconcileOutcome::Deduplicated { open, closed } = outcome else {
        panic!("expected deduplication, got {outcome:?}");
    };
    assert!(open.is_empty());
    assert_eq!(closed.len(), 1);
    assert_eq!(platform.pulls().len(), 1);
}

#[test_log::test(tokio::test)]
async fn nothing_to_commit_exhausts_retries() {
    let platform = FakePlatform::new("main");
    platform.set_file("main", "package.json", BUMPED_PACKAGE_JSON);

    let reconciler = PullRequestReconciler::new(&platform, options());

    let outcome = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert_eq!(outcome, ReconcileOutcome::CommitFailed);
    assert_eq!(platform.commit_attempts(), 10);
    assert_eq!(platform.commits(), 0);
    assert!(platform.pulls().is_empty());
}

#[tokio::test]
async fn failing_commits_never_open_pull_request() {
    let platform = platform();
    platform.fail_commits();

    let mut options = options();
    options.commit_retry_limit = 3;

    let outcome = PullRequestReconciler::new(&platform, options)
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert_eq!(outcome, ReconcileOutcome::CommitFailed);
    assert_eq!(platform.commit_attempts(), 3);
    assert!(platform.pulls().is_empty());
}

#[tokio::test]
async fn transient_commit_failures_are_retried() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let mut platform = MockPlatform::new();
    platform.expect_ensure_label().returning(|_| true);
    platform.expect_default_branch().return_const("main".to_string());
    platform.expect_create_branch().times(1).returning(|_| true);
    platform
        .expect_head_filter_key()
        .returning(|branch| format!("meterian:{branch}"));
    platform.expect_get_open_pulls().returning(|_| vec![]);
    platform.expect_get_closed_pulls().returning(|_| vec![]);
    platform
        .expect_commit_changes()
        .withf(|req| {
            req.message.starts_with("Autofix")
                && req.base_branch == "main"
                && req.branch.starts_with("meterian-bot/pr/")
        })
        .times(3)
        .returning(move |_| counter.fetch_add(1, Ordering::SeqCst) == 2);
    platform
        .expect_create_pull_request()
        .times(1)
        .returning(|req| Some(pull(7, &req.head_branch)));

    let outcome = PullRequestReconciler::new(&platform, options())
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Submitted(_)));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn invalid_branch_ref_skips_branch_creation() {
    let mut platform = MockPlatform::new();
    platform.expect_ensure_label().returning(|_| true);
    platform.expect_create_branch().never();
    platform.expect_commit_changes().never();
    platform.expect_create_pull_request().never();

    let reconciler = PullRequestReconciler::new(&platform, options());

    let outcome = reconciler
        .reconcile_on_branch(
            &mut minimist_change_set(),
            &text(),
            "main",
            BranchRef::sanitize("refs/heads/"),
        )
        .await;

    assert_eq!(outcome, ReconcileOutcome::InvalidBranch);
}

#[tokio::test]
async fn unavailable_branch_stops_reconciliation() {
    let mut platform = MockPlatform::new();
    platform.expect_ensure_label().returning(|_| true);
    platform.expect_default_branch().return_const("main".to_string());
    platform.expect_create_branch().returning(|_| false);
    platform.expect_get_open_pulls().never();
    platform.expect_commit_changes().never();

    let outcome = PullRequestReconciler::new(&platform, options())
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert_eq!(outcome, ReconcileOutcome::BranchUnavailable);
}

#[tokio::test]
async fn label_failure_still_submits() {
    let platform = platform();
    platform.fail_labels();

    let outcome = PullRequestReconciler::new(&platform, options())
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let ReconcileOutcome::Submitted(pr) = outcome else {
        panic!("expected a submission, got {outcome:?}");
    };
    assert!(platform.pr_labels(pr.number).is_empty());
}

#[tokio::test]
async fn pdf_report_is_committed_and_changes_branch() {
    let platform = platform();

    let plain = PullRequestReconciler::new(&platform, options())
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    let mut with_pdf = options();
    with_pdf.extra_file = Some(FileChange::new("report.pdf", b"%PDF-1.4".to_vec()));

    let mut change_set = minimist_change_set();
    let outcome = PullRequestReconciler::new(&platform, with_pdf)
        .reconcile(&mut change_set, &text(), "main")
        .await;

    let (ReconcileOutcome::Submitted(first), ReconcileOutcome::Submitted(second)) =
        (plain, outcome)
    else {
        panic!("expected two submissions");
    };
    assert_ne!(first.head_branch, second.head_branch);
    assert_eq!(
        platform.file(&second.head_branch, "report.pdf"),
        Some(b"%PDF-1.4".to_vec())
    );
    assert!(change_set.file_changes.iter().any(|c| c.path == "report.pdf"));
}

#[test_log::test(tokio::test)]
async fn failed_submission_recovers_on_next_run() {
    let platform = platform();
    platform.fail_pr_creation(true);

    let reconciler = PullRequestReconciler::new(&platform, options());

    let first = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;
    assert_eq!(first, ReconcileOutcome::SubmissionFailed);
    assert_eq!(platform.commits(), 1);

    platform.fail_pr_creation(false);

    let second = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert!(matches!(second, ReconcileOutcome::Submitted(_)));
    assert_eq!(platform.pulls().len(), 1);
}

#[tokio::test]
async fn always_open_prs_uses_fresh_branches() {
    let platform = platform();

    let mut options = options();
    options.always_open_prs = true;

    let reconciler = PullRequestReconciler::new(&platform, options);

    let first = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;
    let second = reconciler
        .reconcile(&mut minimist_change_set(), &text(), "main")
        .await;

    assert!(matches!(first, ReconcileOutcome::Submitted(_)));
    assert!(matches!(second, ReconcileOutcome::Submitted(_)));
    assert_eq!(platform.pulls().len(), 2);
}

#[tokio::test]
async fn non_default_base_prefixes_branch() {
    let platform = platform();
    platform.set_file("develop", "package.json", ORIGINAL_PACKAGE_JSON);

    let outcome = PullRequestReconciler::new(&platform, options())
        .reconcile(&mut minimist_change_set(), &text(), "develop")
        .await;

    let ReconcileOutcome::Submitted(pr) = outcome else {
        panic!("expected a submission, got {outcome:?}");
    };
    assert!(pr.head_branch.starts_with("develop_meterian-bot/pr/"));
}

#[tokio::test]
async fn missing_text_submits_nothing() {
    let platform = platform();

    let mut generator = MockMessageGenerator::new();
    generator
        .expect_generate()
        .withf(|_, options| options.autofix && !options.issue && !options.report)
        .times(1)
        .returning(|_, _| None);

    let submitted = PullRequestReconciler::new(&platform, options())
        .reconcile_all(vec![minimist_change_set()], &generator, "main")
        .await;

    assert!(submitted.is_empty());
    assert_eq!(platform.create_branch_calls(), 0);
}

#[tokio::test]
async fn reconcile_all_returns_submitted_change_sets() {
    let platform = platform();

    let mut generator = MockMessageGenerator::new();
    generator.expect_generate().returning(|_, _| Some(text()));

    let reconciler = PullRequestReconciler::new(&platform, options());

    let submitted = reconciler
        .reconcile_all(vec![minimist_change_set()], &generator, "main")
        .await;
    assert_eq!(submitted.len(), 1);
    assert!(submitted[0].pull_request().is_some());

    let again = reconciler
        .reconcile_all(vec![minimist_change_set()], &generator, "main")
        .await;
    assert!(again.is_empty());
}

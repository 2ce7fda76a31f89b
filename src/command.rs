//! Command execution for gitbot.
//!
//! Every action follows the same pattern:
//! 1. Validate the CLI input (report, PDF report, working tree)
//! 2. Connect to the platform and check the base branch exists remotely
//! 3. Run the action-specific reconciliation
//!
//! Any error returned from here is a configuration error and aborts the
//! run. Failures of individual contributions are logged by the
//! reconcilers and never surface as errors.
use std::{fs, path::Path};

use log::*;
use serde_json::Value;

use crate::{
    changes::{git, types::FileChange},
    cli::{Action, Args},
    error::GitbotError,
    message::{HttpMessageGenerator, MESSAGE_ENDPOINT},
    platform::{factory::PlatformFactory, traits::Platform},
    result::Result,
};

/// Issue creation.
pub mod issue;

/// Pull/merge request creation.
pub mod pr;

/// Runs the action selected on the command line.
pub async fn execute(args: &Args) -> Result<()> {
    let report = load_report(&args.report)?;

    match args.action {
        Action::Pr => {
            let extra_file =
                pdf_file_change(&args.workdir, args.with_pdf_report.as_deref())?;

            let git_changes = git::modified_files(&args.workdir)
                .map_err(|err| GitbotError::ChangeDetection(err.to_string()))?;

            if git_changes.is_empty() {
                println!(
                    "No changes were made in your repository therefore no pull request will be opened"
                );
                return Ok(());
            }

            let platform = connect(args).await?;
            let generator = HttpMessageGenerator::new(
                MESSAGE_ENDPOINT,
                args.exclude.as_deref(),
            )?;

            pr::execute(args, platform.as_ref(), &generator, git_changes, extra_file)
                .await?;
        }
        Action::Issue => {
            if let Some(pdf) = &args.with_pdf_report {
                warn!(
                    "PDF report {} is ignored when opening issues",
                    pdf.display()
                );
            }

            let platform = connect(args).await?;
            let generator = HttpMessageGenerator::new(
                MESSAGE_ENDPOINT,
                args.exclude.as_deref(),
            )?;

            issue::execute(platform.as_ref(), &generator, &report).await?;
        }
    }

    Ok(())
}

/// Loads the JSON scan report given on the command line.
pub fn load_report(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(GitbotError::ReportNotFound(path.to_path_buf()).into());
    }

    let content =
        fs::read_to_string(path).map_err(|err| GitbotError::InvalidReport {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    let report = serde_json::from_str::<Value>(&content).map_err(|err| {
        GitbotError::InvalidReport {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    Ok(report)
}

/// Reads the PDF report into a file change relative to `workdir`. A report
/// outside `workdir` cannot be committed and is ignored.
pub fn pdf_file_change(
    workdir: &Path,
    pdf: Option<&Path>,
) -> Result<Option<FileChange>> {
    let Some(pdf) = pdf else {
        return Ok(None);
    };

    if !pdf.is_file() {
        return Err(GitbotError::PdfReportNotFound(pdf.to_path_buf()).into());
    }

    let workdir = workdir.canonicalize()?;
    let absolute = pdf.canonicalize()?;

    let Ok(relative) = absolute.strip_prefix(&workdir) else {
        warn!(
            "PDF report {} is outside of {} and will not be included",
            pdf.display(),
            workdir.display()
        );
        return Ok(None);
    };

    let content = fs::read(&absolute)?;

    debug!("including PDF report {}", relative.display());

    Ok(Some(FileChange::new(
        relative.to_string_lossy().replace('\\', "/"),
        content,
    )))
}

async fn connect(args: &Args) -> Result<Box<dyn Platform>> {
    let remote = args.get_remote()?;
    let platform = PlatformFactory::create(&remote).await?;

    if !platform.is_remote_branch(&args.branch).await {
        return Err(GitbotError::BranchNotFound(args.branch.clone()).into());
    }

    Ok(platform)
}

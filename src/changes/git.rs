//! Local version-control queries.
use std::path::Path;

use color_eyre::eyre::{OptionExt, WrapErr};
use git2::{Repository, StatusOptions};
use log::*;

use crate::result::Result;

/// Lists tracked files modified in the working tree of the repository
/// containing `workdir`, as paths relative to `workdir`. Files outside
/// `workdir` are left out.
pub fn modified_files(workdir: &Path) -> Result<Vec<String>> {
    let repo = Repository::discover(workdir).wrap_err_with(|| {
        format!("no git repository found at {}", workdir.display())
    })?;

    let repo_root = repo
        .workdir()
        .ok_or_eyre("bare repositories are not supported")?
        .canonicalize()?;
    let workdir = workdir.canonicalize()?;

    let mut options = StatusOptions::new();
    options.include_untracked(false).include_ignored(false);

    let statuses = repo.statuses(Some(&mut options))?;

    let mut changes = vec![];

    for entry in statuses.iter() {
        if !entry.status().is_wt_modified() {
            continue;
        }

        let Some(path) = entry.path() else {
            warn!("skipping modified file with a non utf-8 path");
            continue;
        };

        let absolute = repo_root.join(path);
        if let Ok(relative) = absolute.strip_prefix(&workdir) {
            changes.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    changes.sort();

    debug!("changes detected were: {changes:?}");

    Ok(changes)
}

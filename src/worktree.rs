//! Git-backed implementation of the preserving-pull work tree.

use std::path::Path;

use anyhow::Context;
use git2::{ErrorCode, Repository, Signature, StashApplyOptions, StashFlags, StatusOptions};
use log::debug;

use crate::error::{Attempt, Maybe};
use crate::preserve::{RestoreOutcome, WorkTree};
use crate::source::git::{default_remote, fast_forward, setup_fetch_options};

pub struct GitWorkTree {
    repo: Repository,
    stashed_label: Option<String>,
}

impl GitWorkTree {
    pub fn open(path: &Path) -> Maybe<Self> {
        let repo = Repository::open(path)
            .with_context(|| format!("could not open git working copy at {}", path.display()))?;
        Ok(Self {
            repo,
            stashed_label: None,
        })
    }

    fn signature(&self) -> Maybe<Signature<'static>> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            // no user.name/user.email configured; stash commits are local-only
            Err(_) => Ok(Signature::now("tether", "tether@localhost")?),
        }
    }

    fn current_branch(&self) -> Maybe<String> {
        let head = self.repo.head()?;
        head.shorthand()
            .map(str::to_string)
            .context("HEAD is not on a named branch")
    }
}

impl WorkTree for GitWorkTree {
    fn has_local_changes(&mut self) -> Maybe<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn stash(&mut self, label: &str) -> Attempt {
        let signature = self.signature()?;
        self.repo
            .stash_save(&signature, label, Some(StashFlags::INCLUDE_UNTRACKED))?;
        self.stashed_label = Some(label.to_string());
        Ok(())
    }

    fn pull(&mut self) -> Attempt {
        let branch = self.current_branch()?;
        let mut remote = default_remote(&self.repo)?;
        remote.fetch(
            &[branch.as_str()],
            Some(&mut setup_fetch_options()),
            Some("tether pull"),
        )?;
        drop(remote);
        fast_forward(&self.repo, &branch)
    }

    fn restore(&mut self) -> Maybe<RestoreOutcome> {
        let Some(label) = self.stashed_label.clone() else {
            return Ok(RestoreOutcome::AlreadyGone);
        };

        let mut found = None;
        self.repo.stash_foreach(|index, message, _oid| {
            if message.contains(&label) {
                found = Some(index);
                false
            } else {
                true
            }
        })?;

        let Some(index) = found else {
            debug!("stash entry '{label}' not found, assuming it was already applied");
            return Ok(RestoreOutcome::AlreadyGone);
        };

        let mut options = StashApplyOptions::new();
        options.reinstantiate_index();
        match self.repo.stash_pop(index, Some(&mut options)) {
            Ok(()) => Ok(RestoreOutcome::Restored),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(RestoreOutcome::AlreadyGone),
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::Conflict | ErrorCode::MergeConflict | ErrorCode::Uncommitted
                ) =>
            {
                Ok(RestoreOutcome::Conflict(e.message().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

use std::path::Path;

use anyhow::Context;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, CredentialType, FetchOptions, ProxyOptions, RemoteCallbacks, Repository,
};

use crate::error::{fail, Attempt, Maybe};

use super::RemoteSource;

/// A git remote pinned to one branch. A fresh fetch is a clone of that
/// branch; an update is a fetch plus fast-forward of the local branch.
pub struct GitSource {
    url: String,
    branch: String,
    identity: String,
}

impl GitSource {
    pub fn new(url: &str, branch: &str) -> Self {
        Self {
            url: url.to_string(),
            branch: branch.to_string(),
            identity: format!("{url}#{branch}"),
        }
    }
}

fn setup_remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(|url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            Cred::credential_helper(&git2::Config::open_default()?, url, username_from_url)
        } else if allowed_types.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else {
            Cred::default()
        }
    });

    callbacks
}

pub(crate) fn setup_fetch_options<'a>() -> FetchOptions<'a> {
    let mut options = FetchOptions::new();
    options
        .proxy_options(ProxyOptions::new())
        .remote_callbacks(setup_remote_callbacks());

    options
}

pub(crate) fn default_remote(repo: &Repository) -> Maybe<git2::Remote<'_>> {
    if let Ok(origin) = repo.find_remote("origin") {
        return Ok(origin);
    }
    let remotes = repo.remotes()?;
    match remotes.get(0) {
        Some(name) if remotes.len() == 1 => Ok(repo.find_remote(name)?),
        _ => fail("unable to resolve a default remote"),
    }
}

/// Move the local branch to its upstream, refusing anything that is not a
/// fast-forward. Mixed histories are never merged here.
pub(crate) fn fast_forward(repo: &Repository, branch: &str) -> Attempt {
    let mut local_ref = repo
        .find_branch(branch, BranchType::Local)?
        .into_reference();

    let upstream = repo.find_branch(branch, BranchType::Local)?.upstream()?;
    let remote_commit = repo.reference_to_annotated_commit(&upstream.into_reference())?;

    let analysis = repo
        .merge_analysis_for_ref(&local_ref, &[&remote_commit])?
        .0;

    if analysis.is_up_to_date() {
        Ok(())
    } else if analysis.is_fast_forward() {
        local_ref.set_target(remote_commit.id(), "fast-forward")?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    } else {
        fail(&format!("local {branch} diverges from its upstream"))
    }
}

impl RemoteSource for GitSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn fetch_fresh(&self, dest: &Path) -> Attempt {
        let mut builder = RepoBuilder::new();
        builder.branch(&self.branch);
        builder.fetch_options(setup_fetch_options());
        builder
            .clone(&self.url, dest)
            .with_context(|| format!("could not clone {}", self.url))?;
        Ok(())
    }

    fn pull_latest(&self, dest: &Path) -> Attempt {
        let repo = Repository::open(dest)
            .with_context(|| format!("could not open working copy at {}", dest.display()))?;

        let mut remote = default_remote(&repo)?;
        remote.fetch(
            &[self.branch.as_str()],
            Some(&mut setup_fetch_options()),
            Some("tether update"),
        )?;
        drop(remote);

        fast_forward(&repo, &self.branch)
    }
}

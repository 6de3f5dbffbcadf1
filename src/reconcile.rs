//! Marker-based reconciliation of a local working copy against a remote
//! source: decide checkout vs update from the persisted marker, then run the
//! remote action under the retry executor.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use log::info;

use crate::error::{Maybe, SyncError};
use crate::marker::{read_marker, write_marker};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::source::RemoteSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    Checkout,
    Update,
    Noop,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncAction::Checkout => "checkout",
            SyncAction::Update => "update",
            SyncAction::Noop => "noop",
        })
    }
}

/// What one reconciliation (or preserving pull) did and how it ended.
#[derive(Clone, Debug)]
pub struct ReconcileResult {
    pub action: SyncAction,
    pub reason: String,
    pub local_changes_found: bool,
    pub stashed: bool,
    pub popped: bool,
    pub succeeded: bool,
}

impl ReconcileResult {
    pub fn new(action: SyncAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            local_changes_found: false,
            stashed: false,
            popped: false,
            succeeded: false,
        }
    }
}

/// One reconciliation unit: a local directory tethered to a remote source.
pub struct FetchTarget<'a> {
    pub name: &'a str,
    pub local_path: &'a Path,
    pub source: &'a dyn RemoteSource,
}

/// Decide what `reconcile` would do for this directory and identity, from
/// filesystem inspection alone. No remote I/O.
pub fn classify(local_path: &Path, identity: &str) -> (SyncAction, String) {
    if !local_path.exists() {
        return (SyncAction::Checkout, "folder missing".to_string());
    }
    match read_marker(local_path) {
        None => (SyncAction::Checkout, "marker missing".to_string()),
        Some(previous) if previous != identity => (
            SyncAction::Checkout,
            format!("identity changed from {previous} to {identity}"),
        ),
        Some(_) => (SyncAction::Update, "identity matches".to_string()),
    }
}

/// Reconcile the working copy at `target.local_path` against
/// `target.source`. A marker recording the last fetched identity decides
/// between a full checkout and an in-place update; both run the remote
/// action under `policy`.
pub fn reconcile(target: &FetchTarget, policy: &RetryPolicy) -> Result<ReconcileResult, SyncError> {
    let identity = target.source.identity();
    let (action, reason) = classify(target.local_path, identity);
    info!("{}: {action} ({reason})", target.name);

    let mut result = ReconcileResult::new(action, reason);
    match action {
        SyncAction::Checkout => checkout(target, policy, identity)?,
        SyncAction::Update => update(target, policy)?,
        SyncAction::Noop => {}
    }
    result.succeeded = true;
    Ok(result)
}

fn fetch_failed(target: &FetchTarget, action: SyncAction, detail: anyhow::Error) -> SyncError {
    SyncError::FetchFailed {
        name: target.name.to_string(),
        action,
        detail,
    }
}

/// Fresh fetch. The remote tree is staged in a temporary sibling directory
/// and the marker written into it; only once both succeeded is the old tree
/// removed and the staged tree renamed into place. A failure at any point
/// leaves the previous tree and marker untouched.
fn checkout(target: &FetchTarget, policy: &RetryPolicy, identity: &str) -> Result<(), SyncError> {
    let wrap = |detail: anyhow::Error| fetch_failed(target, SyncAction::Checkout, detail);

    let parent = target.local_path.parent().unwrap_or(Path::new("."));
    let staging = stage_dir(parent).map_err(wrap)?;
    let staged_tree = staging.path().join("tree");

    run_with_retry(policy, &format!("checkout {}", target.name), || {
        if staged_tree.exists() {
            fs::remove_dir_all(&staged_tree)
                .context("could not clear staging directory between attempts")?;
        }
        target.source.fetch_fresh(&staged_tree)
    })
    .map_err(|e| wrap(e.into()))?;

    write_marker(&staged_tree, identity).map_err(wrap)?;

    if target.local_path.exists() {
        fs::remove_dir_all(target.local_path)
            .with_context(|| format!("could not remove {}", target.local_path.display()))
            .map_err(wrap)?;
    }
    fs::rename(&staged_tree, target.local_path)
        .with_context(|| {
            format!(
                "could not move fetched tree into {}",
                target.local_path.display()
            )
        })
        .map_err(wrap)?;

    Ok(())
}

fn stage_dir(parent: &Path) -> Maybe<tempfile::TempDir> {
    fs::create_dir_all(parent)
        .with_context(|| format!("could not create {}", parent.display()))?;
    tempfile::Builder::new()
        .prefix(".tether-staging-")
        .tempdir_in(parent)
        .context("could not create staging directory")
}

/// In-place pull against the existing tree. The marker is left untouched,
/// the identity has not changed.
fn update(target: &FetchTarget, policy: &RetryPolicy) -> Result<(), SyncError> {
    run_with_retry(policy, &format!("update {}", target.name), || {
        target.source.pull_latest(target.local_path)
    })
    .map_err(|e| fetch_failed(target, SyncAction::Update, e.into()))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::Attempt;

    struct FakeSource {
        identity: String,
        payload: &'static str,
        failures_left: Cell<u32>,
        fetch_calls: Cell<u32>,
        pull_calls: Cell<u32>,
        fail_pulls: bool,
    }

    impl FakeSource {
        fn new(identity: &str, payload: &'static str) -> Self {
            Self {
                identity: identity.to_string(),
                payload,
                failures_left: Cell::new(0),
                fetch_calls: Cell::new(0),
                pull_calls: Cell::new(0),
                fail_pulls: false,
            }
        }

        fn failing_fetches(mut self, count: u32) -> Self {
            self.failures_left = Cell::new(count);
            self
        }

        fn failing_pulls(mut self) -> Self {
            self.fail_pulls = true;
            self
        }
    }

    impl RemoteSource for FakeSource {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn fetch_fresh(&self, dest: &Path) -> Attempt {
            self.fetch_calls.set(self.fetch_calls.get() + 1);
            let left = self.failures_left.get();
            if left > 0 {
                self.failures_left.set(left - 1);
                return Err(anyhow::anyhow!("connection reset"));
            }
            fs::create_dir_all(dest)?;
            fs::write(dest.join("payload.txt"), self.payload)?;
            Ok(())
        }

        fn pull_latest(&self, dest: &Path) -> Attempt {
            self.pull_calls.set(self.pull_calls.get() + 1);
            if self.fail_pulls {
                return Err(anyhow::anyhow!("connection reset"));
            }
            fs::write(dest.join("payload.txt"), self.payload)?;
            Ok(())
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, vec![0])
    }

    fn target<'a>(name: &'a str, path: &'a Path, source: &'a FakeSource) -> FetchTarget<'a> {
        FetchTarget {
            name,
            local_path: path,
            source,
        }
    }

    #[test]
    fn missing_folder_checks_out_and_writes_marker() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("svn://repo/trunk/featureX@HEAD", "v1");

        let result = reconcile(&target("t", &path, &source), &quick_policy(1)).unwrap();

        assert_eq!(result.action, SyncAction::Checkout);
        assert_eq!(result.reason, "folder missing");
        assert!(result.succeeded);
        assert_eq!(
            read_marker(&path).as_deref(),
            Some("svn://repo/trunk/featureX@HEAD")
        );
        assert_eq!(fs::read_to_string(path.join("payload.txt")).unwrap(), "v1");
    }

    #[test]
    fn second_call_updates_instead_of_checking_out() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("id", "v1");

        reconcile(&target("t", &path, &source), &quick_policy(1)).unwrap();
        let result = reconcile(&target("t", &path, &source), &quick_policy(1)).unwrap();

        assert_eq!(result.action, SyncAction::Update);
        assert_eq!(result.reason, "identity matches");
        assert_eq!(source.fetch_calls.get(), 1);
        assert_eq!(source.pull_calls.get(), 1);
    }

    #[test]
    fn missing_marker_forces_checkout() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        fs::create_dir_all(&path).unwrap();
        let source = FakeSource::new("id", "v1");

        let result = reconcile(&target("t", &path, &source), &quick_policy(1)).unwrap();

        assert_eq!(result.action, SyncAction::Checkout);
        assert_eq!(result.reason, "marker missing");
    }

    #[test]
    fn identity_change_discards_and_refetches() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let old = FakeSource::new("v760/featureX", "old");
        reconcile(&target("t", &path, &old), &quick_policy(1)).unwrap();
        fs::write(path.join("stale.txt"), "left over").unwrap();

        let new = FakeSource::new("trunk/featureX", "new");
        let result = reconcile(&target("t", &path, &new), &quick_policy(1)).unwrap();

        assert_eq!(result.action, SyncAction::Checkout);
        assert!(result.reason.contains("v760/featureX"));
        assert!(result.reason.contains("trunk/featureX"));
        assert_eq!(read_marker(&path).as_deref(), Some("trunk/featureX"));
        assert!(!path.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(path.join("payload.txt")).unwrap(), "new");
    }

    #[test]
    fn transient_fetch_failures_are_retried() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("id", "v1").failing_fetches(2);

        let result = reconcile(&target("t", &path, &source), &quick_policy(3)).unwrap();

        assert!(result.succeeded);
        assert_eq!(source.fetch_calls.get(), 3);
        assert_eq!(fs::read_to_string(path.join("payload.txt")).unwrap(), "v1");
    }

    #[test]
    fn exhausted_checkout_fails_and_leaves_no_marker() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("id", "v1").failing_fetches(u32::MAX);

        let err = reconcile(&target("t", &path, &source), &quick_policy(2)).unwrap_err();

        assert!(matches!(
            err,
            SyncError::FetchFailed {
                action: SyncAction::Checkout,
                ..
            }
        ));
        assert_eq!(source.fetch_calls.get(), 2);
        assert!(!path.exists());
        // next call starts over from scratch
        let (action, reason) = classify(&path, "id");
        assert_eq!(action, SyncAction::Checkout);
        assert_eq!(reason, "folder missing");
    }

    #[test]
    fn failed_refetch_preserves_the_previous_tree() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let old = FakeSource::new("identity-a", "old");
        reconcile(&target("t", &path, &old), &quick_policy(1)).unwrap();

        let new = FakeSource::new("identity-b", "new").failing_fetches(u32::MAX);
        let err = reconcile(&target("t", &path, &new), &quick_policy(2)).unwrap_err();

        assert!(matches!(err, SyncError::FetchFailed { .. }));
        assert_eq!(read_marker(&path).as_deref(), Some("identity-a"));
        assert_eq!(fs::read_to_string(path.join("payload.txt")).unwrap(), "old");
    }

    #[test]
    fn exhausted_update_fails_with_marker_intact() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("id", "v1");
        reconcile(&target("t", &path, &source), &quick_policy(1)).unwrap();

        let broken = FakeSource::new("id", "v2").failing_pulls();
        let err = reconcile(&target("t", &path, &broken), &quick_policy(3)).unwrap_err();

        assert!(matches!(
            err,
            SyncError::FetchFailed {
                action: SyncAction::Update,
                ..
            }
        ));
        assert_eq!(broken.pull_calls.get(), 3);
        assert_eq!(read_marker(&path).as_deref(), Some("id"));
        assert_eq!(fs::read_to_string(path.join("payload.txt")).unwrap(), "v1");
    }

    #[test]
    fn no_staging_leftovers_after_failure() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("wc");
        let source = FakeSource::new("id", "v1").failing_fetches(u32::MAX);

        let _ = reconcile(&target("t", &path, &source), &quick_policy(2)).unwrap_err();

        let leftovers: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "staging dir leaked: {leftovers:?}");
    }
}

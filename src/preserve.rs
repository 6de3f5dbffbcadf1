//! Pull into a working copy that is edited in place, without losing the
//! edits. Uncommitted changes are stashed around the pull and restored
//! afterward; losing them is treated as strictly worse than a stale pull, so
//! restore failures are surfaced distinctly and never auto-resolved.

use log::{debug, warn};

use crate::error::{Attempt, Maybe, SyncError};
use crate::reconcile::{ReconcileResult, SyncAction};
use crate::retry::{run_with_retry, RetryPolicy};

pub const RESTORE_HINT: &str =
    "the edits are kept in the stash; resolve them manually with `git stash pop`";

/// A working copy that supports setting local edits aside and reapplying
/// them around a pull.
pub trait WorkTree {
    fn has_local_changes(&mut self) -> Maybe<bool>;

    /// Snapshot uncommitted edits under `label` and leave the tree clean.
    fn stash(&mut self, label: &str) -> Attempt;

    fn pull(&mut self) -> Attempt;

    /// Reapply the snapshot taken by `stash`.
    fn restore(&mut self) -> Maybe<RestoreOutcome>;
}

#[derive(Debug)]
pub enum RestoreOutcome {
    Restored,
    /// The stash entry is gone, e.g. it was applied externally. Counts as
    /// success.
    AlreadyGone,
    /// The snapshot did not apply cleanly against the pulled content. The
    /// stash entry is kept.
    Conflict(String),
}

pub fn stash_label() -> String {
    format!("tether/{}: save before pull", whoami::username())
}

/// Pull latest into `tree`, preserving uncommitted local edits.
///
/// If stashing fails the pull is never attempted. If the pull exhausts its
/// retries and a stash was taken, a best-effort restore runs before the
/// failure is reported. A restore conflict after a successful pull is
/// reported as its own failure, with the report embedded, so callers can see
/// that the edits are still stashed.
pub fn sync_preserving_local_edits(
    tree: &mut dyn WorkTree,
    policy: &RetryPolicy,
) -> Result<ReconcileResult, SyncError> {
    let mut report = ReconcileResult::new(SyncAction::Update, "pull preserving local edits");

    report.local_changes_found = tree
        .has_local_changes()
        .map_err(SyncError::StashFailed)?;

    if report.local_changes_found {
        tree.stash(&stash_label()).map_err(SyncError::StashFailed)?;
        report.stashed = true;
        debug!("local changes stashed");
    }

    let pull = run_with_retry(policy, "pull", || tree.pull());

    if let Err(exhausted) = pull {
        let mut restored = false;
        if report.stashed {
            match tree.restore() {
                Ok(RestoreOutcome::Restored) | Ok(RestoreOutcome::AlreadyGone) => {
                    restored = true;
                }
                Ok(RestoreOutcome::Conflict(detail)) => {
                    warn!("could not restore stashed changes after failed pull: {detail}");
                }
                Err(e) => {
                    warn!("could not restore stashed changes after failed pull: {e:#}");
                }
            }
        }
        return Err(SyncError::PullFailed {
            exhausted,
            stashed: report.stashed,
            restored,
        });
    }

    if report.stashed {
        match tree.restore() {
            Ok(RestoreOutcome::Restored) => report.popped = true,
            Ok(RestoreOutcome::AlreadyGone) => {
                debug!("stash entry already gone, treating as restored");
                report.popped = true;
            }
            Ok(RestoreOutcome::Conflict(detail)) => {
                return Err(SyncError::RestoreConflict {
                    report,
                    detail,
                    hint: RESTORE_HINT,
                });
            }
            Err(e) => {
                return Err(SyncError::RestoreConflict {
                    report,
                    detail: format!("{e:#}"),
                    hint: RESTORE_HINT,
                });
            }
        }
    }

    report.succeeded = true;
    Ok(report)
}

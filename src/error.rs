use thiserror::Error;

use crate::reconcile::{ReconcileResult, SyncAction};

pub type Attempt = anyhow::Result<()>;

pub type Maybe<T> = anyhow::Result<T>;

pub fn fail<T>(message: &str) -> Maybe<T> {
    Err(anyhow::anyhow!("{message}"))
}

/// Every attempt of a retryable action failed. Carries the attempt count and
/// the last observed failure.
#[derive(Debug, Error)]
#[error("{label} gave up after {attempts} attempt(s): {last}")]
pub struct RetryExhausted {
    pub label: String,
    pub attempts: u32,
    pub last: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// A checkout or update exhausted its retries, or a step around the
    /// remote action (staging, marker write, swap) failed. A failed checkout
    /// leaves any previous tree and marker untouched.
    #[error("{name}: {action} failed: {detail}")]
    FetchFailed {
        name: String,
        action: SyncAction,
        detail: anyhow::Error,
    },

    /// Local edits could not be set aside. The pull is not attempted.
    #[error("could not stash local changes before pulling: {0}")]
    StashFailed(anyhow::Error),

    /// The pull exhausted its retries. `restored` records whether stashed
    /// local changes were put back.
    #[error("pull failed: {exhausted}")]
    PullFailed {
        exhausted: RetryExhausted,
        stashed: bool,
        restored: bool,
    },

    /// The pull landed but the stashed local edits did not apply cleanly.
    /// They are still in the stash; nothing is dropped.
    #[error("pulled successfully, but restoring stashed local changes failed: {detail}. {hint}")]
    RestoreConflict {
        report: ReconcileResult,
        detail: String,
        hint: &'static str,
    },
}

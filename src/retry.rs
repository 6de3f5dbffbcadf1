//! Bounded retry with a caller-supplied backoff ramp.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::RetryExhausted;

/// How often to attempt an action, and how long to wait between attempts.
///
/// The backoff sequence does not need one entry per attempt: once the ramp is
/// used up, the last entry is reused for every remaining wait. `[5, 15, 45]`
/// with five attempts waits `5, 15, 45, 45` seconds.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_seconds: Vec<u64>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_seconds: Vec<u64>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_seconds,
        }
    }

    /// One attempt, no waiting.
    pub fn single() -> Self {
        Self::new(1, vec![])
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the given failed attempt (1-based), clamped to the last
    /// configured entry.
    fn backoff_after(&self, attempt: u32) -> Duration {
        let last = self.backoff_seconds.len().saturating_sub(1);
        let index = (attempt as usize - 1).min(last);
        Duration::from_secs(self.backoff_seconds.get(index).copied().unwrap_or(0))
    }
}

/// Run `action` up to `policy.max_attempts()` times, sleeping out the backoff
/// between attempts. The first success short-circuits. Once attempts are
/// exhausted the last failure is returned; nothing is retried past the
/// ceiling.
pub fn run_with_retry<F>(policy: &RetryPolicy, label: &str, action: F) -> Result<(), RetryExhausted>
where
    F: FnMut() -> anyhow::Result<()>,
{
    run_with_sleeper(policy, label, action, &mut thread::sleep)
}

fn run_with_sleeper<F>(
    policy: &RetryPolicy,
    label: &str,
    mut action: F,
    sleep: &mut dyn FnMut(Duration),
) -> Result<(), RetryExhausted>
where
    F: FnMut() -> anyhow::Result<()>,
{
    let mut last: Option<anyhow::Error> = None;

    for attempt in 1..=policy.max_attempts {
        match action() {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    "{label}: attempt {attempt}/{} failed: {e:#}",
                    policy.max_attempts
                );
                last = Some(e);
            }
        }

        if attempt < policy.max_attempts {
            let wait = policy.backoff_after(attempt);
            if !wait.is_zero() {
                debug!("{label}: retrying in {}s", wait.as_secs());
            }
            sleep(wait);
        }
    }

    Err(RetryExhausted {
        label: label.to_string(),
        attempts: policy.max_attempts,
        last: last.unwrap_or_else(|| anyhow::anyhow!("action was never attempted")),
    })
}

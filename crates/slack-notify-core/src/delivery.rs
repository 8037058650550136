//! Bounded retry around a single message send.
//!
//! A failed attempt waits for the next delay in the [`RetryPolicy`] and
//! tries again; once the delays run out the last error is returned. Every
//! error is treated the same, with no jitter and no circuit breaking.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::NotifyError;
use crate::slack::{MessagePayload, Notifier};

/// Ordered delays slept between consecutive attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    /// 1s, 3s, 9s: four attempts in total.
    fn default() -> Self {
        Self::new([1, 3, 9].map(Duration::from_secs))
    }
}

impl RetryPolicy {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Initial attempt plus one per delay.
    pub fn max_attempts(&self) -> u32 {
        self.delays.len() as u32 + 1
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome<E = NotifyError> {
    /// Succeeded on attempt number `attempts`.
    Delivered { attempts: u32 },
    /// Every attempt failed; `last_error` is from the final one.
    Exhausted { attempts: u32, last_error: E },
}

impl<E> DeliveryOutcome<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts } => *attempts,
            DeliveryOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Run `op` until it succeeds or the policy's delays are used up.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<F, Fut, E>(policy: &RetryPolicy, mut op: F) -> DeliveryOutcome<E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut delays = policy.delays.iter();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(()) => return DeliveryOutcome::Delivered { attempts: attempt },
            Err(err) => match delays.next() {
                Some(delay) => {
                    warn!(
                        attempt,
                        error = %err,
                        retry_in_secs = delay.as_secs_f64(),
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(attempt, error = %err, "attempt failed, giving up");
                    return DeliveryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    };
                }
            },
        }
    }
}

/// Post `payload` through `notifier` under `policy`.
pub async fn deliver(
    notifier: &dyn Notifier,
    payload: &MessagePayload,
    policy: &RetryPolicy,
) -> DeliveryOutcome {
    let outcome = retry(policy, |attempt| {
        debug!(attempt, max = policy.max_attempts(), "posting message");
        notifier.send(payload)
    })
    .await;

    if let DeliveryOutcome::Delivered { attempts } = outcome {
        info!(attempts, "notification delivered");
    }
    outcome
}

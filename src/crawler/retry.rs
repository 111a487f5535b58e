//! Retry policy for single-URL operations
//!
//! An operation reports each attempt as an explicit `Attempt`; the policy
//! decides whether to wait and try again. Two failure classes are kept
//! apart:
//!
//! | Attempt | Wait | Budget |
//! |---------|------|--------|
//! | `Blocked` (HTTP 403) | `blocked_cooldown` | `max_blocked_retries` |
//! | `Failed` (anything else) | `base_delay`, not after the last try | `max_retries` |

use crate::config::FetchConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Outcome of one attempt
#[derive(Debug)]
pub enum Attempt<T, E> {
    Success(T),
    /// The server refused us; retried after the long cooldown
    Blocked,
    /// Ordinary failure; retried after the standard delay
    Failed(E),
}

/// How many times and how long to wait between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub blocked_cooldown: Duration,
    pub max_blocked_retries: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            blocked_cooldown: Duration::from_millis(config.blocked_cooldown_ms),
            max_blocked_retries: config.max_blocked_retries,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// What happened across all attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub attempts: u32,
    /// Long cooldowns taken after a `Blocked` attempt
    pub blocked_waits: u32,
    /// Standard delays taken after a `Failed` attempt
    pub backoff_waits: u32,
}

/// Runs `op` until it succeeds or the policy gives up
///
/// `op` receives the 1-based attempt number. Giving up yields `None`;
/// the last error is logged, never returned.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    target: &str,
    mut op: F,
) -> (Option<T>, RetryReport)
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut report = RetryReport::default();
    let mut failures = 0;
    let mut blocks = 0;

    loop {
        report.attempts += 1;

        match op(report.attempts).await {
            Attempt::Success(value) => return (Some(value), report),
            Attempt::Blocked => {
                blocks += 1;
                tracing::warn!(
                    "[403] Forbidden: {} (block {} of {})",
                    target,
                    blocks,
                    policy.max_blocked_retries + 1
                );
                if blocks > policy.max_blocked_retries {
                    tracing::error!("Giving up on {} after {} blocked attempts", target, blocks);
                    return (None, report);
                }
                report.blocked_waits += 1;
                tokio::time::sleep(policy.blocked_cooldown).await;
            }
            Attempt::Failed(error) => {
                failures += 1;
                tracing::warn!(
                    "Failed to fetch {} (attempt {} of {}): {}",
                    target,
                    failures,
                    policy.max_retries,
                    error
                );
                if failures >= policy.max_retries {
                    tracing::error!("Giving up on {} after {} failed attempts", target, failures);
                    return (None, report);
                }
                report.backoff_waits += 1;
                tokio::time::sleep(policy.base_delay).await;
            }
        }
    }
}

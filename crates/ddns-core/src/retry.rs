//! Bounded retry with exponential backoff
//!
//! [`RetryExecutor::execute`] calls an operation until it succeeds or the
//! attempt budget is spent. After failed attempt `n` it waits
//! `base_delay * 2^(n-1)` before the next one. There is no jitter and no
//! circuit breaker: the engine makes a handful of calls per TTL.
//!
//! Waits go through the [`Backoff`] trait. [`TokioBackoff`] sleeps on the
//! tokio timer and can be cut short with a [`BackoffInterrupter`]; an
//! interrupted wait is logged and the next attempt starts immediately.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Attempt budget and delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; a budget of zero is treated as a single attempt
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(10))
    }
}

/// A backoff wait was woken before its delay elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Waits between retry attempts
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Wait for `delay`, or return early with [`Interrupted`]
    async fn wait(&self, delay: Duration) -> std::result::Result<(), Interrupted>;
}

/// Backoff on the tokio timer
#[derive(Debug, Default)]
pub struct TokioBackoff {
    interrupt: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl TokioBackoff {
    /// Create a new tokio backoff
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that wakes waits currently in progress
    pub fn interrupter(&self) -> BackoffInterrupter {
        BackoffInterrupter {
            interrupt: Arc::clone(&self.interrupt),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) -> std::result::Result<(), Interrupted> {
        // Register before checking the flag so a concurrent close() is not missed
        let notified = self.interrupt.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.closed.load(Ordering::SeqCst) {
            return Err(Interrupted);
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = notified => Err(Interrupted),
        }
    }
}

/// Cloneable handle that cuts [`TokioBackoff`] waits short
#[derive(Debug, Clone)]
pub struct BackoffInterrupter {
    interrupt: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl BackoffInterrupter {
    /// Wake every backoff wait currently in progress
    ///
    /// Waits that start after the call are not affected.
    pub fn interrupt(&self) {
        self.interrupt.notify_waiters();
    }

    /// Wake current waits and make every later wait return at once
    ///
    /// Used at shutdown so a cycle stuck in backoff finishes its remaining
    /// attempts without sleeping.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.interrupt.notify_waiters();
    }
}

/// Runs operations under a [`RetryPolicy`]
pub struct RetryExecutor {
    policy: RetryPolicy,
    backoff: Arc<dyn Backoff>,
}

impl RetryExecutor {
    /// Create an executor with an explicit backoff implementation
    pub fn new(policy: RetryPolicy, backoff: Arc<dyn Backoff>) -> Self {
        Self { policy, backoff }
    }

    /// Call `operation` until it succeeds or the attempt budget is spent
    ///
    /// # Errors
    ///
    /// [`Error::RetriesExhausted`] carrying `label` and the last failure.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", label, attempt, max);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!("{} attempt {}/{} failed: {}", label, attempt, max, e);

                    if attempt >= max {
                        return Err(Error::RetriesExhausted {
                            label: label.to_string(),
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.policy.delay_after(attempt);
                    if self.backoff.wait(delay).await.is_err() {
                        warn!("{} backoff interrupted, retrying immediately", label);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

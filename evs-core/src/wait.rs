//! Bounded polling for remote long-running operations.
//!
//! vCenter tasks and EVS import tasks both report progress through a status
//! endpoint. [`poll_until`] drives such an endpoint with exponential backoff
//! until the attempt reports a terminal state, the timeout elapses, or the
//! caller cancels through a [`CancellationToken`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

/// First delay between two attempts.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single delay.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall wait budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

// Granularity at which a sleeping poller notices cancellation.
/// Floor for any delay between attempts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

/// Configuration for a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before the second attempt.
    pub initial_interval: Duration,
    /// Cap for the delay between attempts.
    pub max_interval: Duration,
    /// Factor applied to the delay after every pending attempt.
    pub multiplier: u32,
    /// Maximum time to wait for a terminal state.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: 2,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollConfig {
    /// Default backoff with the given overall timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sequence of delays between consecutive attempts, never shorter than
    /// [`MIN_INTERVAL`].
    pub fn intervals(&self) -> Backoff {
        let max = self.max_interval.max(MIN_INTERVAL);
        Backoff {
            next: self.initial_interval.max(MIN_INTERVAL).min(max),
            max,
            multiplier: self.multiplier.max(1),
        }
    }
}

/// Infinite iterator of exponentially growing, capped delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: u32,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current
            .checked_mul(self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        Some(current)
    }
}

/// Cooperative cancellation flag shared between a waiter and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The operation reached a terminal state.
    Ready(T),
    /// The operation is still queued or running.
    Pending,
}

/// Why a wait ended without a value.
#[derive(Error, Debug)]
pub enum WaitError<E> {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("wait was cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(E),
}

/// Repeatedly run `check` until it yields [`PollOutcome::Ready`].
///
/// The first check happens immediately. Errors returned by `check` end the
/// wait at once and are surfaced as [`WaitError::Failed`].
pub fn poll_until<T, E, F>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut check: F,
) -> std::result::Result<T, WaitError<E>>
where
    F: FnMut() -> std::result::Result<PollOutcome<T>, E>,
{
    let started = Instant::now();
    let mut intervals = config.intervals();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        attempt += 1;
        if let PollOutcome::Ready(value) = check().map_err(WaitError::Failed)? {
            trace!(attempt, "poll reached terminal state");
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            return Err(WaitError::Timeout(config.timeout));
        }

        let delay = intervals
            .next()
            .unwrap_or(config.max_interval)
            .min(config.timeout - elapsed);
        trace!(attempt, ?delay, "operation still pending");
        sleep_unless_cancelled(delay, cancel);
    }
}

fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(CANCEL_CHECK_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_config() -> PollConfig {
        PollConfig::with_timeout(Duration::from_secs(5))
            .initial_interval(Duration::from_millis(1))
            .max_interval(Duration::from_millis(2))
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let config = PollConfig::default();
        let delays: Vec<Duration> = config.intervals().take(8).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        assert_eq!(delays[5], Duration::from_millis(3200));
        assert_eq!(delays[6], Duration::from_secs(5));
        assert_eq!(delays[7], Duration::from_secs(5));
    }

    #[test]
    fn zero_intervals_are_floored() {
        let config = PollConfig::default()
            .initial_interval(Duration::ZERO)
            .max_interval(Duration::ZERO);
        let delays: Vec<Duration> = config.intervals().take(5).collect();
        assert!(delays.iter().all(|d| *d == MIN_INTERVAL), "{:?}", delays);
    }

    #[test]
    fn zero_initial_interval_still_grows() {
        let config = PollConfig::default()
            .initial_interval(Duration::ZERO)
            .max_interval(Duration::from_millis(8));
        let delays: Vec<Duration> = config.intervals().take(5).collect();
        assert_eq!(delays[0], Duration::from_millis(1));
        assert_eq!(delays[1], Duration::from_millis(2));
        assert_eq!(delays[4], Duration::from_millis(8));
    }

    #[test]
    fn zero_interval_wait_does_not_spin() {
        let config = PollConfig::with_timeout(Duration::from_millis(50))
            .initial_interval(Duration::ZERO)
            .max_interval(Duration::ZERO);
        let calls = Cell::new(0u32);
        let result: Result<(), WaitError<String>> =
            poll_until(&config, &CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                Ok(PollOutcome::Pending)
            });
        assert!(matches!(result, Err(WaitError::Timeout(_))));
        assert!(calls.get() <= 100, "polled {} times", calls.get());
    }

    #[test]
    fn ready_on_first_attempt_returns_value() {
        let result: Result<&str, WaitError<String>> =
            poll_until(&fast_config(), &CancellationToken::new(), || {
                Ok(PollOutcome::Ready("snapshot-42"))
            });
        assert_eq!(result.unwrap(), "snapshot-42");
    }

    #[test]
    fn pending_attempts_are_repeated() {
        let calls = Cell::new(0);
        let result: Result<u32, WaitError<String>> =
            poll_until(&fast_config(), &CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                if calls.get() < 4 {
                    Ok(PollOutcome::Pending)
                } else {
                    Ok(PollOutcome::Ready(calls.get()))
                }
            });
        assert_eq!(result.unwrap(), 4);
    }

    #[test]
    fn attempt_error_stops_the_wait() {
        let calls = Cell::new(0);
        let result: Result<(), WaitError<String>> =
            poll_until(&fast_config(), &CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                Err("task failed".to_string())
            });
        match result {
            Err(WaitError::Failed(msg)) => assert_eq!(msg, "task failed"),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn never_ready_times_out() {
        let config = PollConfig {
            timeout: Duration::from_millis(20),
            ..fast_config()
        };
        let result: Result<(), WaitError<String>> =
            poll_until(&config, &CancellationToken::new(), || Ok(PollOutcome::Pending));
        assert!(matches!(result, Err(WaitError::Timeout(t)) if t == Duration::from_millis(20)));
    }

    #[test]
    fn cancelled_token_stops_before_checking() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Cell::new(0);
        let result: Result<(), WaitError<String>> = poll_until(&fast_config(), &token, || {
            calls.set(calls.get() + 1);
            Ok(PollOutcome::Pending)
        });
        assert!(matches!(result, Err(WaitError::Cancelled)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn cancellation_from_another_thread_interrupts_wait() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });
        let config = PollConfig::with_timeout(Duration::from_secs(60))
            .initial_interval(Duration::from_secs(10))
            .max_interval(Duration::from_secs(10));
        let started = Instant::now();
        let result: Result<(), WaitError<String>> =
            poll_until(&config, &token, || Ok(PollOutcome::Pending));
        canceller.join().unwrap();
        assert!(matches!(result, Err(WaitError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

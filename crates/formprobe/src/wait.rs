//! Wait Mechanisms
//!
//! Deadline-driven polling used by every resolution step.
//!
//! The deadline is a plain value passed into the loop and checked once per
//! iteration. A predicate that is slow to evaluate can therefore overrun the
//! nominal deadline by at most one evaluation; the loop never races a timer
//! against an in-flight predicate.
//!
//! All timing goes through `tokio::time`, so tests drive the clock with
//! `#[tokio::test(start_paused = true)]`.

use crate::result::{FormprobeError, FormprobeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// DEADLINE
// =============================================================================

/// Absolute expiry for one wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            budget,
            expires_at: Instant::now() + budget,
        }
    }

    /// Deadline `ms` milliseconds from now
    #[must_use]
    pub fn after_ms(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry (zero once expired)
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// The original budget in milliseconds
    #[must_use]
    pub fn budget_ms(&self) -> u64 {
        self.budget.as_millis() as u64
    }

    fn timeout(&self, waited_for: &str) -> FormprobeError {
        FormprobeError::Timeout {
            ms: self.budget_ms(),
            waited_for: waited_for.to_string(),
        }
    }
}

// =============================================================================
// COUNT CONSTRAINT
// =============================================================================

/// Comparison applied to a matched element count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountComparator {
    /// `count == target`
    #[serde(rename = "==")]
    Equal,
    /// `count >= target`
    #[default]
    #[serde(rename = ">=")]
    AtLeast,
    /// `count <= target`
    #[serde(rename = "<=")]
    AtMost,
}

impl CountComparator {
    /// Apply the comparison
    #[must_use]
    pub const fn compare(self, count: usize, target: usize) -> bool {
        match self {
            Self::Equal => count == target,
            Self::AtLeast => count >= target,
            Self::AtMost => count <= target,
        }
    }

    /// Operator symbol
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

impl fmt::Display for CountComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Quantity of matching elements to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountConstraint {
    /// How the count is compared
    pub comparator: CountComparator,
    /// Count compared against
    pub target: usize,
}

impl Default for CountConstraint {
    fn default() -> Self {
        Self::at_least(1)
    }
}

impl CountConstraint {
    /// `count == target`
    #[must_use]
    pub const fn equal(target: usize) -> Self {
        Self {
            comparator: CountComparator::Equal,
            target,
        }
    }

    /// `count >= target`
    #[must_use]
    pub const fn at_least(target: usize) -> Self {
        Self {
            comparator: CountComparator::AtLeast,
            target,
        }
    }

    /// `count <= target`
    #[must_use]
    pub const fn at_most(target: usize) -> Self {
        Self {
            comparator: CountComparator::AtMost,
            target,
        }
    }

    /// Whether `count` satisfies the constraint
    #[must_use]
    pub const fn is_satisfied_by(&self, count: usize) -> bool {
        self.comparator.compare(count, self.target)
    }
}

impl fmt::Display for CountConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count {} {}", self.comparator, self.target)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate evaluations
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll a fallible async probe until it yields a value.
///
/// The probe is evaluated at least once, even if `deadline` has already
/// passed. Probe errors abort the wait immediately.
pub async fn try_poll_for<T, F, Fut>(
    mut probe: F,
    deadline: Deadline,
    poll_interval: Duration,
    waited_for: &str,
) -> FormprobeResult<(T, WaitResult)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FormprobeResult<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            tracing::trace!(waited_for, attempts, "wait satisfied");
            let result = WaitResult {
                elapsed: start.elapsed(),
                attempts,
                waited_for: waited_for.to_string(),
            };
            return Ok((value, result));
        }
        if deadline.is_expired() {
            tracing::debug!(waited_for, attempts, "wait expired");
            return Err(deadline.timeout(waited_for));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Poll a fallible async predicate until it returns `true`
pub async fn try_poll_until<F, Fut>(
    mut predicate: F,
    deadline: Deadline,
    poll_interval: Duration,
    waited_for: &str,
) -> FormprobeResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FormprobeResult<bool>>,
{
    let probe = || {
        let fut = predicate();
        async move { fut.await.map(|ready| ready.then_some(())) }
    };
    let ((), result) = try_poll_for(probe, deadline, poll_interval, waited_for).await?;
    Ok(result)
}

/// Poll an async predicate until it returns `true` or `deadline` expires
pub async fn poll_until<F, Fut>(
    mut predicate: F,
    deadline: Deadline,
    poll_interval: Duration,
    waited_for: &str,
) -> FormprobeResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    try_poll_until(
        || {
            let fut = predicate();
            async move { Ok(fut.await) }
        },
        deadline,
        poll_interval,
        waited_for,
    )
    .await
}

/// Sleep for a fixed duration (recorded settle delays)
pub async fn pause(duration_ms: u64) {
    if duration_ms > 0 {
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    }
}

// =============================================================================
// TESTS
// =============================================================================

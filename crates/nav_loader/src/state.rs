//! Initialization state machine and source-attempt records.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Per-page-view initialization state.
///
/// Transitions are monotonic and non-reentrant: `NotStarted -> Running ->
/// Completed`, and nothing ever leaves `Completed`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InitState {
    /// The install routine has not run; a failed load ends back here.
    NotStarted,
    /// The install routine is executing.
    Running,
    /// The install routine ran (whether or not anything was attached).
    Completed,
}

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETED: u8 = 2;

/// At-most-once execution guard for the install routine.
///
/// Every attempt callback and readiness arm funnels into `try_begin`, the
/// single compare-and-swap join point: the first arrival wins, every later
/// arrival observes `false` and must treat itself as a no-op.
#[derive(Debug)]
pub struct InitGuard {
    state: AtomicU8,
}

impl InitGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> InitState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => InitState::Running,
            COMPLETED => InitState::Completed,
            _ => InitState::NotStarted,
        }
    }

    /// The `NotStarted -> Running` join point. Returns whether this caller
    /// won the transition.
    #[must_use]
    pub fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The `Running -> Completed` transition. A no-op from any other state.
    pub fn finish(&self) {
        let _unused =
            self.state
                .compare_exchange(RUNNING, COMPLETED, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl Default for InitGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// The two configured payload origins, tried in order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SourceTier {
    Primary,
    Secondary,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => formatter.write_str("primary"),
            Self::Secondary => formatter.write_str("secondary"),
        }
    }
}

/// Resolution status of one load attempt.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AttemptStatus {
    Pending,
    Succeeded,
    Failed,
    TimedOut,
}

/// One load attempt: created when the load is initiated, resolved exactly
/// once when it succeeds, errors, or exceeds its deadline. Attempts are
/// never retried beyond the two configured tiers.
#[derive(Clone, Debug)]
pub struct SourceAttempt {
    tier: SourceTier,
    status: AttemptStatus,
    started: Instant,
    resolved_after: Option<Duration>,
}

impl SourceAttempt {
    /// Record the start of a load attempt for `tier`.
    #[must_use]
    pub fn begin(tier: SourceTier) -> Self {
        Self {
            tier,
            status: AttemptStatus::Pending,
            started: Instant::now(),
            resolved_after: None,
        }
    }

    /// First resolution wins; a resolved attempt never changes status.
    fn resolve(&mut self, status: AttemptStatus) {
        if self.status == AttemptStatus::Pending {
            self.status = status;
            self.resolved_after = Some(self.started.elapsed());
        }
    }

    pub fn succeed(&mut self) {
        self.resolve(AttemptStatus::Succeeded);
    }

    pub fn fail(&mut self) {
        self.resolve(AttemptStatus::Failed);
    }

    pub fn time_out(&mut self) {
        self.resolve(AttemptStatus::TimedOut);
    }

    #[must_use]
    pub const fn tier(&self) -> SourceTier {
        self.tier
    }

    #[must_use]
    pub const fn status(&self) -> AttemptStatus {
        self.status
    }

    /// Time from initiation to resolution, or elapsed so far while pending.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.resolved_after
            .unwrap_or_else(|| self.started.elapsed())
    }
}

impl fmt::Display for SourceAttempt {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} attempt {:?} after {:?}",
            self.tier,
            self.status,
            self.elapsed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AttemptStatus, InitGuard, InitState, SourceAttempt, SourceTier};

    #[test]
    fn guard_transitions_are_monotonic() {
        let guard = InitGuard::new();
        assert_eq!(guard.snapshot(), InitState::NotStarted);

        assert!(guard.try_begin());
        assert_eq!(guard.snapshot(), InitState::Running);

        guard.finish();
        assert_eq!(guard.snapshot(), InitState::Completed);

        // Nothing leaves Completed.
        assert!(!guard.try_begin());
        guard.finish();
        assert_eq!(guard.snapshot(), InitState::Completed);
    }

    #[test]
    fn only_the_first_arrival_wins_the_join() {
        let guard = InitGuard::new();
        assert!(guard.try_begin());
        assert!(!guard.try_begin());
        assert!(!guard.try_begin());
    }

    #[test]
    fn finish_without_begin_stays_not_started() {
        let guard = InitGuard::new();
        guard.finish();
        assert_eq!(guard.snapshot(), InitState::NotStarted);
        // Still winnable afterwards.
        assert!(guard.try_begin());
    }

    #[tokio::test]
    async fn attempts_resolve_exactly_once() {
        let mut attempt = SourceAttempt::begin(SourceTier::Primary);
        assert_eq!(attempt.status(), AttemptStatus::Pending);

        attempt.time_out();
        assert_eq!(attempt.status(), AttemptStatus::TimedOut);

        // A late success does not rewrite history.
        attempt.succeed();
        assert_eq!(attempt.status(), AttemptStatus::TimedOut);
        assert_eq!(attempt.tier(), SourceTier::Primary);
    }
}

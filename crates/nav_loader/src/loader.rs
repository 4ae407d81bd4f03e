//! The init-guarded loader: at-most-once navigation install sourced from
//! a resilient two-tier payload origin.
//!
//! The loader is event-driven and single-threaded: it suspends only while
//! waiting for the document's readiness signal and while a fetch or its
//! deadline is outstanding. Every attempt callback funnels into one
//! compare-and-swap join point, so the install routine can never run
//! twice within a page view.

use crate::config::LoaderConfig;
use crate::fetch::{HttpPayloadFetcher, LoadError, PayloadFetcher};
use crate::routine::{ChromeNavRoutine, NavRoutine};
use crate::state::{InitGuard, InitState, SourceAttempt, SourceTier};
use crate::telemetry::{AnalyticsSink, NullAnalytics};
use bytes::Bytes;
use host_doc::HostDocument;
use log::{debug, info, warn};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::select;
use tokio::time::sleep;
use tracing::{Instrument as _, info_span};

/// Payload resolved from one of the two tiers.
#[derive(Debug)]
pub struct LoadedPayload {
    /// Tier whose attempt delivered the payload.
    pub source: SourceTier,
    /// Raw payload bytes.
    pub bytes: Bytes,
}

/// Outcome of one `ensure_initialized` call.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InitOutcome {
    /// The routine ran; `attached` is false when the insertion target was
    /// absent at execution time.
    Completed { source: SourceTier, attached: bool },
    /// A prior call already ran the routine, is running it, or holds the
    /// in-flight load for this page view.
    AlreadyHandled,
    /// Both sources failed; the page continues without navigation.
    Degraded,
}

/// Guarantees the navigation install routine runs exactly once per page
/// view, as early as safely possible, from the best available source.
///
/// One loader corresponds to one page view; a new view (full load or SPA
/// route transition) constructs a fresh loader. Sharing the loader via
/// `Arc` gives every caller the same guard, so an erroneously
/// re-evaluated bootstrap entry point observes prior state and no-ops.
pub struct InitGuardedLoader {
    config: LoaderConfig,
    guard: InitGuard,
    /// Latch making the pre-`Running` waiting window idempotent too.
    load_in_flight: AtomicBool,
    fetcher: Arc<dyn PayloadFetcher>,
    routine: Mutex<Box<dyn NavRoutine>>,
    document: Arc<Mutex<HostDocument>>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl InitGuardedLoader {
    #[must_use]
    pub fn new(
        config: LoaderConfig,
        document: Arc<Mutex<HostDocument>>,
        fetcher: Arc<dyn PayloadFetcher>,
        routine: Box<dyn NavRoutine>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            config,
            guard: InitGuard::new(),
            load_in_flight: AtomicBool::new(false),
            fetcher,
            routine: Mutex::new(routine),
            document,
            analytics,
        }
    }

    /// Default fetcher, default routine bound to the configured selector,
    /// and no analytics.
    #[must_use]
    pub fn with_defaults(config: LoaderConfig, document: Arc<Mutex<HostDocument>>) -> Self {
        let routine = Box::new(ChromeNavRoutine::new(config.target_selector.clone()));
        Self::new(
            config,
            document,
            Arc::new(HttpPayloadFetcher),
            routine,
            Arc::new(NullAnalytics),
        )
    }

    /// Current initialization state for this page view.
    #[must_use]
    pub fn state(&self) -> InitState {
        self.guard.snapshot()
    }

    /// Idempotent entry point: run the guarded initialization once the
    /// document is ready and a payload has resolved from either tier.
    ///
    /// Never panics and never propagates an error to the host page; every
    /// failure path ends in a diagnostic and a safe, non-stuck state.
    pub async fn ensure_initialized(&self) -> InitOutcome {
        self.run_once().instrument(info_span!("nav_bootstrap")).await
    }

    async fn run_once(&self) -> InitOutcome {
        match self.guard.snapshot() {
            InitState::Running | InitState::Completed => {
                debug!("InitGuardedLoader: prior initialization observed; nothing to do");
                return InitOutcome::AlreadyHandled;
            }
            InitState::NotStarted => {}
        }
        // A re-evaluated bootstrap entry while the first load is still
        // pending funnels into the same join instead of starting a second
        // load.
        if self.load_in_flight.swap(true, Ordering::AcqRel) {
            debug!("InitGuardedLoader: a load attempt is already in flight");
            return InitOutcome::AlreadyHandled;
        }

        let mut readiness = self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe();

        let payload = match self.load_payload().await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("InitGuardedLoader: navigation unavailable for this page view: {err}");
                self.analytics
                    .record("nav_load_total_failure", &[("reason", err.to_string())]);
                self.load_in_flight.store(false, Ordering::Release);
                return InitOutcome::Degraded;
            }
        };

        readiness.wait_ready().await;

        if !self.guard.try_begin() {
            debug!("InitGuardedLoader: another arrival won the join");
            return InitOutcome::AlreadyHandled;
        }
        let attached = {
            let mut doc = self
                .document
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut routine = self.routine.lock().unwrap_or_else(PoisonError::into_inner);
            match routine.install(&payload.bytes, &mut doc) {
                Ok(attached) => attached,
                Err(err) => {
                    // A failed install never takes the page down; the guard
                    // still completes so spurious re-invocations stay no-ops.
                    warn!("InitGuardedLoader: install routine failed: {err:#}");
                    false
                }
            }
        };
        self.guard.finish();
        info!(
            "InitGuardedLoader: initialization complete from {} source (attached: {attached})",
            payload.source
        );
        self.analytics.record(
            "nav_installed",
            &[
                ("source", payload.source.to_string()),
                ("attached", attached.to_string()),
            ],
        );
        InitOutcome::Completed {
            source: payload.source,
            attached,
        }
    }

    /// Acquire the payload: primary first, secondary on hard error or
    /// after the primary's deadline.
    ///
    /// The deadline cancels only the *preference* for the primary, not the
    /// request itself: past the deadline both tiers race and the first
    /// successful arrival wins.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Exhausted` when both tiers failed.
    pub async fn load_payload(&self) -> Result<LoadedPayload, LoadError> {
        let mut attempts = Vec::new();
        let mut primary_attempt = SourceAttempt::begin(SourceTier::Primary);
        debug!(
            "InitGuardedLoader: loading payload from {}",
            self.config.primary_url
        );
        let mut primary_fetch = self
            .fetcher
            .fetch(SourceTier::Primary, &self.config.primary_url);
        let mut deadline = pin!(sleep(self.config.timeout()));

        select! {
            result = &mut primary_fetch => {
                return match result {
                    Ok(bytes) => {
                        primary_attempt.succeed();
                        debug!("InitGuardedLoader: {primary_attempt}");
                        Ok(LoadedPayload { source: SourceTier::Primary, bytes })
                    }
                    Err(err) => {
                        // A hard error skips the timeout wait entirely.
                        primary_attempt.fail();
                        attempts.push(primary_attempt);
                        warn!("InitGuardedLoader: primary source failed, falling back: {err}");
                        self.analytics.record(
                            "nav_load_fallback",
                            &[
                                ("reason", String::from("error")),
                                ("detail", err.to_string()),
                            ],
                        );
                        self.fallback_alone(attempts).await
                    }
                };
            }
            () = &mut deadline => {
                primary_attempt.time_out();
                let timeout_err = LoadError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                };
                warn!("InitGuardedLoader: {timeout_err}; starting additive fallback");
                self.analytics.record(
                    "nav_load_fallback",
                    &[
                        ("reason", String::from("timeout")),
                        ("timeout_ms", self.config.timeout_ms.to_string()),
                    ],
                );
            }
        }
        attempts.push(primary_attempt);

        // Additive fallback: the primary request stays in flight and races
        // the secondary.
        let mut secondary_attempt = SourceAttempt::begin(SourceTier::Secondary);
        let mut secondary_fetch = self
            .fetcher
            .fetch(SourceTier::Secondary, &self.config.secondary_url);
        let mut primary_racing = true;
        loop {
            select! {
                result = &mut primary_fetch, if primary_racing => match result {
                    Ok(bytes) => {
                        debug!(
                            "InitGuardedLoader: primary source resolved after its deadline; first arrival wins"
                        );
                        return Ok(LoadedPayload { source: SourceTier::Primary, bytes });
                    }
                    Err(err) => {
                        primary_racing = false;
                        warn!("InitGuardedLoader: late primary failure: {err}");
                    }
                },
                result = &mut secondary_fetch => match result {
                    Ok(bytes) => {
                        secondary_attempt.succeed();
                        debug!("InitGuardedLoader: {secondary_attempt}");
                        return Ok(LoadedPayload { source: SourceTier::Secondary, bytes });
                    }
                    Err(err) => {
                        // The secondary was the last recoverable option; a
                        // still-pending primary already exceeded its deadline.
                        secondary_attempt.fail();
                        attempts.push(secondary_attempt);
                        warn!("InitGuardedLoader: secondary source failed: {err}");
                        self.analytics.record(
                            "nav_load_failed",
                            &[
                                ("source", SourceTier::Secondary.to_string()),
                                ("detail", err.to_string()),
                            ],
                        );
                        return Err(LoadError::Exhausted { attempts });
                    }
                },
            }
        }
    }

    /// Hard primary failure: no timeout wait, the secondary runs alone.
    async fn fallback_alone(
        &self,
        mut attempts: Vec<SourceAttempt>,
    ) -> Result<LoadedPayload, LoadError> {
        let mut attempt = SourceAttempt::begin(SourceTier::Secondary);
        match self
            .fetcher
            .fetch(SourceTier::Secondary, &self.config.secondary_url)
            .await
        {
            Ok(bytes) => {
                attempt.succeed();
                debug!("InitGuardedLoader: {attempt}");
                Ok(LoadedPayload {
                    source: SourceTier::Secondary,
                    bytes,
                })
            }
            Err(err) => {
                attempt.fail();
                attempts.push(attempt);
                warn!("InitGuardedLoader: secondary source failed: {err}");
                self.analytics.record(
                    "nav_load_failed",
                    &[
                        ("source", SourceTier::Secondary.to_string()),
                        ("detail", err.to_string()),
                    ],
                );
                Err(LoadError::Exhausted { attempts })
            }
        }
    }
}

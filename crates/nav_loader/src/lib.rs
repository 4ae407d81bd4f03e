//! Init-guarded navigation bootstrapping for a host page.
//!
//! This crate guarantees that a page view's navigation chrome is
//! installed exactly once, as early as safely possible, with the payload
//! sourced from a primary origin and a secondary fallback on failure or
//! timeout. It coordinates the document readiness signal, the two-tier
//! payload race, and the at-most-once install join point.

pub mod config;
pub use config::LoaderConfig;

/// Payload acquisition: the fetcher seam, the default HTTP/file fetcher,
/// and the load-failure taxonomy.
pub mod fetch;
pub use fetch::{FetchFuture, HttpPayloadFetcher, LoadError, PayloadFetcher};

pub mod loader;
pub use loader::{InitGuardedLoader, InitOutcome, LoadedPayload};

/// Navigation manifest model and the default install routine.
pub mod routine;
pub use routine::{ChromeNavRoutine, NavItem, NavManifest, NavRoutine};

pub mod state;
pub use state::{AttemptStatus, InitGuard, InitState, SourceAttempt, SourceTier};

pub mod telemetry;
pub use telemetry::{AnalyticsSink, LogAnalytics, NullAnalytics};

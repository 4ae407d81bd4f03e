//! Best-effort analytics for load outcomes.
//! Kept independent of loader internals; callers pass flat key/value
//! fields explicitly.

use log::info;
use serde_json::{Map, Value};

/// Sink for named analytics events with a flat key/value payload.
///
/// Implementations are best-effort by construction: the signature is
/// infallible and a sink must never panic or influence loader control
/// flow.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: &str, fields: &[(&str, String)]);
}

/// Emits each event as a single JSON line at info level.
#[derive(Default)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn record(&self, event: &str, fields: &[(&str, String)]) {
        let mut line = Map::new();
        line.insert(String::from("event"), Value::from(event));
        for (key, value) in fields {
            line.insert((*key).to_owned(), Value::from(value.clone()));
        }
        info!("{}", Value::Object(line));
    }
}

/// Discards every event.
#[derive(Default)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn record(&self, _event: &str, _fields: &[(&str, String)]) {}
}

#[cfg(test)]
mod tests {
    use super::{AnalyticsSink as _, LogAnalytics, NullAnalytics};

    #[test]
    fn sinks_accept_arbitrary_fields() {
        let fields = [
            ("source", String::from("primary")),
            ("detail", String::from("status 503")),
        ];
        LogAnalytics.record("nav_load_failed", &fields);
        NullAnalytics.record("nav_load_failed", &fields);
        LogAnalytics.record("nav_installed", &[]);
    }
}

//! Navigation manifest model and the default install routine.

use anyhow::{Context as _, Result};
use bytes::Bytes;
use host_doc::HostDocument;
use log::{debug, warn};
use serde::Deserialize;

/// Payload model: the navigation entries shipped by the chrome origin.
#[derive(Clone, Debug, Deserialize)]
pub struct NavManifest {
    /// Optional brand label rendered ahead of the entries.
    #[serde(default)]
    pub brand: Option<String>,
    /// Ordered navigation entries.
    pub items: Vec<NavItem>,
}

/// One navigation entry.
#[derive(Clone, Debug, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub href: String,
}

impl NavManifest {
    /// Parse a manifest from raw payload bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid manifest.
    pub fn from_payload(payload: &Bytes) -> Result<Self> {
        serde_json::from_slice(payload).context("malformed navigation manifest")
    }
}

/// A minimal interface for the guarded initialization routine.
/// Keep this trait small so hosts can swap the install behavior (e.g., a
/// script-evaluating host instead of structural insertion).
pub trait NavRoutine: Send {
    /// Install navigation into the document. Returns whether anything was
    /// attached; a missing insertion target is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is unusable. Callers log and move
    /// on; the routine is never retried.
    fn install(&mut self, payload: &Bytes, doc: &mut HostDocument) -> Result<bool>;
}

/// Default routine: parse the manifest and attach a `nav` subtree under
/// the configured insertion target.
pub struct ChromeNavRoutine {
    target_selector: String,
}

impl ChromeNavRoutine {
    #[must_use]
    pub fn new(target_selector: impl Into<String>) -> Self {
        Self {
            target_selector: target_selector.into(),
        }
    }
}

impl NavRoutine for ChromeNavRoutine {
    fn install(&mut self, payload: &Bytes, doc: &mut HostDocument) -> Result<bool> {
        let manifest = NavManifest::from_payload(payload)?;
        let Some(target) = doc.query_selector(&self.target_selector) else {
            // An absent anchor is a degraded page, not a failure.
            warn!(
                "ChromeNavRoutine: insertion target {} not found; nothing to attach",
                self.target_selector
            );
            return Ok(false);
        };
        let nav = doc.insert_element(target, "nav")?;
        if let Some(brand) = &manifest.brand {
            let span = doc.insert_element(nav, "span")?;
            doc.set_attr(span, "class", "brand");
            doc.insert_text(span, brand)?;
        }
        for item in &manifest.items {
            let anchor = doc.insert_element(nav, "a")?;
            doc.set_attr(anchor, "href", &item.href);
            doc.insert_text(anchor, &item.label)?;
        }
        debug!(
            "ChromeNavRoutine: attached {} entries under {}",
            manifest.items.len(),
            self.target_selector
        );
        Ok(true)
    }
}

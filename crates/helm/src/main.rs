//! Demo host: builds a document with a navigation slot, marks it ready,
//! and runs one guarded bootstrap from `HELM_*` environment configuration.

use anyhow::Error;
use host_doc::{HostDocument, NodeKey};
use log::{error, info};
use nav_loader::{
    ChromeNavRoutine, HttpPayloadFetcher, InitGuardedLoader, InitOutcome, LoaderConfig,
    LogAnalytics,
};
use std::process;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

pub fn main() {
    env_logger::init();
    if let Err(err) = run() {
        error!("helm: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let config = LoaderConfig::from_env()?;
    let runtime = Runtime::new()?;
    let document = Arc::new(Mutex::new(build_document()?));

    let routine = Box::new(ChromeNavRoutine::new(config.target_selector.clone()));
    let loader = InitGuardedLoader::new(
        config,
        Arc::clone(&document),
        Arc::new(HttpPayloadFetcher),
        routine,
        Arc::new(LogAnalytics),
    );

    match runtime.block_on(loader.ensure_initialized()) {
        InitOutcome::Completed { source, attached } => {
            info!("helm: navigation initialized from {source} source (attached: {attached})");
        }
        InitOutcome::AlreadyHandled => info!("helm: navigation was already initialized"),
        InitOutcome::Degraded => info!("helm: continuing without navigation"),
    }
    Ok(())
}

/// A page-shaped document (`html > body > div#nav`), already past loading.
fn build_document() -> Result<HostDocument, Error> {
    let mut doc = HostDocument::new();
    let body = doc.insert_element(NodeKey::ROOT, "body")?;
    let slot = doc.insert_element(body, "div")?;
    doc.set_attr(slot, "id", "nav");
    doc.mark_ready();
    Ok(doc)
}

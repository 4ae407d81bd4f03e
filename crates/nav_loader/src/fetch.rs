//! Payload acquisition from a single source URL.
//!
//! Supported URL schemes for the default fetcher:
//! - `http`, `https`: Fetched via `reqwest` as a streaming response
//! - `file`: Read from the local filesystem (emitted as a single chunk)

use crate::state::{SourceAttempt, SourceTier};
use bytes::{Bytes, BytesMut};
use reqwest::get as reqwest_get;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::fs::read as tokio_fs_read;
use tokio_stream::StreamExt as _;
use url::Url;

/// Failure taxonomy for payload loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// One source failed to load (network, filesystem, status, or scheme).
    #[error("{tier} source {url} failed: {reason}")]
    Source {
        tier: SourceTier,
        url: Url,
        reason: String,
    },
    /// The primary source did not resolve within its budget.
    #[error("primary source timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Both sources failed; the page continues without navigation.
    #[error("all payload sources exhausted ({} attempts)", .attempts.len())]
    Exhausted { attempts: Vec<SourceAttempt> },
}

/// Boxed fetch future so fetchers stay swappable behind `dyn`.
pub type FetchFuture<'fut> = Pin<Box<dyn Future<Output = Result<Bytes, LoadError>> + Send + 'fut>>;

/// A minimal interface for acquiring a payload from one source URL.
/// Keep this trait small so transports can be swapped (HTTP, file, test
/// doubles).
pub trait PayloadFetcher: Send + Sync {
    /// Start one load attempt for `url`. The `tier` is carried through so
    /// failures stay attributable to the source that produced them.
    fn fetch<'fut>(&'fut self, tier: SourceTier, url: &'fut Url) -> FetchFuture<'fut>;
}

/// Default fetcher backed by `reqwest` and the local filesystem.
#[derive(Default)]
pub struct HttpPayloadFetcher;

impl HttpPayloadFetcher {
    fn source_error(tier: SourceTier, url: &Url, reason: String) -> LoadError {
        LoadError::Source {
            tier,
            url: url.clone(),
            reason,
        }
    }

    async fn fetch_inner(tier: SourceTier, url: &Url) -> Result<Bytes, LoadError> {
        match url.scheme() {
            "http" | "https" => {
                let response = reqwest_get(url.clone())
                    .await
                    .map_err(|err| Self::source_error(tier, url, err.to_string()))?;
                if !response.status().is_success() {
                    return Err(Self::source_error(
                        tier,
                        url,
                        format!("status {}", response.status()),
                    ));
                }
                let mut body = BytesMut::new();
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let bytes =
                        chunk.map_err(|err| Self::source_error(tier, url, err.to_string()))?;
                    body.extend_from_slice(&bytes);
                }
                Ok(body.freeze())
            }
            "file" => {
                let path = url.to_file_path().map_err(|()| {
                    Self::source_error(tier, url, String::from("invalid file path"))
                })?;
                let data = tokio_fs_read(path)
                    .await
                    .map_err(|err| Self::source_error(tier, url, err.to_string()))?;
                Ok(Bytes::from(data))
            }
            other => Err(Self::source_error(
                tier,
                url,
                format!("unsupported url scheme {other}"),
            )),
        }
    }
}

impl PayloadFetcher for HttpPayloadFetcher {
    fn fetch<'fut>(&'fut self, tier: SourceTier, url: &'fut Url) -> FetchFuture<'fut> {
        Box::pin(Self::fetch_inner(tier, url))
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpPayloadFetcher, LoadError, PayloadFetcher as _};
    use crate::state::SourceTier;
    use std::fs::write;
    use url::Url;

    #[tokio::test]
    async fn file_scheme_reads_the_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nav.json");
        write(&path, b"{\"items\":[]}").expect("fixture");
        let url = Url::from_file_path(&path).expect("file url");

        let fetcher = HttpPayloadFetcher;
        let bytes = fetcher
            .fetch(SourceTier::Primary, &url)
            .await
            .expect("payload");
        assert_eq!(bytes.as_ref(), b"{\"items\":[]}");
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = Url::from_file_path(dir.path().join("absent.json")).expect("file url");

        let fetcher = HttpPayloadFetcher;
        let result = fetcher.fetch(SourceTier::Secondary, &url).await;
        match result {
            Err(LoadError::Source { tier, .. }) => assert_eq!(tier, SourceTier::Secondary),
            other => panic!("expected a source error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_scheme_is_a_source_error() {
        let url = Url::parse("ftp://example.com/nav.json").expect("url");
        let fetcher = HttpPayloadFetcher;
        assert!(fetcher.fetch(SourceTier::Primary, &url).await.is_err());
    }
}

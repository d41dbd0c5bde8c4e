//! # Reqwest Backend
//!
//! The standard request mechanism: a `reqwest` client wrapped in
//! `reqwest_middleware`, plus local reads for `file:` URLs. Retries are not
//! installed as middleware here; the fetch helper decides when to retry so it
//! can also retry on empty bodies.

use std::path::PathBuf;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use crate::configs::TransportConfig;
use crate::retrieve::transport::{Backend, RequestRecord};

/// Errors raised while performing a single request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The client could not be built or the body could not be read.
    #[error("HTTP body error: {0}")]
    Body(#[from] reqwest::Error),

    /// A local file could not be read.
    #[error("Local read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A `file:` URL without a usable local path.
    #[error("Not a local path: {0}")]
    FilePath(String),
}

/// `reqwest`-backed [`Backend`].
#[derive(Clone)]
pub struct ReqwestBackend {
    inner: ClientWithMiddleware,
}

impl ReqwestBackend {
    /// Builds the client with the configured user agent, and the timeout
    /// when one is set.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?))
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            inner: ClientBuilder::new(client).build(),
        }
    }

    async fn send_http(
        inner: ClientWithMiddleware,
        method: Method,
        url: Url,
    ) -> Result<RequestRecord, TransportError> {
        let response = inner.request(method, url).send().await?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await?;
        Ok(RequestRecord::new(status.as_u16(), status_text, Some(body)))
    }

    /// Local files have no HTTP status: a read reports status 0 with the body.
    async fn read_file(url: Url) -> Result<RequestRecord, TransportError> {
        let path: PathBuf = url
            .to_file_path()
            .map_err(|_| TransportError::FilePath(url.to_string()))?;
        let body = tokio::fs::read_to_string(&path).await?;
        Ok(RequestRecord::new(0, "", Some(body)))
    }
}

impl Backend for ReqwestBackend {
    fn send(
        &self,
        method: Method,
        url: Url,
    ) -> BoxFuture<'static, Result<RequestRecord, TransportError>> {
        if url.scheme() == "file" {
            return Self::read_file(url).boxed();
        }
        Self::send_http(self.inner.clone(), method, url).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_local_files_with_status_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-1.svg");
        std::fs::write(&path, "<svg/>").unwrap();

        let backend = ReqwestBackend::with_client(reqwest::Client::new());
        let url = Url::from_file_path(&path).unwrap();
        let record = backend.send(Method::GET, url).await.unwrap();

        assert_eq!(record.status, 0);
        assert_eq!(record.response_text.as_deref(), Some("<svg/>"));
    }

    #[tokio::test]
    async fn missing_local_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ReqwestBackend::with_client(reqwest::Client::new());
        let url = Url::from_file_path(dir.path().join("absent.svg")).unwrap();

        let err = backend.send(Method::GET, url).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}

//! # Transport
//!
//! Issues one request and reports it through `success`/`fail` callbacks with a
//! [`RequestRecord`], whichever mechanism carried it:
//!
//! 1. Cross-origin requests the standard backend cannot make (no credentialed
//!    cross-origin support) go through the cross-domain backend if one is
//!    installed; otherwise `fail` receives `{0, "CORS not supported"}`.
//! 2. Without any backend, `fail` receives `{0, "AJAX not supported"}`.
//! 3. Status 200, or a local-file read accepted by
//!    [`is_request_to_local_file_ok`], is a success: the record is stored in the
//!    offline cache, then `success` runs.
//! 4. Status 0 (no response) with offline replay enabled looks the URL up in the
//!    offline cache and replays a hit through `success`; a miss runs `fail`.
//! 5. Anything else runs `fail`.
//!
//! Callbacks are `FnOnce` and consumed on completion, so a request completes
//! at most once. An aborted request runs neither callback.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::configs::TransportConfig;
use crate::error::ConfigError;
use crate::retrieve::backend::{ReqwestBackend, TransportError};
use crate::retrieve::offline::{self, OfflineCache};
use crate::utils::common::{is_cross_domain, is_request_to_local_file_ok, resolve_url};

/// Status text reported when a cross-origin request has no usable backend.
pub const CORS_NOT_SUPPORTED: &str = "CORS not supported";
/// Status text reported when no backend is installed at all.
pub const AJAX_NOT_SUPPORTED: &str = "AJAX not supported";
/// Status text reported when a request is issued outside a tokio runtime.
pub const NO_RUNTIME: &str = "no async runtime";

/// The normalized outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// HTTP status, `0` when no response arrived.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response body, if one could be read.
    pub response_text: Option<String>,
}

impl RequestRecord {
    /// Builds a record.
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        response_text: Option<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            response_text,
        }
    }

    /// The record of a request whose result could not be read.
    pub fn unavailable() -> Self {
        Self::new(0, "", None)
    }

    /// A status-0 failure with an explanation.
    pub fn failure(status_text: impl Into<String>) -> Self {
        Self::new(0, status_text, None)
    }

    /// Body length in bytes, `0` when absent.
    pub fn body_len(&self) -> usize {
        self.response_text.as_ref().map(String::len).unwrap_or(0)
    }
}

/// Callback receiving the completed record.
pub type RequestCallback = Box<dyn FnOnce(RequestRecord) + Send>;

/// Options of a single request.
pub struct RequestOptions {
    /// HTTP method, `GET` by default.
    pub method: Method,
    /// Replay the offline cache when the network is unreachable. On by default.
    pub offline: bool,
    success: Option<RequestCallback>,
    fail: Option<RequestCallback>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            offline: true,
            success: None,
            fail: None,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("offline", &self.offline)
            .finish()
    }
}

impl RequestOptions {
    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Enables or disables offline replay for this request.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Sets the success callback.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(RequestRecord) + Send + 'static,
    {
        self.success = Some(Box::new(callback));
        self
    }

    /// Sets the failure callback.
    pub fn on_fail<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(RequestRecord) + Send + 'static,
    {
        self.fail = Some(Box::new(callback));
        self
    }

    /// Runs the success callback (if any) with `record`.
    pub fn succeed(self, record: RequestRecord) {
        if let Some(callback) = self.success {
            callback(record);
        }
    }

    /// Runs the failure callback (if any) with `record`.
    pub fn fail(self, record: RequestRecord) {
        if let Some(callback) = self.fail {
            callback(record);
        }
    }

    /// Dispatches a classified outcome to the matching callback.
    pub fn complete(self, outcome: Result<RequestRecord, RequestRecord>) {
        match outcome {
            Ok(record) => self.succeed(record),
            Err(record) => self.fail(record),
        }
    }
}

/// Cancels an issued request.
#[derive(Clone)]
pub struct RequestHandle {
    abort: Arc<dyn Fn() + Send + Sync>,
}

impl RequestHandle {
    /// A handle that cancels `token`.
    pub fn from_token(token: CancellationToken) -> Self {
        Self::from_fn(move || token.cancel())
    }

    /// A handle running `abort` when aborted.
    pub fn from_fn<F>(abort: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            abort: Arc::new(abort),
        }
    }

    /// A handle for a request that already completed synchronously.
    pub fn finished() -> Self {
        Self::from_fn(|| {})
    }

    /// Cancels the request if it is still in flight.
    pub fn abort(&self) {
        (self.abort)();
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestHandle")
    }
}

/// Issues single requests and reports them through callbacks.
pub trait Transport: Send + Sync {
    /// Starts a request. Callbacks run once it completes, possibly before
    /// this returns.
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle;
}

/// A raw request mechanism.
pub trait Backend: Send + Sync {
    /// Performs one request. Errors are normalized by the caller.
    fn send(
        &self,
        method: Method,
        url: Url,
    ) -> BoxFuture<'static, Result<RequestRecord, TransportError>>;
}

/// The transport over the standard and cross-domain backends with the
/// offline fallback.
pub struct HttpTransport {
    origin: Option<Url>,
    standard: Option<Arc<dyn Backend>>,
    standard_cross_origin: bool,
    cross_domain: Option<Arc<dyn Backend>>,
    offline_enabled: bool,
    cache: Arc<dyn OfflineCache>,
}

impl HttpTransport {
    /// A transport over `standard` with the given offline cache. No origin is
    /// set, so every absolute URL counts as same-origin.
    pub fn new(standard: Arc<dyn Backend>, cache: Arc<dyn OfflineCache>) -> Self {
        Self {
            origin: None,
            standard: Some(standard),
            standard_cross_origin: true,
            cross_domain: None,
            offline_enabled: true,
            cache,
        }
    }

    /// A transport without any backend; every request fails.
    pub fn unsupported(cache: Arc<dyn OfflineCache>) -> Self {
        Self {
            origin: None,
            standard: None,
            standard_cross_origin: false,
            cross_domain: None,
            offline_enabled: true,
            cache,
        }
    }

    /// The reqwest-backed transport described by `config`.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportSetupError> {
        let backend = ReqwestBackend::from_config(config)?;
        let cache = offline::from_config(config)?;
        Ok(Self::new(Arc::new(backend), cache)
            .with_origin(config.origin_url()?)
            .with_credentials(config.with_credentials)
            .with_offline(config.offline))
    }

    /// Sets the viewer origin.
    pub fn with_origin(mut self, origin: Option<Url>) -> Self {
        self.origin = origin;
        self
    }

    /// Declares whether the standard backend supports credentialed
    /// cross-origin requests.
    pub fn with_credentials(mut self, supported: bool) -> Self {
        self.standard_cross_origin = supported;
        self
    }

    /// Installs the backend for cross-origin requests the standard one cannot make.
    pub fn with_cross_domain(mut self, backend: Arc<dyn Backend>) -> Self {
        self.cross_domain = Some(backend);
        self
    }

    /// Globally enables or disables offline replay.
    pub fn with_offline(mut self, enabled: bool) -> Self {
        self.offline_enabled = enabled;
        self
    }

    /// The offline cache in use.
    pub fn offline_cache(&self) -> &Arc<dyn OfflineCache> {
        &self.cache
    }

    /// Picks the backend for `target`, or the failure text when none fits.
    fn route(&self, target: &Url) -> Result<Route, &'static str> {
        let cross = is_cross_domain(self.origin.as_ref(), target);
        if cross && !(self.standard.is_some() && self.standard_cross_origin) {
            return match &self.cross_domain {
                Some(backend) => Ok(Route {
                    backend: Arc::clone(backend),
                    cacheable: false,
                }),
                None => Err(CORS_NOT_SUPPORTED),
            };
        }
        match &self.standard {
            Some(backend) => Ok(Route {
                backend: Arc::clone(backend),
                cacheable: true,
            }),
            None => Err(AJAX_NOT_SUPPORTED),
        }
    }
}

struct Route {
    backend: Arc<dyn Backend>,
    /// Standard responses feed and replay the offline cache.
    cacheable: bool,
}

impl Transport for HttpTransport {
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        let target = match resolve_url(self.origin.as_ref(), url) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("Cannot request '{}': {}", url, e);
                options.fail(RequestRecord::failure(e.to_string()));
                return RequestHandle::finished();
            }
        };

        let route = match self.route(&target) {
            Ok(route) => route,
            Err(reason) => {
                log::warn!("Cannot request '{}': {}", url, reason);
                options.fail(RequestRecord::failure(reason));
                return RequestHandle::finished();
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            log::warn!("Cannot request '{}': {}", url, NO_RUNTIME);
            options.fail(RequestRecord::failure(NO_RUNTIME));
            return RequestHandle::finished();
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let key = url.to_string();
        let cache = Arc::clone(&self.cache);
        let offline = self.offline_enabled && options.offline;
        let method = options.method.clone();

        runtime.spawn(async move {
            let result = tokio::select! {
                _ = cancelled.cancelled() => {
                    log::debug!("Request to {} aborted", key);
                    return;
                }
                result = route.backend.send(method, target.clone()) => result,
            };

            let record = result.unwrap_or_else(|e| {
                log::warn!("Request to {} failed: {}", key, e);
                RequestRecord::unavailable()
            });

            let outcome = if route.cacheable {
                classify(&key, &target, record, offline, cache.as_ref())
            } else if record.status == 200 {
                Ok(record)
            } else {
                Err(record)
            };
            options.complete(outcome);
        });

        RequestHandle::from_token(token)
    }
}

/// Sorts a completed standard request into success or failure, feeding and
/// consulting the offline cache.
pub fn classify(
    key: &str,
    target: &Url,
    record: RequestRecord,
    offline: bool,
    cache: &dyn OfflineCache,
) -> Result<RequestRecord, RequestRecord> {
    if record.status == 200 || is_request_to_local_file_ok(target, &record) {
        cache.store(key, &record);
        return Ok(record);
    }

    if record.status == 0 && offline {
        return match cache.lookup(key) {
            Some(cached) => {
                log::info!("Offline replay for {}", key);
                Ok(cached)
            }
            None => {
                log::debug!("No offline copy of {}", key);
                Err(record)
            }
        };
    }

    Err(record)
}

/// Errors building the configured transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportSetupError {
    /// The HTTP client could not be created.
    #[error("Cannot build HTTP client: {0}")]
    Client(#[from] TransportError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The offline cache directory cannot be used.
    #[error("Cannot open offline cache: {0}")]
    Cache(#[from] std::io::Error),
}

//! # Ajax Utility
//!
//! The `ajax` utility: the process transport plus a retrying fetch that turns
//! callback-style requests into an [`AbortableFuture`].
//!
//! A fetch resolves with the first non-empty body. Empty bodies and failed
//! requests are retried while the budget lasts, waiting between attempts as
//! dictated by an exponential backoff policy. When the budget is spent the
//! future rejects with the error of the last attempt.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{RetryDecision, RetryPolicy};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::core::future::AbortableFuture;
use crate::error::AssetError;
use crate::retrieve::transport::{RequestHandle, RequestOptions, RequestRecord, Transport};

/// Utility name under which [`Ajax`] is registered.
pub const AJAX_UTILITY: &str = "ajax";

const DEFAULT_RETRY_BOUNDS: (Duration, Duration) =
    (Duration::from_millis(250), Duration::from_millis(2_000));

/// Transport access for data providers.
#[derive(Clone)]
pub struct Ajax {
    transport: Arc<dyn Transport>,
    origin: Option<Url>,
    retry_bounds: (Duration, Duration),
}

impl Ajax {
    /// Wraps `transport` with the default backoff bounds.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            origin: None,
            retry_bounds: DEFAULT_RETRY_BOUNDS,
        }
    }

    /// Sets the viewer origin that relative asset URLs resolve against.
    pub fn with_origin(mut self, origin: Option<Url>) -> Self {
        self.origin = origin;
        self
    }

    /// The viewer origin, if known.
    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    /// Sets the shortest and longest wait between retries.
    pub fn with_retry_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.retry_bounds = (min, max.max(min));
        self
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Issues a single request. See [`Transport::request`].
    pub fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        self.transport.request(url, options)
    }

    /// GETs `url`, retrying up to `retries` more times on failure or empty body.
    /// Outside a tokio runtime the future rejects with [`AssetError::NoRuntime`].
    pub fn fetch(&self, url: &str, retries: u32) -> AbortableFuture<String> {
        let Ok(runtime) = Handle::try_current() else {
            log::warn!("Cannot fetch {} outside a tokio runtime", url);
            return AbortableFuture::rejected(AssetError::NoRuntime);
        };
        let (deferred, future) = AbortableFuture::pending();
        let transport = Arc::clone(&self.transport);
        let (min, max) = self.retry_bounds;
        let policy = ExponentialBackoff::builder()
            .retry_bounds(min, max)
            .build_with_max_retries(retries);
        let url = url.to_string();
        let token = deferred.token();

        runtime.spawn(async move {
            let started = SystemTime::now();
            let mut past_retries = 0;
            loop {
                let Some(outcome) = attempt(transport.as_ref(), &url, &token).await else {
                    log::debug!("Fetch of {} aborted", url);
                    return;
                };

                let error = match outcome {
                    Ok(record) => match record.response_text {
                        Some(body) if !body.is_empty() => {
                            deferred.resolve(body);
                            return;
                        }
                        _ => AssetError::EmptyResponse {
                            status: record.status,
                            resource: url.clone(),
                        },
                    },
                    Err(record) => AssetError::TransportFailure {
                        status: record.status,
                        status_text: record.status_text,
                        resource: url.clone(),
                    },
                };

                match policy.should_retry(started, past_retries) {
                    RetryDecision::Retry { execute_after } => {
                        let wait = execute_after
                            .duration_since(SystemTime::now())
                            .unwrap_or_default();
                        log::debug!("Fetch of {} failed ({}), retrying in {:?}", url, error, wait);
                        tokio::select! {
                            _ = token.cancelled() => return,
                            _ = tokio::time::sleep(wait) => {}
                        }
                        past_retries += 1;
                    }
                    RetryDecision::DoNotRetry => {
                        log::warn!("Fetch of {} failed: {}", url, error);
                        deferred.reject(error);
                        return;
                    }
                }
            }
        });

        future
    }
}

/// One request bridged onto a channel. `None` when `token` fired first, in
/// which case the request is aborted and its callbacks never observed.
async fn attempt(
    transport: &dyn Transport,
    url: &str,
    token: &CancellationToken,
) -> Option<Result<RequestRecord, RequestRecord>> {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let on_fail = Arc::clone(&tx);

    let options = RequestOptions::default()
        .on_success(move |record| send_once(&tx, Ok(record)))
        .on_fail(move |record| send_once(&on_fail, Err(record)));
    let handle = transport.request(url, options);

    tokio::select! {
        _ = token.cancelled() => {
            handle.abort();
            None
        }
        // A transport that drops both callbacks never answers.
        received = rx => Some(received.unwrap_or_else(|_| Err(RequestRecord::unavailable()))),
    }
}

type Reply = oneshot::Sender<Result<RequestRecord, RequestRecord>>;

fn send_once(slot: &Mutex<Option<Reply>>, outcome: Result<RequestRecord, RequestRecord>) {
    if let Some(tx) = slot.lock().expect("ajax reply lock poisoned").take() {
        let _ = tx.send(outcome);
    }
}

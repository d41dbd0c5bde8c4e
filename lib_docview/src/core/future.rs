//! # Abortable Future
//!
//! The single cancellable-future type used at every asynchronous boundary of the
//! viewer. It behaves like a settle-once cell:
//!
//! - A producer holds a [`Deferred`] and settles it exactly once with
//!   [`Deferred::resolve`] or [`Deferred::reject`]. Later settlements are ignored.
//! - Consumers hold cheap clones of an [`AbortableFuture`] and await the outcome
//!   (`fut.await` or [`AbortableFuture::wait`]). Every clone observes the same
//!   settled value.
//! - [`AbortableFuture::abort`] rejects a pending future with
//!   [`AssetError::Aborted`], cancels its [`CancellationToken`] and runs the
//!   registered abort hooks (typically "abort the transport request") exactly
//!   once. Aborting a settled future does nothing.
//!
//! Chaining with [`AbortableFuture::map`] / [`AbortableFuture::inspect_err`]
//! produces a derived future that still aborts its source, so post-processing
//! never loses the ability to cancel the underlying request.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::future::IntoFuture;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::AssetError;

/// Outcome carried by an [`AbortableFuture`].
pub type Outcome<T> = Result<T, AssetError>;

type AbortHook = Box<dyn FnOnce() + Send>;

struct Shared<T> {
    /// `None` while pending, `Some` once settled.
    slot: watch::Sender<Option<Outcome<T>>>,
    token: CancellationToken,
    hooks: Mutex<Vec<AbortHook>>,
}

impl<T> Shared<T> {
    /// Stores the outcome if nothing was stored yet. Returns whether it did.
    fn store(&self, outcome: Outcome<T>) -> bool {
        let mut outcome = Some(outcome);
        self.slot.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = outcome.take();
                true
            } else {
                false
            }
        })
    }

    /// Normal settlement: hooks only matter while the work is in flight.
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let settled = self.store(outcome);
        if settled {
            self.hooks.lock().expect("AbortableFuture lock poisoned").clear();
        }
        settled
    }

    fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

/// Producer half of an [`AbortableFuture`].
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Deferred<T> {
    /// Settles successfully. Returns `false` if the future was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.shared.settle(Ok(value))
    }

    /// Settles with an error. Returns `false` if the future was already settled.
    pub fn reject(&self, error: AssetError) -> bool {
        self.shared.settle(Err(error))
    }

    /// Settles with a ready-made outcome.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        self.shared.settle(outcome)
    }

    /// True once resolved, rejected or aborted.
    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }

    /// The cancellation token that fires when the consumer aborts.
    pub fn token(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    /// Registers work to run when the consumer aborts while the future is
    /// still pending. Runs immediately if the future was already aborted, and
    /// is dropped unused if it settles normally.
    pub fn on_abort<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = self.shared.hooks.lock().expect("AbortableFuture lock poisoned");
        if self.shared.token.is_cancelled() {
            drop(hooks);
            hook();
            return;
        }
        if self.shared.is_settled() {
            return;
        }
        hooks.push(Box::new(hook));
    }
}

/// Consumer half: an awaitable, cloneable, cancellable result handle.
pub struct AbortableFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AbortableFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for AbortableFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortableFuture")
            .field("settled", &self.is_settled())
            .field("aborted", &self.shared.token.is_cancelled())
            .finish()
    }
}

impl<T> AbortableFuture<T> {
    /// Creates a pending future and the deferred that settles it.
    pub fn pending() -> (Deferred<T>, AbortableFuture<T>) {
        let (slot, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            slot,
            token: CancellationToken::new(),
            hooks: Mutex::new(Vec::new()),
        });
        (
            Deferred {
                shared: Arc::clone(&shared),
            },
            AbortableFuture { shared },
        )
    }

    /// An already-resolved future.
    pub fn resolved(value: T) -> Self {
        let (deferred, future) = Self::pending();
        deferred.resolve(value);
        future
    }

    /// An already-rejected future.
    pub fn rejected(error: AssetError) -> Self {
        let (deferred, future) = Self::pending();
        deferred.reject(error);
        future
    }

    /// Cancels the operation. A pending future is rejected with
    /// [`AssetError::Aborted`] and its abort hooks run once; a settled future
    /// is left untouched. Safe to call any number of times.
    pub fn abort(&self) {
        let hooks: Vec<AbortHook> = {
            let mut hooks = self.shared.hooks.lock().expect("AbortableFuture lock poisoned");
            if !self.shared.store(Err(AssetError::Aborted)) {
                return;
            }
            self.shared.token.cancel();
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            hook();
        }
    }

    /// True once resolved, rejected or aborted.
    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }

    /// True if this future ended through [`AbortableFuture::abort`].
    pub fn is_aborted(&self) -> bool {
        self.shared.token.is_cancelled()
    }
}

impl<T: Clone> AbortableFuture<T> {
    /// The outcome if already settled.
    pub fn peek(&self) -> Option<Outcome<T>> {
        (*self.shared.slot.borrow()).clone()
    }

    /// Waits for settlement and returns a copy of the outcome.
    pub async fn wait(&self) -> Outcome<T> {
        let mut rx = self.shared.slot.subscribe();
        // The sender lives inside `shared`, which `self` keeps alive.
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(AssetError::Aborted))
    }
}

impl<T> AbortableFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Derives a future whose outcome is `f` applied to this one. Aborting the
    /// derived future aborts this one, and `f` is skipped once the derived
    /// future has already settled. Outside a tokio runtime the derived future
    /// rejects with [`AssetError::NoRuntime`].
    pub fn chain<U, F>(&self, f: F) -> AbortableFuture<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<U> + Send + 'static,
    {
        let (deferred, derived) = AbortableFuture::pending();
        let Ok(runtime) = Handle::try_current() else {
            log::warn!("AbortableFuture chained outside a tokio runtime");
            deferred.reject(AssetError::NoRuntime);
            return derived;
        };

        let source = self.clone();
        let upstream = self.clone();
        deferred.on_abort(move || upstream.abort());

        runtime.spawn(async move {
            let outcome = source.wait().await;
            if deferred.is_settled() {
                return;
            }
            deferred.settle(f(outcome));
        });
        derived
    }

    /// Transforms the resolved value, keeping `abort` wired to this future.
    pub fn map<U, F>(&self, f: F) -> AbortableFuture<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.chain(move |outcome| outcome.map(f))
    }

    /// Runs `f` on the resolved value and passes it through unchanged.
    pub fn inspect<F>(&self, f: F) -> AbortableFuture<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.chain(move |outcome| {
            if let Ok(value) = &outcome {
                f(value);
            }
            outcome
        })
    }

    /// Runs `f` on the rejection and passes it through unchanged.
    pub fn inspect_err<F>(&self, f: F) -> AbortableFuture<T>
    where
        F: FnOnce(&AssetError) + Send + 'static,
    {
        self.chain(move |outcome| {
            if let Err(error) = &outcome {
                f(error);
            }
            outcome
        })
    }
}

impl<T> IntoFuture for AbortableFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Outcome<T>;
    type IntoFuture = BoxFuture<'static, Outcome<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

//! # Component and Data-Provider Contracts
//!
//! Components are created from named factories and live inside a
//! [`Scope`](crate::core::scope::Scope). Instead of probing an untyped object
//! for `destroy` or `onmessage`, a component advertises optional capabilities:
//! the scope asks [`Component::as_destroyable`] before destroying and
//! [`Component::as_listener`] before dispatching a broadcast.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::core::future::AbortableFuture;

/// Content resolved by a data provider. `None` means "nothing to render",
/// which is how oversized text layers are skipped without failing.
pub type PageAsset = Option<String>;

/// Future returned by every data provider.
pub type AssetFuture = AbortableFuture<PageAsset>;

/// A unit of presentation or behavior bound to one scope.
pub trait Component: Any + Send + Sync {
    /// Teardown capability.
    fn as_destroyable(&self) -> Option<&dyn Destroyable> {
        None
    }

    /// Broadcast-listening capability.
    fn as_listener(&self) -> Option<&dyn MessageListener> {
        None
    }

    /// Asset loading capability (page views).
    fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
        None
    }

    /// Access to the concrete type, for type-specific initialization.
    fn as_any(&self) -> &dyn Any;
}

/// Components that release resources when their scope lets go of them.
pub trait Destroyable {
    /// Called exactly once by the owning scope.
    fn destroy(&self);
}

/// Components that react to scope broadcasts.
pub trait MessageListener {
    /// Names of the messages this component wants to receive.
    fn messages(&self) -> &[&'static str];

    /// Handles one broadcast message.
    fn on_message(&self, message: &str, data: &Value);
}

/// Components that display a fetched asset.
pub trait AssetLoader {
    /// Starts early work before `load`. May do nothing.
    fn preload(&self);

    /// Loads the asset. Repeated calls share one future until `unload`.
    fn load(&self) -> AbortableFuture<()>;

    /// Cancels pending work and releases or hides the content.
    fn unload(&self);
}

/// Identifies an asset to a data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A page number, expanded through the configured URL templates.
    Page(u32),
    /// A complete asset URL.
    Src(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Page(page) => write!(f, "page {page}"),
            Locator::Src(src) => f.write_str(src),
        }
    }
}

impl From<u32> for Locator {
    fn from(page: u32) -> Self {
        Locator::Page(page)
    }
}

impl From<&str> for Locator {
    fn from(src: &str) -> Self {
        Locator::Src(src.to_string())
    }
}

impl From<String> for Locator {
    fn from(src: String) -> Self {
        Locator::Src(src)
    }
}

/// A named strategy that turns a model name and locator into content.
///
/// One instance is shared by every caller in a scope, so each `get` must keep
/// its request state to itself.
pub trait DataProvider: Send + Sync {
    /// Fetches and post-processes one asset.
    fn get(&self, model_name: &str, locator: &Locator) -> AssetFuture;
}

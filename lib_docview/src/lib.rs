//! # lib_docview
//!
//! The per-viewer component framework behind the document page viewer:
//! a process-wide registry of named factories, per-viewer scopes with safe
//! broadcast messaging, data providers that fetch and sanitize page assets, and
//! a transport with an offline fallback. Every asynchronous result is an
//! [`AbortableFuture`].
//!
//! ```no_run
//! use lib_docview::{DocviewSettings, Framework, Scope};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let settings = DocviewSettings::load("docview.json5".as_ref())?;
//! let framework = Framework::bootstrap(&settings)?;
//! let scope = Scope::new(framework, settings.viewer.clone());
//! let _svg = scope.get("page-svg", 1u32).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Framework assembly from settings.
pub mod bootstrap;
/// Page views.
pub mod components;
/// Viewer and runtime configuration.
pub mod configs;
/// Registry, scope, capabilities and the cancellable future.
pub mod core;
/// Error types.
pub mod error;
/// Subscriber installation for binaries.
#[cfg(feature = "loggers")]
pub mod loggers;
/// Data providers.
pub mod providers;
/// Transport, offline cache and the ajax utility.
pub mod retrieve;
/// Helpers.
pub mod utils;

pub use crate::configs::{DocviewSettings, TransportConfig, ViewerConfig};
pub use crate::core::{
    AbortableFuture, AssetFuture, Component, DataProvider, Framework, Locator, Scope,
};
pub use crate::error::{AssetError, ConfigError, FrameworkError};

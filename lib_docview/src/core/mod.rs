//! # Core Framework Module
//!
//! This module forms the heart of the viewer: the component lifecycle and
//! messaging core that every page view and data provider plugs into.
//!
//! ## Core Components:
//!
//! - **`registry`**: The process-wide [`Framework`] holding named factories for
//!   components, data providers and utilities. Built once, shared by `Arc`.
//!
//! - **`scope`**: The per-viewer [`Scope`]. Creates and destroys components,
//!   caches one data provider per name, and broadcasts messages to listening
//!   components while tolerating destruction in the middle of a dispatch.
//!
//! - **`component`**: The capability traits components and data providers
//!   implement ([`Component`], [`Destroyable`], [`MessageListener`],
//!   [`AssetLoader`], [`DataProvider`]).
//!
//! - **`future`**: [`AbortableFuture`], the cancellable settle-once result used
//!   at every asynchronous boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Capability traits for components and data providers.
pub mod component;
/// The cancellable future shared by transport, providers and components.
pub mod future;
/// The process-wide factory registry.
pub mod registry;
/// The per-viewer container.
pub mod scope;

// --- Public API Re-exports ---
pub use component::{
    AssetFuture, AssetLoader, Component, DataProvider, Destroyable, Locator, MessageListener,
    PageAsset,
};
pub use future::{AbortableFuture, Deferred, Outcome};
pub use registry::{Framework, DATA_PROVIDER_PREFIX};
pub use scope::{ComponentId, ComponentRef, Scope};

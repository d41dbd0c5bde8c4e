//! # Data Retrieval Module
//!
//! Everything between a data provider and the network.
//!
//! ## Contained Modules:
//!
//! - **`transport`**: The [`Transport`] contract and [`HttpTransport`], which
//!   routes a request to the standard or the cross-domain [`Backend`],
//!   normalizes the outcome into a [`RequestRecord`] and falls back on the
//!   offline cache when the network is unreachable.
//! - **`backend`**: [`ReqwestBackend`], the standard backend built on
//!   `reqwest` and `reqwest-middleware`, which also reads `file:` URLs.
//! - **`offline`**: The [`OfflineCache`] stores (memory, file, disabled).
//! - **`ajax`**: The [`Ajax`] utility with the retrying, abortable `fetch`
//!   used by the page providers.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Retrying fetch on top of the transport.
pub mod ajax;
/// The `reqwest` backend.
pub mod backend;
/// Last-known-good response stores.
pub mod offline;
/// Request routing and outcome normalization.
pub mod transport;

#[cfg(test)]
pub(crate) mod fakes;

pub use ajax::{Ajax, AJAX_UTILITY};
pub use backend::{ReqwestBackend, TransportError};
pub use offline::{
    CachedEntry, DisabledOfflineCache, FileOfflineCache, MemoryOfflineCache, OfflineCache,
};
pub use transport::{
    Backend, HttpTransport, RequestHandle, RequestOptions, RequestRecord, Transport,
    TransportSetupError, AJAX_NOT_SUPPORTED, CORS_NOT_SUPPORTED, NO_RUNTIME,
};

//! # Configuration Modules
//!
//! This module aggregates the configuration layers: the per-viewer
//! configuration handed to each scope and the process-level runtime settings.

/// Per-viewer configuration consumed by data providers.
pub mod config_viewer;

/// Process-level settings and JSON5 loading.
pub mod config_sys;

pub use config_sys::{DocviewSettings, TransportConfig};
pub use config_viewer::{Templates, ViewerConfig, ASSET_REQUEST_RETRIES};

//! # Platform Facts
//!
//! The handful of environment facts the providers and page views branch on.
//! Detecting them is the embedder's job; here they are plain configuration,
//! registered as the `browser` utility.

use serde::{Deserialize, Serialize};

/// Utility name under which [`BrowserInfo`] is registered.
pub const BROWSER_UTILITY: &str = "browser";

/// Platform facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserInfo {
    /// The rendering engine that needs the text-rendering override when it
    /// lacks sub-pixel text positioning.
    pub firefox: bool,
    /// Touch-oriented platform: unloaded page content is released, not hidden.
    pub mobile: bool,
    /// Sub-pixel text positioning is available.
    pub subpx_supported: bool,
}

impl BrowserInfo {
    /// SVG pages need an explicit `text-rendering` rule on this platform.
    pub fn needs_text_rendering_override(&self) -> bool {
        self.firefox && !self.subpx_supported
    }
}

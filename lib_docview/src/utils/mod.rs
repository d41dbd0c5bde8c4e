//! # Utilities Module
//!
//! General-purpose helpers that do not belong to a more specific module.
//!
//! ## Contained Modules:
//!
//! - **`common`**: URL templating, resolution and origin checks, substring
//!   counting, and the local-file success policy used by the transport.
//! - **`browser`**: The platform facts registered as the `browser` utility.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Platform facts consumed by providers and components.
pub mod browser;
/// String and URL helpers.
pub mod common;

pub use browser::{BrowserInfo, BROWSER_UTILITY};

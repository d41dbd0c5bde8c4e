//! # Data Providers
//!
//! Strategies that turn a model name and a locator into page content, each
//! returning an abortable future.
//!
//! ## Contained Modules:
//!
//! - **`pages`**: One request for a pre-computed asset URL; empty bodies fail.
//! - **`page_svg`**: Retrying SVG fetch with markup sanitization.
//! - **`page_text`**: Retrying text-layer fetch that skips crowded pages.
//! - **`page_img`**: Retrying raster fetch resolving with the image source.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::sync::Arc;

use crate::core::component::DataProvider;
use crate::core::registry::Framework;

/// Raster page images.
pub mod page_img;
/// SVG page markup.
pub mod page_svg;
/// HTML text layers.
pub mod page_text;
/// Pre-computed asset URLs.
pub mod pages;

pub use page_img::PageImgProvider;
pub use page_svg::{process_svg, PageSvgProvider, SvgContext, MAX_DATA_URLS};
pub use page_text::{process_text, PageTextProvider, MAX_TEXT_BOXES};
pub use pages::PagesProvider;

/// Binds `page-svg`, `page-text` and `page-img` to the page-number providers.
pub fn register_page_providers(framework: &Framework) {
    framework.add_data_provider("page-svg", |scope| {
        Ok(Arc::new(PageSvgProvider::new(scope)?) as Arc<dyn DataProvider>)
    });
    framework.add_data_provider("page-text", |scope| {
        Ok(Arc::new(PageTextProvider::new(scope)?) as Arc<dyn DataProvider>)
    });
    framework.add_data_provider("page-img", |scope| {
        Ok(Arc::new(PageImgProvider::new(scope)?) as Arc<dyn DataProvider>)
    });
}

/// Binds the generic provider under `page-svg` and `page-text`, replacing the
/// page-number providers for embedders that pass full asset URLs.
pub fn register_src_providers(framework: &Framework) {
    framework.add_data_provider(["page-svg", "page-text"], |scope| {
        Ok(Arc::new(PagesProvider::new(scope)?) as Arc<dyn DataProvider>)
    });
}

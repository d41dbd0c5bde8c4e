//! # Components
//!
//! Page views that consume data providers. Only the raster page view lives
//! here; SVG and text views belong to the display layer.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::sync::Arc;

use crate::core::component::Component;
use crate::core::registry::Framework;

/// The raster page view.
pub mod page_img;

pub use page_img::{PageImg, PageSurface, ASSET_ERROR, PAGE_IMG};

/// Binds the `page-img` component.
pub fn register_components(framework: &Framework) {
    framework.add_component(PAGE_IMG, |scope| {
        Ok(Arc::new(PageImg::new(scope)?) as Arc<dyn Component>)
    });
}

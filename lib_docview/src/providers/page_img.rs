//! # Page Image Provider
//!
//! Retrieves the raster image of a page and resolves with its source URL once
//! the retrieval succeeded, so the display layer can embed it from cache.

use std::sync::Arc;

use crate::configs::ViewerConfig;
use crate::core::component::{AssetFuture, DataProvider, Locator};
use crate::core::scope::Scope;
use crate::error::FrameworkError;
use crate::retrieve::{Ajax, AJAX_UTILITY};
use crate::utils::common::{make_absolute, page_template};

/// The `page-img` provider.
pub struct PageImgProvider {
    ajax: Arc<Ajax>,
    config: Arc<ViewerConfig>,
}

impl PageImgProvider {
    /// Builds the provider for `scope`.
    pub fn new(scope: &Scope) -> Result<Self, FrameworkError> {
        Ok(Self {
            ajax: scope.get_utility::<Ajax>(AJAX_UTILITY)?,
            config: scope.get_config(),
        })
    }

    /// Absolute source URL of the page image.
    pub fn image_src(&self, locator: &Locator) -> String {
        match locator {
            Locator::Page(page) => {
                let relative = format!(
                    "{}{}{}",
                    self.config.url,
                    page_template(&self.config.template.img, *page),
                    self.config.query_string
                );
                make_absolute(self.ajax.origin(), &relative)
            }
            Locator::Src(src) => src.clone(),
        }
    }
}

impl DataProvider for PageImgProvider {
    fn get(&self, _model_name: &str, locator: &Locator) -> AssetFuture {
        let src = self.image_src(locator);
        let resolved = src.clone();
        self.ajax
            .fetch(&src, self.config.asset_request_retries)
            .map(move |_| Some(resolved))
    }
}

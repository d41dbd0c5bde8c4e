//! # Text Layer Provider
//!
//! Fetches `text-N.html` with the retrying fetch. Pages with more than
//! [`MAX_TEXT_BOXES`] text boxes resolve with nothing to render; otherwise the
//! stylesheet reference is dropped from the markup.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::configs::ViewerConfig;
use crate::core::component::{AssetFuture, DataProvider, Locator, PageAsset};
use crate::core::scope::Scope;
use crate::error::FrameworkError;
use crate::retrieve::{Ajax, AJAX_UTILITY};
use crate::utils::common::{count_in_str, page_template};

/// Above this many text boxes the page is skipped.
pub const MAX_TEXT_BOXES: usize = 256;

static STYLESHEET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link rel="stylesheet".*"#).expect("stylesheet pattern is valid")
});

/// Prepares a fetched text layer, or `None` when it has too many boxes.
pub fn process_text(text: &str) -> PageAsset {
    // Divs only appear as text boxes in the text layer.
    let boxes = count_in_str(text, "<div");
    if boxes > MAX_TEXT_BOXES {
        log::debug!("Skipping text layer with {} boxes", boxes);
        return None;
    }
    Some(STYLESHEET_REF.replace(text, "").into_owned())
}

/// The `page-text` provider.
pub struct PageTextProvider {
    ajax: Arc<Ajax>,
    config: Arc<ViewerConfig>,
}

impl PageTextProvider {
    /// Builds the provider for `scope`.
    pub fn new(scope: &Scope) -> Result<Self, FrameworkError> {
        Ok(Self {
            ajax: scope.get_utility::<Ajax>(AJAX_UTILITY)?,
            config: scope.get_config(),
        })
    }
}

impl DataProvider for PageTextProvider {
    fn get(&self, _model_name: &str, locator: &Locator) -> AssetFuture {
        let url = match locator {
            Locator::Page(page) => format!(
                "{}{}{}",
                self.config.url,
                page_template(&self.config.template.html, *page),
                self.config.query_string
            ),
            Locator::Src(src) => src.clone(),
        };
        self.ajax
            .fetch(&url, self.config.asset_request_retries)
            .map(|text| process_text(&text))
    }
}

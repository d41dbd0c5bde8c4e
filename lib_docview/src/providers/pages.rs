//! # Generic Asset Provider
//!
//! Fetches a complete asset URL with a single request. A non-empty body
//! resolves the future; an empty body or a transport failure rejects it with
//! the status and resource of the request. Aborting the future aborts the
//! request.

use std::sync::Arc;

use crate::configs::ViewerConfig;
use crate::core::component::{AssetFuture, DataProvider, Locator};
use crate::core::future::AbortableFuture;
use crate::core::scope::Scope;
use crate::error::{AssetError, FrameworkError};
use crate::retrieve::{Ajax, RequestOptions, AJAX_UTILITY};
use crate::utils::common::page_template;

/// Single-request provider for pre-computed asset URLs.
pub struct PagesProvider {
    ajax: Arc<Ajax>,
    config: Arc<ViewerConfig>,
}

impl PagesProvider {
    /// Builds the provider for `scope`.
    pub fn new(scope: &Scope) -> Result<Self, FrameworkError> {
        Ok(Self {
            ajax: scope.get_utility::<Ajax>(AJAX_UTILITY)?,
            config: scope.get_config(),
        })
    }

    /// The URL of the asset. Page numbers fall back to the template matching
    /// the model name, for callers that do not pre-compute URLs.
    fn asset_src(&self, model_name: &str, locator: &Locator) -> String {
        match locator {
            Locator::Src(src) => src.clone(),
            Locator::Page(page) => {
                let template = match model_name {
                    "page-text" => &self.config.template.html,
                    "page-img" => &self.config.template.img,
                    _ => &self.config.template.svg,
                };
                format!(
                    "{}{}{}",
                    self.config.url,
                    page_template(template, *page),
                    self.config.query_string
                )
            }
        }
    }
}

impl DataProvider for PagesProvider {
    fn get(&self, model_name: &str, locator: &Locator) -> AssetFuture {
        let src = self.asset_src(model_name, locator);
        let (deferred, future) = AbortableFuture::pending();

        let on_success = deferred.clone();
        let on_fail = deferred.clone();
        let resource = src.clone();
        let fail_resource = src.clone();
        let options = RequestOptions::default()
            .on_success(move |record| {
                let status = record.status;
                match record.response_text {
                    Some(body) if !body.is_empty() => on_success.resolve(Some(body)),
                    _ => on_success.reject(AssetError::EmptyResponse { status, resource }),
                };
            })
            .on_fail(move |record| {
                on_fail.reject(AssetError::TransportFailure {
                    status: record.status,
                    status_text: record.status_text,
                    resource: fail_resource,
                });
            });

        let handle = self.ajax.request(&src, options);
        deferred.on_abort(move || handle.abort());
        future
    }
}

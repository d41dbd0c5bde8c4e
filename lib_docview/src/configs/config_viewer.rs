//! # Viewer Configuration
//!
//! The immutable per-viewer settings a [`Scope`](crate::core::scope::Scope)
//! hands to its data providers: where the document assets live, which query
//! string to carry, how page numbers map to asset paths, and the stylesheet
//! inlined into SVG pages.

use serde::{Deserialize, Serialize};

/// Number of extra attempts for page asset requests.
pub const ASSET_REQUEST_RETRIES: u32 = 1;

/// Path templates for page assets. `{{page}}` is replaced by the page number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Templates {
    /// SVG page markup.
    pub svg: String,
    /// HTML text layer.
    pub html: String,
    /// Raster page image.
    pub img: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            svg: "page-{{page}}.svg".to_string(),
            html: "text-{{page}}.html".to_string(),
            img: "page-{{page}}.png".to_string(),
        }
    }
}

/// Per-viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    /// Base URL of the document assets. May be relative to the viewer origin.
    pub url: String,
    /// Query string appended to every asset URL, including the leading `?`.
    pub query_string: String,
    /// Asset path templates.
    pub template: Templates,
    /// Stylesheet text inlined into SVG pages.
    pub css_text: String,
    /// Extra attempts for page asset requests.
    pub asset_request_retries: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            query_string: String::new(),
            template: Templates::default(),
            css_text: String::new(),
            asset_request_retries: ASSET_REQUEST_RETRIES,
        }
    }
}

impl ViewerConfig {
    /// Shorthand for a config pointing at `url` with default templates.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_fields_with_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{ "url": "/docs/", "queryString": "?t=1", "template": { "svg": "p{{page}}.svg" } }"#,
        )
        .unwrap();
        assert_eq!(config.url, "/docs/");
        assert_eq!(config.query_string, "?t=1");
        assert_eq!(config.template.svg, "p{{page}}.svg");
        assert_eq!(config.template.html, "text-{{page}}.html");
        assert_eq!(config.asset_request_retries, ASSET_REQUEST_RETRIES);
    }
}

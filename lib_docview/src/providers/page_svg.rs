//! # SVG Page Provider
//!
//! Fetches `page-N.svg` with the retrying fetch and makes the markup
//! embeddable:
//!
//! 1. Documents with more than [`MAX_DATA_URLS`] embedded data-URI images lose
//!    the small ones (payload up to [`MAX_STRIPPED_DATA_URL_LEN`] bytes).
//! 2. Relative `href`s become absolute and carry the viewer query string.
//! 3. The external stylesheet link is replaced by the viewer stylesheet text,
//!    plus a `text-rendering` rule on platforms that need it.

use std::sync::{Arc, LazyLock};

use regex::{Captures, NoExpand, Regex};

use crate::configs::ViewerConfig;
use crate::core::component::{AssetFuture, DataProvider, Locator};
use crate::core::scope::Scope;
use crate::error::FrameworkError;
use crate::retrieve::{Ajax, AJAX_UTILITY};
use crate::utils::browser::{BrowserInfo, BROWSER_UTILITY};
use crate::utils::common::{count_in_str, make_absolute, page_template};

/// Above this many embedded images, small ones are stripped.
pub const MAX_DATA_URLS: usize = 1000;
/// Largest data-URI payload stripped from crowded documents.
pub const MAX_STRIPPED_DATA_URL_LEN: usize = 5120;

const DATA_URL_MARKER: &str = "xlink:href=\"data:image";
const TEXT_RENDERING_RULE: &str = "<style>text { text-rendering: geometricPrecision; }</style>";

static DATA_URL_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<image[\s\w\-="]*xlink:href="data:image/([^"]*)"[^>]*>"#)
        .expect("data-url pattern is valid")
});
static RELATIVE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"href="([^"#:]*)""##).expect("href pattern is valid"));
static STYLESHEET_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<xhtml:link[^>]*>").expect("link pattern is valid"));

/// What the post-processing needs to know about the viewer.
#[derive(Debug, Clone, Default)]
pub struct SvgContext {
    /// Absolute asset base URL.
    pub base_url: String,
    /// Query string appended to rewritten references.
    pub query_string: String,
    /// Stylesheet text to inline.
    pub css_text: String,
    /// Inject the `text-rendering` override.
    pub text_rendering_override: bool,
}

/// Makes fetched SVG markup embeddable.
pub fn process_svg(text: &str, context: &SvgContext) -> String {
    let mut text = text.to_string();

    if count_in_str(&text, DATA_URL_MARKER) > MAX_DATA_URLS {
        text = DATA_URL_IMAGE
            .replace_all(&text, |caps: &Captures<'_>| {
                if caps[1].len() <= MAX_STRIPPED_DATA_URL_LEN {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }

    let query = context.query_string.replace('&', "&#38;");
    text = RELATIVE_HREF
        .replace_all(&text, |caps: &Captures<'_>| {
            format!("href=\"{}{}{}\"", context.base_url, &caps[1], query)
        })
        .into_owned();

    let mut stylesheet = format!("<style>{}</style>", context.css_text);
    if context.text_rendering_override {
        stylesheet.push_str(TEXT_RENDERING_RULE);
    }
    STYLESHEET_LINK
        .replace(&text, NoExpand(&stylesheet))
        .into_owned()
}

/// The `page-svg` provider.
pub struct PageSvgProvider {
    ajax: Arc<Ajax>,
    config: Arc<ViewerConfig>,
    context: Arc<SvgContext>,
}

impl PageSvgProvider {
    /// Builds the provider for `scope`.
    pub fn new(scope: &Scope) -> Result<Self, FrameworkError> {
        let ajax = scope.get_utility::<Ajax>(AJAX_UTILITY)?;
        let browser = scope.get_utility::<BrowserInfo>(BROWSER_UTILITY)?;
        let config = scope.get_config();
        let context = SvgContext {
            base_url: make_absolute(ajax.origin(), &config.url),
            query_string: config.query_string.clone(),
            css_text: config.css_text.clone(),
            text_rendering_override: browser.needs_text_rendering_override(),
        };
        Ok(Self {
            ajax,
            config,
            context: Arc::new(context),
        })
    }

    fn page_url(&self, locator: &Locator) -> String {
        match locator {
            Locator::Page(page) => format!(
                "{}{}{}",
                self.context.base_url,
                page_template(&self.config.template.svg, *page),
                self.config.query_string
            ),
            Locator::Src(src) => src.clone(),
        }
    }
}

impl DataProvider for PageSvgProvider {
    fn get(&self, _model_name: &str, locator: &Locator) -> AssetFuture {
        let url = self.page_url(locator);
        let context = Arc::clone(&self.context);
        self.ajax
            .fetch(&url, self.config.asset_request_retries)
            .map(move |text| Some(process_svg(&text, &context)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Framework;
    use crate::error::AssetError;
    use crate::retrieve::fakes::ScriptedTransport;
    use std::time::Duration;

    fn context() -> SvgContext {
        SvgContext {
            base_url: "https://docs.test/assets/".into(),
            query_string: "?a=1&b=2".into(),
            css_text: ".p{}".into(),
            text_rendering_override: false,
        }
    }

    #[test]
    fn rewrites_relative_references() {
        let out = process_svg(
            r##"<use href="font.svg"/><a href="#frag"/><i href="data:x"/>"##,
            &context(),
        );
        assert!(out.contains(r#"href="https://docs.test/assets/font.svg?a=1&#38;b=2""#));
        assert!(out.contains(r##"href="#frag""##));
        assert!(out.contains(r#"href="data:x""#));
    }

    #[test]
    fn inlines_stylesheet_once() {
        let svg = r#"<svg><xhtml:link href="x.css"/><xhtml:link/></svg>"#;
        let mut ctx = context();
        ctx.css_text = "$0 .t{}".into();
        let out = process_svg(svg, &ctx);
        assert!(out.starts_with("<svg><style>$0 .t{}</style>"));
        assert!(out.contains("<xhtml:link/>"));

        ctx.text_rendering_override = true;
        assert!(process_svg(svg, &ctx).contains(TEXT_RENDERING_RULE));
    }

    #[test]
    fn strips_small_data_urls_only_when_crowded() {
        let small = r#"<image width="1" xlink:href="data:image/png;base64,AAAA"/>"#;
        let large = format!(
            r#"<image xlink:href="data:image/png;base64,{}"/>"#,
            "A".repeat(MAX_STRIPPED_DATA_URL_LEN + 1)
        );

        let sparse = format!("<svg>{small}</svg>");
        assert_eq!(process_svg(&sparse, &context()), sparse);

        let crowded = format!("<svg>{}{}</svg>", small.repeat(MAX_DATA_URLS), large);
        let out = process_svg(&crowded, &context());
        assert_eq!(out, format!("<svg>{large}</svg>"));
    }

    #[tokio::test]
    async fn fetches_page_with_configured_url() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::ok(""),
            ScriptedTransport::ok(r#"<svg><xhtml:link/></svg>"#),
        ]);
        let framework = Arc::new(Framework::new());
        let fake = transport.clone();
        framework.add_utility(AJAX_UTILITY, move |_| {
            Ajax::new(fake.clone())
                .with_retry_bounds(Duration::from_millis(1), Duration::from_millis(1))
        });
        framework.add_utility(BROWSER_UTILITY, |_| BrowserInfo {
            firefox: true,
            ..BrowserInfo::default()
        });
        framework.add_data_provider("page-svg", |scope| {
            Ok(Arc::new(PageSvgProvider::new(scope)?) as Arc<dyn DataProvider>)
        });
        let mut config = ViewerConfig::with_url("https://docs.test/assets/");
        config.query_string = "?t=1".into();
        let scope = Scope::new(framework, config);

        let svg = scope.get("page-svg", 2u32).await.unwrap().unwrap();
        assert_eq!(svg, format!("<svg><style></style>{TEXT_RENDERING_RULE}</svg>"));
        assert_eq!(
            transport.requested(),
            vec!["https://docs.test/assets/page-2.svg?t=1"; 2]
        );
    }

    #[tokio::test]
    async fn abort_reaches_the_request() {
        let transport = ScriptedTransport::new(vec![]);
        let framework = Arc::new(Framework::new());
        let fake = transport.clone();
        framework.add_utility(AJAX_UTILITY, move |_| Ajax::new(fake.clone()));
        framework.add_utility(BROWSER_UTILITY, |_| BrowserInfo::default());
        framework.add_data_provider("page-svg", |scope| {
            Ok(Arc::new(PageSvgProvider::new(scope)?) as Arc<dyn DataProvider>)
        });
        let scope = Scope::new(framework, ViewerConfig::with_url("https://docs.test/"));

        let future = scope.get("page-svg", 1u32);
        while transport.requested().is_empty() {
            tokio::task::yield_now().await;
        }
        future.abort();
        assert_eq!(future.await, Err(AssetError::Aborted));
        while transport.aborts() == 0 {
            tokio::task::yield_now().await;
        }
    }
}

//! # Common Helpers
//!
//! Small string and URL helpers shared by the transport and the data providers.

use url::Url;

use crate::retrieve::RequestRecord;

/// Expands `{{key}}` placeholders in `template`.
///
/// ```
/// use lib_docview::utils::common::template;
/// assert_eq!(template("page-{{page}}.svg", &[("page", "3")]), "page-3.svg");
/// ```
pub fn template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{{{key}}}}}"), value)
    })
}

/// Page-number shorthand for [`template`].
pub fn page_template(template_text: &str, page: u32) -> String {
    template(template_text, &[("page", &page.to_string())])
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn count_in_str(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Resolves `url` against `origin`. Absolute URLs pass through unchanged;
/// relative ones need an origin.
pub fn resolve_url(origin: Option<&Url>, url: &str) -> Result<Url, url::ParseError> {
    match Url::parse(url) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => match origin {
            Some(base) => base.join(url),
            None => Err(url::ParseError::RelativeUrlWithoutBase),
        },
        Err(e) => Err(e),
    }
}

/// The absolute form of `url` as text. Without an origin, or when the URL
/// cannot be resolved, the input is returned unchanged.
pub fn make_absolute(origin: Option<&Url>, url: &str) -> String {
    match resolve_url(origin, url) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => url.to_string(),
    }
}

/// True when `target` is served from another origin than `origin`
/// (scheme, host and port differ). Without an origin nothing is cross-origin,
/// and local files are read in place.
pub fn is_cross_domain(origin: Option<&Url>, target: &Url) -> bool {
    if target.scheme() == "file" {
        return false;
    }
    match origin {
        Some(origin) => origin.origin() != target.origin(),
        None => false,
    }
}

/// Local-file reads report status 0 like a network failure; a non-empty body
/// from a `file:` URL is nevertheless a success.
pub fn is_request_to_local_file_ok(url: &Url, record: &RequestRecord) -> bool {
    url.scheme() == "file"
        && record.status == 0
        && record
            .response_text
            .as_deref()
            .map(|text| !text.is_empty())
            .unwrap_or(false)
}

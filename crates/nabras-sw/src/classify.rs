//! Request classification.
//!
//! Every request maps to exactly one category; the interceptor picks its
//! caching policy from the category alone.

use http::Method;

use crate::config::WorkerConfig;
use crate::request::{Request, RequestMode};

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Only GET requests are cacheable.
    NonGet,
    /// Browser-internal scheme such as `chrome-extension:`.
    ExcludedScheme,
    /// Development origin (dev server, hot reload).
    ExcludedOrigin,
    /// No activated worker controls the page.
    NoActiveWorker,
}

/// Request category, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCategory {
    /// Not intercepted.
    Passthrough(PassthroughReason),
    /// Cross-origin font provider: stale-while-revalidate.
    Font,
    /// HTML navigation: network-first.
    Navigation,
    /// Same-origin static path: cache-first.
    StaticAsset,
    /// Anything else: cache-first with an offline placeholder.
    Other,
}

/// Classify a request under `config`.
pub fn classify(request: &Request, config: &WorkerConfig) -> RequestCategory {
    if request.method != Method::GET {
        return RequestCategory::Passthrough(PassthroughReason::NonGet);
    }

    let url = &request.url;
    if config
        .excluded_schemes
        .iter()
        .any(|scheme| scheme == url.scheme())
    {
        return RequestCategory::Passthrough(PassthroughReason::ExcludedScheme);
    }

    if let (Some(host), Some(port)) = (url.host_str(), url.port()) {
        let origin = format!("{}:{}", host, port);
        if config.excluded_origins.iter().any(|o| *o == origin) {
            return RequestCategory::Passthrough(PassthroughReason::ExcludedOrigin);
        }
    }

    if let Some(host) = url.host_str() {
        if config.font_hosts.iter().any(|font| host.contains(font.as_str())) {
            return RequestCategory::Font;
        }
    }

    if request.mode == RequestMode::Navigate || request.accepts_html() {
        return RequestCategory::Navigation;
    }

    if config.is_same_origin(url) && url.path().contains(config.static_path_marker.as_str()) {
        return RequestCategory::StaticAsset;
    }

    RequestCategory::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::ACCEPT;
    use http::HeaderValue;
    use url::Url;

    fn config() -> WorkerConfig {
        WorkerConfig::for_origin(Url::parse("https://nabras.test/").unwrap())
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_passes_through() {
        let request = get("https://nabras.test/api/comments").method(Method::POST);
        assert_eq!(
            classify(&request, &config()),
            RequestCategory::Passthrough(PassthroughReason::NonGet)
        );
    }

    #[test]
    fn test_extension_scheme_passes_through() {
        let request = get("chrome-extension://abcdef/content.js");
        assert_eq!(
            classify(&request, &config()),
            RequestCategory::Passthrough(PassthroughReason::ExcludedScheme)
        );
    }

    #[test]
    fn test_dev_origin_passes_through() {
        let request = get("http://localhost:3000/sockjs-node");
        assert_eq!(
            classify(&request, &config()),
            RequestCategory::Passthrough(PassthroughReason::ExcludedOrigin)
        );
        // Another port on localhost is not excluded.
        assert_eq!(
            classify(&get("http://localhost:8000/x"), &config()),
            RequestCategory::Other
        );
    }

    #[test]
    fn test_font_hosts() {
        assert_eq!(
            classify(&get("https://fonts.googleapis.com/css2?family=Amiri"), &config()),
            RequestCategory::Font
        );
        assert_eq!(
            classify(&get("https://fonts.gstatic.com/s/amiri/v27/x.woff2"), &config()),
            RequestCategory::Font
        );
    }

    #[test]
    fn test_font_wins_over_html_accept() {
        let request = get("https://fonts.googleapis.com/css2").header(
            ACCEPT,
            HeaderValue::from_static("text/html"),
        );
        assert_eq!(classify(&request, &config()), RequestCategory::Font);
    }

    #[test]
    fn test_navigation() {
        let request = Request::navigate(Url::parse("https://nabras.test/hadith/7").unwrap());
        assert_eq!(classify(&request, &config()), RequestCategory::Navigation);

        let html_fetch = get("https://nabras.test/partials/nav").header(
            ACCEPT,
            HeaderValue::from_static("text/html"),
        );
        assert_eq!(classify(&html_fetch, &config()), RequestCategory::Navigation);

        let bare = get("https://nabras.test/narrators").mode(RequestMode::Navigate);
        assert_eq!(classify(&bare, &config()), RequestCategory::Navigation);
    }

    #[test]
    fn test_static_asset_requires_same_origin() {
        assert_eq!(
            classify(&get("https://nabras.test/static/css/main.css"), &config()),
            RequestCategory::StaticAsset
        );
        assert_eq!(
            classify(&get("https://cdn.example.com/static/lib.js"), &config()),
            RequestCategory::Other
        );
    }

    #[test]
    fn test_everything_else() {
        assert_eq!(
            classify(&get("https://nabras.test/api/general-comments"), &config()),
            RequestCategory::Other
        );
    }
}

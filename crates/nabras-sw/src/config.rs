//! Worker configuration.
//!
//! Cache names are derived from a prefix and the version tag, so bumping
//! `version` is all a deploy needs to invalidate every cached entry on the
//! next activation.

use std::path::Path;
use std::time::Duration;

use nabras_common::{NabrasError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::request::Request;

/// Service worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the worker is registered on.
    pub origin: Url,

    /// Version tag embedded in every cache name.
    pub version: String,

    /// Prefix of the static asset cache name.
    pub static_cache_prefix: String,

    /// Prefix of the navigated pages cache name.
    pub pages_cache_prefix: String,

    /// Same-origin paths precached at install time.
    pub static_assets: Vec<String>,

    /// Document served to navigations when offline and uncached.
    pub offline_fallback: String,

    /// Font provider hosts handled with stale-while-revalidate.
    pub font_hosts: Vec<String>,

    /// URL schemes never intercepted.
    pub excluded_schemes: Vec<String>,

    /// `host:port` origins never intercepted.
    pub excluded_origins: Vec<String>,

    /// Path segment marking same-origin static assets.
    pub static_path_marker: String,

    /// Body of the synthesized offline response.
    pub offline_body: String,

    /// Activate right after install instead of waiting for old pages to close.
    pub skip_waiting: bool,

    /// Per-fetch timeout in seconds. Unset waits forever.
    pub network_timeout_secs: Option<u64>,

    /// User agent sent by the HTTP network.
    pub user_agent: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("https://nibras-hadith.onrender.com/")
                .expect("default origin is a valid URL"),
            version: "v3".to_string(),
            static_cache_prefix: "hadith-pwa".to_string(),
            pages_cache_prefix: "hadith-pages".to_string(),
            static_assets: [
                "/",
                "/index.html",
                "/static/css/main.css",
                "/static/js/main.js",
                "/static/manifest.json",
                "/static/icons/icon-192x192.png",
                "/static/icons/icon-180x180.png",
                "/static/icons/icon-512x512.png",
                "/static/icons/icon-152x152.png",
                "/static/icons/icon-72x72.png",
                "/static/icons/icon-384x384.png",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            offline_fallback: "/".to_string(),
            font_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
            ],
            excluded_schemes: vec!["chrome-extension".to_string()],
            excluded_origins: vec!["localhost:3000".to_string()],
            static_path_marker: "/static/".to_string(),
            offline_body: "Offline content unavailable".to_string(),
            skip_waiting: true,
            network_timeout_secs: None,
            user_agent: format!("nabras-sw/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl WorkerConfig {
    /// Default configuration served from another origin.
    pub fn for_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// Replace the version tag.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NabrasError::config_with_source("invalid worker config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Check the invariants the lifecycle relies on.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(NabrasError::config("version tag must not be empty"));
        }
        if self.static_cache_prefix == self.pages_cache_prefix {
            return Err(NabrasError::config(
                "static and pages caches need distinct prefixes",
            ));
        }
        if !self.offline_fallback.starts_with('/') {
            return Err(NabrasError::config(format!(
                "offline fallback must be an absolute path, got {}",
                self.offline_fallback
            )));
        }
        if let Some(asset) = self.static_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(NabrasError::config(format!(
                "static asset must be an absolute path, got {}",
                asset
            )));
        }
        Ok(())
    }

    /// Name of the static asset cache for this version.
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.static_cache_prefix, self.version)
    }

    /// Name of the page cache for this version.
    pub fn pages_cache_name(&self) -> String {
        format!("{}-{}", self.pages_cache_prefix, self.version)
    }

    /// Cache names that survive activation.
    pub fn valid_cache_names(&self) -> [String; 2] {
        [self.static_cache_name(), self.pages_cache_name()]
    }

    /// Resolve a site path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| NabrasError::config_with_source(format!("bad path {}", path), e))
    }

    /// GET requests for every precached asset, in list order.
    pub fn static_asset_requests(&self) -> Result<Vec<Request>> {
        self.static_assets
            .iter()
            .map(|path| self.resolve(path).map(Request::get))
            .collect()
    }

    /// Request for the offline fallback document.
    pub fn offline_request(&self) -> Result<Request> {
        self.resolve(&self.offline_fallback).map(Request::get)
    }

    /// Whether `url` shares the worker's origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Per-fetch timeout.
    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_names_follow_version() {
        let config = WorkerConfig::default();
        assert_eq!(config.static_cache_name(), "hadith-pwa-v3");
        assert_eq!(config.pages_cache_name(), "hadith-pages-v3");

        let next = config.with_version("v4");
        assert_eq!(
            next.valid_cache_names(),
            ["hadith-pwa-v4".to_string(), "hadith-pages-v4".to_string()]
        );
    }

    #[test]
    fn test_static_asset_requests_resolve_against_origin() {
        let config = WorkerConfig::for_origin(Url::parse("http://127.0.0.1:8000/").unwrap());
        let requests = config.static_asset_requests().unwrap();
        assert_eq!(requests.len(), config.static_assets.len());
        assert_eq!(requests[2].url.as_str(), "http://127.0.0.1:8000/static/css/main.css");
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = WorkerConfig::from_json(r#"{ "version": "v9" }"#).unwrap();
        assert_eq!(config.static_cache_name(), "hadith-pwa-v9");
        assert_eq!(config.font_hosts.len(), 2);
    }

    #[test]
    fn test_validate_rejects_empty_version() {
        let err = WorkerConfig::from_json(r#"{ "version": "  " }"#).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_validate_rejects_relative_asset() {
        let config = WorkerConfig {
            static_assets: vec!["static/app.js".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_origin() {
        let config = WorkerConfig::default();
        let own = Url::parse("https://nibras-hadith.onrender.com/hadith/3").unwrap();
        let fonts = Url::parse("https://fonts.gstatic.com/s/amiri.woff2").unwrap();
        assert!(config.is_same_origin(&own));
        assert!(!config.is_same_origin(&fonts));
    }
}

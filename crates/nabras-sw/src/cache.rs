//! Named request/response caches and the storage holding them.

use hashbrown::HashMap;
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::request::{Request, Response};
use crate::ServiceWorkerError;

/// A cached request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL (the cache key).
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers in received order, values as raw bytes.
    pub headers: Vec<(String, Vec<u8>)>,

    /// Response body.
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl CacheEntry {
    /// Snapshot a response for `request`.
    pub fn from_response(request: &Request, response: &Response) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        Self {
            url: request.cache_key(),
            method: request.method.to_string(),
            status: response.status.as_u16(),
            headers,
            body: response.body.to_vec(),
            cached_at: now_millis(),
        }
    }
}

/// A cache instance.
#[derive(Debug, Default)]
pub struct Cache {
    /// Cache name.
    pub name: String,

    /// Cached entries keyed by request URL.
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Match a request.
    pub fn match_request(&self, request: &Request) -> Option<&CacheEntry> {
        if request.method != Method::GET {
            return None;
        }
        self.entries.get(&request.cache_key())
    }

    /// Store a snapshot of `response` for `request`, replacing any previous
    /// entry. Only GET requests can be stored.
    pub fn put(&mut self, request: &Request, response: &Response) -> Result<(), ServiceWorkerError> {
        if request.method != Method::GET {
            return Err(ServiceWorkerError::CacheError(format!(
                "cannot cache {} request for {}",
                request.method, request.url
            )));
        }
        let entry = CacheEntry::from_response(request, response);
        trace!(cache = %self.name, url = %entry.url, status = entry.status, "Cache put");
        self.entries.insert(entry.url.clone(), entry);
        Ok(())
    }

    /// Store a batch. Either every pair is stored or none is.
    pub fn put_all(&mut self, pairs: &[(Request, Response)]) -> Result<(), ServiceWorkerError> {
        if let Some((request, _)) = pairs.iter().find(|(r, _)| r.method != Method::GET) {
            return Err(ServiceWorkerError::CacheError(format!(
                "cannot cache {} request for {}",
                request.method, request.url
            )));
        }
        for (request, response) in pairs {
            self.put(request, response)?;
        }
        Ok(())
    }

    /// Delete entry.
    pub fn delete(&mut self, request: &Request) -> bool {
        self.entries.remove(&request.cache_key()).is_some()
    }

    /// Get all keys (URLs).
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache storage (the `caches` global), shared by every worker version of a
/// registration.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
    /// Names in creation order; lookups across caches follow it.
    order: Vec<String>,
}

impl CacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache (creates if doesn't exist).
    pub fn open(&mut self, name: &str) -> &mut Cache {
        if !self.caches.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Get an existing cache.
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Check if cache exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a cache.
    pub fn delete(&mut self, name: &str) -> bool {
        self.order.retain(|n| n != name);
        self.caches.remove(name).is_some()
    }

    /// Get all cache names in creation order.
    pub fn keys(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Match across all caches, oldest cache first.
    pub fn match_request(&self, request: &Request) -> Option<&CacheEntry> {
        self.order
            .iter()
            .filter_map(|name| self.caches.get(name))
            .find_map(|cache| cache.match_request(request))
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use url::Url;

    fn request(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_cache_put_and_match() {
        let mut cache = Cache::new("hadith-pwa-v3");
        let req = request("https://example.com/static/css/main.css");

        cache
            .put(&req, &Response::new(StatusCode::OK, "body{}"))
            .unwrap();

        let entry = cache.match_request(&req).unwrap();
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, b"body{}");
        assert!(cache
            .match_request(&request("https://example.com/static/css/other.css"))
            .is_none());
    }

    #[test]
    fn test_cache_rejects_post() {
        let mut cache = Cache::new("v1");
        let req = request("https://example.com/api/comments").method(Method::POST);
        assert!(cache.put(&req, &Response::new(StatusCode::OK, "")).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_all_is_all_or_nothing() {
        let mut cache = Cache::new("v1");
        let pairs = vec![
            (request("https://example.com/a.js"), Response::new(StatusCode::OK, "a")),
            (
                request("https://example.com/b.js").method(Method::PUT),
                Response::new(StatusCode::OK, "b"),
            ),
        ];
        assert!(cache.put_all(&pairs).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_delete() {
        let mut cache = Cache::new("v1");
        let req = request("https://example.com/style.css");
        cache.put(&req, &Response::new(StatusCode::OK, "")).unwrap();
        assert!(cache.delete(&req));
        assert!(cache.match_request(&req).is_none());
    }

    #[test]
    fn test_cache_storage() {
        let mut storage = CacheStorage::new();

        assert!(!storage.has("hadith-pwa-v3"));

        storage.open("hadith-pwa-v3");
        storage.open("hadith-pages-v3");
        storage.open("hadith-pwa-v3");
        assert_eq!(storage.keys(), vec!["hadith-pwa-v3", "hadith-pages-v3"]);

        assert!(storage.delete("hadith-pwa-v3"));
        assert!(!storage.has("hadith-pwa-v3"));
        assert_eq!(storage.keys(), vec!["hadith-pages-v3"]);
    }

    #[test]
    fn test_storage_match_prefers_oldest_cache() {
        let mut storage = CacheStorage::new();
        let req = request("https://example.com/");
        storage
            .open("first")
            .put(&req, &Response::new(StatusCode::OK, "old"))
            .unwrap();
        storage
            .open("second")
            .put(&req, &Response::new(StatusCode::OK, "new"))
            .unwrap();

        assert_eq!(storage.match_request(&req).unwrap().body, b"old");
    }

    #[test]
    fn test_entry_round_trips_headers() {
        let req = request("https://example.com/static/manifest.json");
        let mut response = Response::new(StatusCode::OK, "{}");
        response.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/manifest+json"),
        );

        let entry = CacheEntry::from_response(&req, &response);
        let restored = Response::from_entry(&entry);
        assert_eq!(restored.header("content-type"), Some("application/manifest+json"));
        assert_eq!(restored.body, response.body);
    }

    #[test]
    fn test_entry_keeps_opaque_header_bytes() {
        let req = request("https://fonts.gstatic.com/s/amiri.woff2");
        let mut response = Response::new(StatusCode::OK, "");
        let filename = http::HeaderValue::from_bytes(b"attachment; filename=\"\xe5mir\xee.woff2\"")
            .unwrap();
        assert!(filename.to_str().is_err());
        response
            .headers
            .insert(http::header::CONTENT_DISPOSITION, filename.clone());

        let entry = CacheEntry::from_response(&req, &response);
        assert_eq!(entry.headers.len(), 1);

        let restored = Response::from_entry(&entry);
        assert_eq!(
            restored.headers.get(http::header::CONTENT_DISPOSITION),
            Some(&filename)
        );
    }
}

//! Fetch interception.
//!
//! | category    | policy                                   | store  |
//! |-------------|------------------------------------------|--------|
//! | Font        | stale-while-revalidate                   | static |
//! | Navigation  | network-first, cached page, cached root  | pages  |
//! | StaticAsset | cache-first                              | static |
//! | Other       | cache-first, offline placeholder         | none   |
//!
//! Only 2xx responses are ever stored.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::CacheStorage;
use crate::classify::{classify, PassthroughReason, RequestCategory};
use crate::config::WorkerConfig;
use crate::network::Network;
use crate::request::{Request, Response};

/// Outcome of intercepting one request.
#[derive(Debug)]
pub enum FetchDecision {
    /// The worker stays out of the way; the page goes to the network.
    Passthrough(PassthroughReason),
    /// The worker answers.
    Respond(Response),
    /// The worker took the request but has nothing to answer with. The page
    /// observes a network error.
    NoResponse,
}

impl FetchDecision {
    /// The response, if the worker produced one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchDecision::Respond(response) => Some(response),
            _ => None,
        }
    }

    /// Take the response, if the worker produced one.
    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchDecision::Respond(response) => Some(response),
            _ => None,
        }
    }
}

/// Applies the per-category caching policy.
pub struct FetchInterceptor {
    config: Arc<WorkerConfig>,
    caches: Arc<RwLock<CacheStorage>>,
    network: Arc<dyn Network>,
    /// Background refreshes started by stale-while-revalidate. Never locked
    /// across an await.
    revalidations: Mutex<JoinSet<()>>,
}

impl FetchInterceptor {
    /// Create an interceptor over shared caches.
    pub fn new(
        config: Arc<WorkerConfig>,
        caches: Arc<RwLock<CacheStorage>>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            caches,
            network,
            revalidations: Mutex::new(JoinSet::new()),
        }
    }

    /// Handle one intercepted request.
    pub async fn handle(&self, request: Request) -> FetchDecision {
        let category = classify(&request, &self.config);
        debug!(url = %request.url, ?category, "Intercepted fetch");

        match category {
            RequestCategory::Passthrough(reason) => FetchDecision::Passthrough(reason),
            RequestCategory::Font => self.stale_while_revalidate(request).await,
            RequestCategory::Navigation => self.network_first(request).await,
            RequestCategory::StaticAsset => self.cache_first(request).await,
            RequestCategory::Other => self.cache_first_or_placeholder(request).await,
        }
    }

    /// Wait for every background revalidation started so far.
    ///
    /// Font hits keep being answered from cache while this waits; their
    /// refreshes are not waited for.
    pub async fn wait_for_revalidations(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }
    }

    /// Revalidations still running.
    pub fn pending_revalidations(&self) -> usize {
        let mut tasks = self.tasks();
        reap_finished(&mut tasks);
        tasks.len()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.revalidations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn stale_while_revalidate(&self, request: Request) -> FetchDecision {
        let cache_name = self.config.static_cache_name();
        let cached = {
            let caches = self.caches.read().await;
            caches
                .get(&cache_name)
                .and_then(|cache| cache.match_request(&request))
                .map(Response::from_entry)
        };

        match cached {
            Some(response) => {
                let network = Arc::clone(&self.network);
                let caches = Arc::clone(&self.caches);
                let refresh = async move {
                    match network.fetch(&request).await {
                        Ok(fresh) if fresh.ok() => {
                            store(&caches, &cache_name, &request, &fresh).await;
                        }
                        Ok(fresh) => {
                            debug!(url = %request.url, status = %fresh.status, "Revalidation not stored");
                        }
                        Err(e) => {
                            debug!(url = %request.url, error = %e, "Revalidation failed");
                        }
                    }
                };
                {
                    let mut tasks = self.tasks();
                    reap_finished(&mut tasks);
                    tasks.spawn(refresh);
                }
                FetchDecision::Respond(response)
            }
            None => match self.network.fetch(&request).await {
                Ok(response) => {
                    if response.ok() {
                        store(&self.caches, &cache_name, &request, &response).await;
                    }
                    FetchDecision::Respond(response)
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Font unavailable offline");
                    FetchDecision::NoResponse
                }
            },
        }
    }

    async fn network_first(&self, request: Request) -> FetchDecision {
        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.ok() {
                    let cache_name = self.config.pages_cache_name();
                    store(&self.caches, &cache_name, &request, &response).await;
                }
                FetchDecision::Respond(response)
            }
            Err(e) => {
                info!(url = %request.url, error = %e, "Navigation offline, trying cache");
                let caches = self.caches.read().await;
                if let Some(entry) = caches.match_request(&request) {
                    return FetchDecision::Respond(Response::from_entry(entry));
                }

                let fallback = match self.config.offline_request() {
                    Ok(fallback) => fallback,
                    Err(e) => {
                        warn!(error = %e, "Offline fallback path is invalid");
                        return FetchDecision::NoResponse;
                    }
                };
                match caches.match_request(&fallback) {
                    Some(entry) => FetchDecision::Respond(Response::from_entry(entry)),
                    None => {
                        warn!(url = %request.url, "No cached page or offline fallback");
                        FetchDecision::NoResponse
                    }
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> FetchDecision {
        if let Some(response) = self.cached(&request).await {
            return FetchDecision::Respond(response);
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.ok() {
                    let cache_name = self.config.static_cache_name();
                    store(&self.caches, &cache_name, &request, &response).await;
                }
                FetchDecision::Respond(response)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Static asset missing offline");
                FetchDecision::NoResponse
            }
        }
    }

    async fn cache_first_or_placeholder(&self, request: Request) -> FetchDecision {
        if let Some(response) = self.cached(&request).await {
            return FetchDecision::Respond(response);
        }

        match self.network.fetch(&request).await {
            Ok(response) => FetchDecision::Respond(response),
            Err(e) => {
                debug!(url = %request.url, error = %e, "Serving offline placeholder");
                FetchDecision::Respond(Response::offline_placeholder(&self.config.offline_body))
            }
        }
    }

    async fn cached(&self, request: &Request) -> Option<Response> {
        let caches = self.caches.read().await;
        caches.match_request(request).map(Response::from_entry)
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        log_join_error(joined);
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "Revalidation task failed");
    }
}

/// Store a clone of `response`; failures only lose the cache entry.
async fn store(
    caches: &RwLock<CacheStorage>,
    cache_name: &str,
    request: &Request,
    response: &Response,
) {
    let mut caches = caches.write().await;
    if let Err(e) = caches.open(cache_name).put(request, response) {
        warn!(url = %request.url, cache = cache_name, error = %e, "Cache put failed");
    }
}

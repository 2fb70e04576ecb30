//! Worker lifecycle: registration, install, activate, client control.
//!
//! State transitions are a pure function ([`WorkerState::on`]); the async
//! handlers perform the cache work and then apply the matching event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use hashbrown::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::classify::PassthroughReason;
use crate::config::WorkerConfig;
use crate::intercept::{FetchDecision, FetchInterceptor};
use crate::network::Network;
use crate::request::{Request, Response};
use crate::ServiceWorkerError;

// ==================== Types ====================

/// Unique identifier for a service worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Created, not yet installing.
    #[default]
    Parsed,
    /// Precaching the static asset list.
    Installing,
    /// Installed but not active.
    Installed,
    /// Purging stale caches and claiming clients.
    Activating,
    /// Active and intercepting fetches.
    Activated,
    /// Install failed or replaced by a newer worker.
    Redundant,
}

/// Lifecycle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install,
    InstallComplete,
    InstallFailed,
    Activate,
    ActivateComplete,
    /// A newer worker took over.
    Replaced,
}

impl WorkerState {
    /// Next state after `event`, or an error if `event` is not valid here.
    pub fn on(self, event: LifecycleEvent) -> Result<WorkerState, ServiceWorkerError> {
        use LifecycleEvent as E;
        use WorkerState as S;

        match (self, event) {
            (S::Parsed, E::Install) => Ok(S::Installing),
            (S::Installing, E::InstallComplete) => Ok(S::Installed),
            (S::Installing, E::InstallFailed) => Ok(S::Redundant),
            (S::Installed, E::Activate) => Ok(S::Activating),
            (S::Activating, E::ActivateComplete) => Ok(S::Activated),
            (_, E::Replaced) => Ok(S::Redundant),
            (state, event) => Err(ServiceWorkerError::StateError(format!(
                "{:?} is not valid while {:?}",
                event, state
            ))),
        }
    }
}

// ==================== Service Worker ====================

/// A service worker instance.
pub struct ServiceWorker {
    /// Unique ID.
    pub id: ServiceWorkerId,

    config: Arc<WorkerConfig>,
    caches: Arc<RwLock<CacheStorage>>,
    network: Arc<dyn Network>,
    clients: Arc<RwLock<Clients>>,
    interceptor: FetchInterceptor,

    state: WorkerState,
    skip_waiting: bool,
    state_changed_at: Instant,
}

impl ServiceWorker {
    /// Create a worker over shared caches and clients.
    pub fn new(
        config: WorkerConfig,
        caches: Arc<RwLock<CacheStorage>>,
        network: Arc<dyn Network>,
        clients: Arc<RwLock<Clients>>,
    ) -> Self {
        let config = Arc::new(config);
        let interceptor =
            FetchInterceptor::new(Arc::clone(&config), Arc::clone(&caches), Arc::clone(&network));

        Self {
            id: ServiceWorkerId::new(),
            config,
            caches,
            network,
            clients,
            interceptor,
            state: WorkerState::Parsed,
            skip_waiting: false,
            state_changed_at: Instant::now(),
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Time of last state change.
    pub fn state_changed_at(&self) -> Instant {
        self.state_changed_at
    }

    /// Configuration this worker runs with.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Whether a successful install asked to skip the waiting phase.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    /// Check if active.
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Activated
    }

    fn apply(&mut self, event: LifecycleEvent) -> Result<(), ServiceWorkerError> {
        let next = self.state.on(event)?;
        debug!(worker = ?self.id, from = ?self.state, to = ?next, "State change");
        self.state = next;
        self.state_changed_at = Instant::now();
        Ok(())
    }

    /// Install: precache every static asset as one batch.
    ///
    /// On failure the worker becomes redundant and the cache holds nothing
    /// from the batch.
    pub async fn install(&mut self) -> Result<(), ServiceWorkerError> {
        self.apply(LifecycleEvent::Install)?;

        let cache_name = self.config.static_cache_name();
        info!(worker = ?self.id, cache = %cache_name, assets = self.config.static_assets.len(), "Installing");

        match self.precache(&cache_name).await {
            Ok(count) => {
                self.apply(LifecycleEvent::InstallComplete)?;
                self.skip_waiting = self.config.skip_waiting;
                info!(worker = ?self.id, cached = count, "Static assets cached");
                Ok(())
            }
            Err(e) => {
                self.apply(LifecycleEvent::InstallFailed)?;
                error!(worker = ?self.id, error = %e, "Install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self, cache_name: &str) -> Result<usize, ServiceWorkerError> {
        let requests = self.config.static_asset_requests()?;
        self.caches.write().await.open(cache_name);

        let network = &self.network;
        let fetched: Vec<(Request, Response)> =
            try_join_all(requests.into_iter().map(|request| async move {
                match network.fetch(&request).await {
                    Ok(response) if response.ok() => Ok((request, response)),
                    Ok(response) => Err(ServiceWorkerError::InstallFailed {
                        url: request.url.to_string(),
                        reason: format!("status {}", response.status),
                    }),
                    Err(e) => Err(ServiceWorkerError::InstallFailed {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }))
            .await?;

        let mut caches = self.caches.write().await;
        caches.open(cache_name).put_all(&fetched)?;
        Ok(fetched.len())
    }

    /// Activate: delete every cache outside the current version, then claim
    /// open clients. Returns the deleted cache names.
    pub async fn activate(&mut self) -> Result<Vec<String>, ServiceWorkerError> {
        self.apply(LifecycleEvent::Activate)?;

        let keep = self.config.valid_cache_names();
        let deleted = {
            let mut caches = self.caches.write().await;
            let stale: Vec<String> = caches
                .keys()
                .into_iter()
                .filter(|name| !keep.iter().any(|k| k == name))
                .map(str::to_string)
                .collect();
            for name in &stale {
                caches.delete(name);
                info!(cache = %name, "Deleted stale cache");
            }
            stale
        };

        let claimed = self.clients.write().await.claim(self.id, &self.config.origin);
        self.apply(LifecycleEvent::ActivateComplete)?;
        info!(worker = ?self.id, claimed, deleted = deleted.len(), "Activated");
        Ok(deleted)
    }

    /// Handle a fetch event. Only an activated worker intercepts.
    pub async fn handle_fetch(&self, request: Request) -> FetchDecision {
        if !self.is_active() {
            return FetchDecision::Passthrough(PassthroughReason::NoActiveWorker);
        }
        self.interceptor.handle(request).await
    }

    /// Wait for background work started by fetch handling.
    pub async fn wait_until_idle(&self) {
        self.interceptor.wait_for_revalidations().await;
    }

    fn retire(&mut self) {
        if let Ok(next) = self.state.on(LifecycleEvent::Replaced) {
            self.state = next;
            self.state_changed_at = Instant::now();
        }
    }
}

// ==================== Registration ====================

/// A service worker registration for one scope.
pub struct ServiceWorkerRegistration {
    /// Scope URL.
    pub scope: Url,

    /// Waiting worker (installed, not yet active).
    waiting: Option<ServiceWorker>,

    /// Active worker.
    active: Option<ServiceWorker>,

    caches: Arc<RwLock<CacheStorage>>,
    clients: Arc<RwLock<Clients>>,
    network: Arc<dyn Network>,
}

impl ServiceWorkerRegistration {
    /// Create a new registration with empty cache storage.
    pub fn new(scope: Url, network: Arc<dyn Network>) -> Self {
        Self::with_storage(scope, network, Arc::new(RwLock::new(CacheStorage::new())))
    }

    /// Create a registration over existing cache storage.
    pub fn with_storage(
        scope: Url,
        network: Arc<dyn Network>,
        caches: Arc<RwLock<CacheStorage>>,
    ) -> Self {
        Self {
            scope,
            waiting: None,
            active: None,
            caches,
            clients: Arc::new(RwLock::new(Clients::new())),
            network,
        }
    }

    /// Shared cache storage.
    pub fn caches(&self) -> Arc<RwLock<CacheStorage>> {
        Arc::clone(&self.caches)
    }

    /// Shared clients.
    pub fn clients(&self) -> Arc<RwLock<Clients>> {
        Arc::clone(&self.clients)
    }

    /// Get the active worker.
    pub fn active(&self) -> Option<&ServiceWorker> {
        self.active.as_ref()
    }

    /// Get the waiting worker.
    pub fn waiting(&self) -> Option<&ServiceWorker> {
        self.waiting.as_ref()
    }

    /// Install a worker for `config` and activate it if it asks to skip
    /// waiting. A failed install leaves the current active worker in place.
    pub async fn update(&mut self, config: WorkerConfig) -> Result<(), ServiceWorkerError> {
        let mut worker = ServiceWorker::new(
            config,
            Arc::clone(&self.caches),
            Arc::clone(&self.network),
            Arc::clone(&self.clients),
        );

        if let Err(e) = worker.install().await {
            warn!(scope = %self.scope, "Keeping previous worker after failed install");
            return Err(e);
        }

        if worker.skip_waiting_requested() {
            self.promote(worker).await?;
        } else if let Some(mut old) = self.waiting.replace(worker) {
            old.retire();
        }
        Ok(())
    }

    /// Activate the waiting worker, if any.
    pub async fn activate_waiting(&mut self) -> Result<(), ServiceWorkerError> {
        match self.waiting.take() {
            Some(worker) => self.promote(worker).await,
            None => Ok(()),
        }
    }

    async fn promote(&mut self, mut worker: ServiceWorker) -> Result<(), ServiceWorkerError> {
        worker.activate().await?;
        if let Some(mut old) = self.active.replace(worker) {
            old.retire();
        }
        Ok(())
    }

    /// Route a fetch to the active worker.
    pub async fn handle_fetch(&self, request: Request) -> FetchDecision {
        match &self.active {
            Some(worker) => worker.handle_fetch(request).await,
            None => FetchDecision::Passthrough(PassthroughReason::NoActiveWorker),
        }
    }

    /// Unregister: every worker becomes redundant.
    pub fn unregister(&mut self) {
        for mut worker in [self.active.take(), self.waiting.take()].into_iter().flatten() {
            worker.retire();
        }
    }
}

// ==================== Clients ====================

/// A client (open page).
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Worker controlling this client.
    pub controller: Option<ServiceWorkerId>,
}

/// Open pages known to the registration.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create new clients manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open page, uncontrolled.
    pub fn open(&mut self, url: Url) -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed));
        self.clients.insert(
            id.clone(),
            Client {
                id: id.clone(),
                url,
                controller: None,
            },
        );
        id
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Remove a client.
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Make `worker` the controller of every client on `origin`. Returns the
    /// number of clients claimed.
    pub fn claim(&mut self, worker: ServiceWorkerId, origin: &Url) -> usize {
        let mut claimed = 0;
        for client in self.clients.values_mut() {
            if client.url.origin() == origin.origin() {
                client.controller = Some(worker);
                claimed += 1;
            }
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = WorkerState::default();
        for event in [
            LifecycleEvent::Install,
            LifecycleEvent::InstallComplete,
            LifecycleEvent::Activate,
            LifecycleEvent::ActivateComplete,
        ] {
            state = state.on(event).unwrap();
        }
        assert_eq!(state, WorkerState::Activated);
    }

    #[test]
    fn test_failed_install_is_redundant() {
        let state = WorkerState::Installing
            .on(LifecycleEvent::InstallFailed)
            .unwrap();
        assert_eq!(state, WorkerState::Redundant);
        assert!(state.on(LifecycleEvent::Activate).is_err());
    }

    #[test]
    fn test_cannot_activate_before_install() {
        assert!(matches!(
            WorkerState::Parsed.on(LifecycleEvent::Activate),
            Err(ServiceWorkerError::StateError(_))
        ));
    }

    #[test]
    fn test_replaced_from_any_state() {
        assert_eq!(
            WorkerState::Activated.on(LifecycleEvent::Replaced).unwrap(),
            WorkerState::Redundant
        );
    }

    #[test]
    fn test_claim_only_same_origin() {
        let mut clients = Clients::new();
        let home = clients.open(Url::parse("https://nabras.test/").unwrap());
        let other = clients.open(Url::parse("https://elsewhere.test/").unwrap());

        let worker = ServiceWorkerId::new();
        let claimed = clients.claim(worker, &Url::parse("https://nabras.test/").unwrap());

        assert_eq!(claimed, 1);
        assert_eq!(clients.get(&home).unwrap().controller, Some(worker));
        assert_eq!(clients.get(&other).unwrap().controller, None);

        assert!(clients.remove(&home).is_some());
        assert_eq!(clients.claim(worker, &Url::parse("https://nabras.test/").unwrap()), 0);
    }
}

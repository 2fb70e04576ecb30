//! # Nabras Service Worker
//!
//! Offline caching worker for the Nabras "Forty Hadiths" site, written as a
//! host-independent state machine so every policy runs under plain tokio tests.
//!
//! ## Features
//!
//! - **Lifecycle**: install, activate and fetch handled as explicit transitions
//! - **Cache API**: versioned named stores with per-entry put/match/delete
//! - **Precache**: atomic install-time batch of the static asset list
//! - **Fetch Interception**: stale-while-revalidate for fonts, network-first for
//!   pages, cache-first for static assets, placeholder fallback for the rest
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerRegistration (scope)
//!     ├── waiting (ServiceWorker)
//!     └── active (ServiceWorker)
//!             ├── WorkerConfig (version tag, cache names, asset list)
//!             ├── FetchInterceptor ── classify() ── RequestCategory
//!             └── Network (reqwest or test double)
//!
//! CacheStorage (shared)
//!     ├── hadith-pwa-<version>    static assets + fonts
//!     └── hadith-pages-<version>  navigations
//! ```

use thiserror::Error;

pub mod cache;
pub mod classify;
pub mod config;
pub mod intercept;
pub mod lifecycle;
pub mod network;
pub mod request;

pub use cache::{Cache, CacheEntry, CacheStorage};
pub use classify::{classify, PassthroughReason, RequestCategory};
pub use config::WorkerConfig;
pub use intercept::{FetchDecision, FetchInterceptor};
pub use lifecycle::{
    Client, Clients, LifecycleEvent, ServiceWorker, ServiceWorkerId, ServiceWorkerRegistration,
    WorkerState,
};
pub use network::{HttpNetwork, Network, NetworkError};
pub use request::{Request, RequestMode, Response, ResponseSource};

/// Errors that can occur in service worker operations.
#[derive(Error, Debug)]
pub enum ServiceWorkerError {
    #[error("Install failed while caching {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("State error: {0}")]
    StateError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] NetworkError),

    #[error(transparent)]
    Common(#[from] nabras_common::NabrasError),
}

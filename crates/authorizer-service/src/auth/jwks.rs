//! Key provider backed by the issuer's key-discovery endpoint.
//!
//! The provider fetches `/.well-known/jwks.json` once and reuses the cached
//! [`KeySet`] for the life of the process. A lookup for an unknown key id
//! may trigger one refetch, at most once per cooldown window, so a key
//! rotation at the issuer is picked up without refetching on every request.
//!
//! # Concurrency
//!
//! - Cache hits take a shared lock and never wait on the network
//! - Fetches are single-flight: an async mutex serializes them, and a miss
//!   always queues on it and re-checks the cache, so lookups that arrive
//!   during a fetch share its result
//! - The cooldown applies to failed attempts too, so an unreachable issuer
//!   is not hammered under load

use crate::auth::keys::{parse_jwks, KeyLookupError, KeyProvider, KeySet, SigningKey};
use crate::observability::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

#[derive(Default)]
struct CacheState {
    /// Last successfully fetched key set.
    keys: Option<KeySet>,

    /// Completion of the last fetch attempt, successful or not.
    last_attempt: Option<Instant>,
}

/// Key provider that fetches and caches the issuer's published key set.
pub struct JwksKeyProvider {
    /// URL of the key-discovery endpoint.
    jwks_url: String,

    /// HTTP client with the bounded fetch timeout.
    http_client: reqwest::Client,

    /// Cached keys and fetch bookkeeping.
    state: RwLock<CacheState>,

    /// Serializes outbound fetches.
    fetch_lock: Mutex<()>,

    /// Minimum interval between fetch attempts after the first.
    refresh_cooldown: Duration,
}

impl JwksKeyProvider {
    /// Create a provider. No network call is made until the first lookup or
    /// [`warm_up`](Self::warm_up).
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - Issuer key-discovery endpoint
    /// * `fetch_timeout` - Upper bound for a single fetch
    /// * `refresh_cooldown` - Minimum interval between refetches on unknown key ids
    pub fn new(jwks_url: String, fetch_timeout: Duration, refresh_cooldown: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authorizer.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            state: RwLock::new(CacheState::default()),
            fetch_lock: Mutex::new(()),
            refresh_cooldown,
        }
    }

    /// Perform the initial fetch.
    ///
    /// Called at startup so an unreachable issuer fails the process instead
    /// of every request.
    ///
    /// # Errors
    ///
    /// Returns `KeyLookupError::Unavailable` if the fetch or parse fails.
    #[instrument(skip(self))]
    pub async fn warm_up(&self) -> Result<usize, KeyLookupError> {
        let _guard = self.fetch_lock.lock().await;
        let keys = self.fetch_and_store().await?;
        Ok(keys.len())
    }

    /// Get a key, fetching on first use or on an unknown key id.
    #[instrument(skip(self), fields(kid = %kid))]
    async fn lookup(&self, kid: &str) -> Result<Arc<SigningKey>, KeyLookupError> {
        if let Some(key) = self.cached(kid).await {
            tracing::debug!(target: "authorizer.jwks", "JWKS cache hit");
            return Ok(key);
        }

        // A miss waits for any in-flight fetch and then judges its result
        let _guard = self.fetch_lock.lock().await;

        {
            let state = self.state.read().await;
            if let Some(key) = state.keys.as_ref().and_then(|keys| keys.get(kid)) {
                return Ok(key);
            }
            if !self.fetch_allowed(&state) {
                return Err(miss_error(&state));
            }
        }

        tracing::info!(target: "authorizer.jwks", "Key id not cached, fetching JWKS");
        match self.fetch_and_store().await {
            Ok(keys) => keys.get(kid).ok_or_else(|| {
                tracing::warn!(target: "authorizer.jwks", "Key not found in JWKS after refresh");
                KeyLookupError::NotFound
            }),
            Err(e) => Err(e),
        }
    }

    async fn cached(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.state
            .read()
            .await
            .keys
            .as_ref()
            .and_then(|keys| keys.get(kid))
    }

    fn fetch_allowed(&self, state: &CacheState) -> bool {
        state
            .last_attempt
            .map_or(true, |at| at.elapsed() >= self.refresh_cooldown)
    }

    /// Fetch the key set and replace the cache. Caller holds `fetch_lock`.
    /// The attempt is recorded when the fetch finishes.
    async fn fetch_and_store(&self) -> Result<KeySet, KeyLookupError> {
        let started = Instant::now();
        let result = self.fetch().await;
        metrics::record_jwks_fetch(
            if result.is_ok() { "success" } else { "error" },
            started.elapsed(),
        );

        let mut state = self.state.write().await;
        state.last_attempt = Some(Instant::now());

        let keys = result?;
        tracing::info!(
            target: "authorizer.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        state.keys = Some(keys.clone());
        Ok(keys)
    }

    async fn fetch(&self) -> Result<KeySet, KeyLookupError> {
        tracing::debug!(target: "authorizer.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authorizer.jwks", error = %e, "Failed to fetch JWKS");
                KeyLookupError::Unavailable(format!("JWKS request failed: {e}"))
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "authorizer.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyLookupError::Unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "authorizer.jwks", error = %e, "Failed to read JWKS response");
            KeyLookupError::Unavailable(format!("JWKS body read failed: {e}"))
        })?;

        parse_jwks(&body).map_err(|e| {
            tracing::error!(target: "authorizer.jwks", error = %e, "Failed to parse JWKS response");
            KeyLookupError::Unavailable(e.to_string())
        })
    }
}

/// Error for a lookup that may not fetch.
///
/// With keys cached the id is simply unknown; with nothing cached the
/// previous fetch failed and the provider is unavailable.
fn miss_error(state: &CacheState) -> KeyLookupError {
    if state.keys.is_some() {
        tracing::debug!(target: "authorizer.jwks", "Key not found in JWKS cache");
        KeyLookupError::NotFound
    } else {
        KeyLookupError::Unavailable("JWKS not loaded".to_string())
    }
}

#[async_trait]
impl KeyProvider for JwksKeyProvider {
    async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyLookupError> {
        self.lookup(kid).await
    }

    async fn key_count(&self) -> usize {
        self.state
            .read()
            .await
            .keys
            .as_ref()
            .map_or(0, KeySet::len)
    }
}

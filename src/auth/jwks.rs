use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use url::Url;

use super::AuthError;

/// A kid absent from the cache only forces a refetch if the last fetch is at
/// least this old.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the gate finds the public keys tokens are signed with.
pub enum KeySource {
    /// Keys supplied directly through configuration.
    Static(JwkSet),
    /// Keys served by the issuer's JWKS endpoint.
    Remote(RemoteKeySet),
}

impl KeySource {
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        match self {
            KeySource::Static(keys) => keys
                .find(kid)
                .ok_or(AuthError::UnknownKey)
                .and_then(key_from_jwk),
            KeySource::Remote(remote) => remote.decoding_key(kid).await,
        }
    }
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// JWKS endpoint client with an in-memory, TTL-bounded cache.
pub struct RemoteKeySet {
    url: Url,
    ttl: Duration,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeySet>>,
}

impl RemoteKeySet {
    pub fn new(url: Url, ttl: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build JWKS client: {}", e)))?;

        Ok(Self {
            url,
            ttl,
            client,
            cache: RwLock::new(None),
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return key_from_jwk(jwk);
                    }
                    if cached.fetched_at.elapsed() < MIN_REFETCH_INTERVAL {
                        return Err(AuthError::UnknownKey);
                    }
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        let stale = match cache.as_ref() {
            Some(cached) => {
                cached.fetched_at.elapsed() >= MIN_REFETCH_INTERVAL
                    && (cached.fetched_at.elapsed() >= self.ttl || cached.keys.find(kid).is_none())
            }
            None => true,
        };
        if stale {
            let keys = self.fetch().await?;
            *cache = Some(CachedKeySet {
                keys,
                fetched_at: Instant::now(),
            });
        }

        match cache.as_ref().and_then(|cached| cached.keys.find(kid)) {
            Some(jwk) => key_from_jwk(jwk),
            None => Err(AuthError::UnknownKey),
        }
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        debug!("Fetching signing keys from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("JWKS fetch from {} failed: {}", self.url, e);
                AuthError::KeySetUnavailable(e.to_string())
            })?;

        let keys: JwkSet = response.json().await.map_err(|e| {
            error!("JWKS from {} is not a valid key set: {}", self.url, e);
            AuthError::KeySetUnavailable(e.to_string())
        })?;

        info!("Loaded {} signing key(s) from {}", keys.keys.len(), self.url);
        Ok(keys)
    }
}

fn key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    // A key we cannot use is as good as no key at all
    DecodingKey::from_jwk(jwk).map_err(|_| AuthError::UnknownKey)
}

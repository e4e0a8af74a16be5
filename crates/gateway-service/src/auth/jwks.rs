//! JWKS cache for the Cognito user pool signing keys.
//!
//! The key set is fetched once at startup and then replaced wholesale by a
//! background refresher. Readers take an `Arc` snapshot from an [`ArcSwap`],
//! so request handling never contends with a refresh or with other readers
//! and always sees a key set from exactly one fetch.
//!
//! # Failure policy
//!
//! - The first fetch must succeed, otherwise [`JwksCache::initialize`] errors
//!   and the process does not start serving.
//! - A failed refresh leaves the current snapshot in place.

use crate::observability::metrics::{record_jwks_refresh, set_jwks_key_count};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// A single published key as it appears in the JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Key ID, matched against the token header `kid`.
    pub kid: String,

    /// Declared algorithm. Cognito always publishes "RS256".
    #[serde(default)]
    pub alg: String,

    /// Key type. Must be "RSA" to be usable.
    #[serde(default)]
    pub kty: String,

    /// Modulus, base64url without padding.
    #[serde(default)]
    pub n: String,

    /// Public exponent, base64url without padding.
    #[serde(default)]
    pub e: String,

    /// Intended key use ("sig").
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

/// JWKS document body.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<KeyEntry>,
}

/// Ordered key entries indexed by key ID.
///
/// When a document repeats a `kid`, the later entry replaces the earlier one
/// in place, so every ID maps to exactly one entry.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    entries: Vec<KeyEntry>,
    index: HashMap<String, usize>,
}

impl KeySet {
    pub fn new(keys: Vec<KeyEntry>) -> Self {
        let mut entries: Vec<KeyEntry> = Vec::with_capacity(keys.len());
        let mut index = HashMap::with_capacity(keys.len());

        for key in keys {
            match index.get(&key.kid) {
                Some(&position) => {
                    tracing::warn!(target: "gw.auth.jwks", kid = %key.kid, "Duplicate kid in JWKS, keeping the later entry");
                    if let Some(slot) = entries.get_mut(position) {
                        *slot = key;
                    }
                }
                None => {
                    index.insert(key.kid.clone(), entries.len());
                    entries.push(key);
                }
            }
        }

        Self { entries, index }
    }

    /// Look up an entry by key ID.
    pub fn get(&self, kid: &str) -> Option<&KeyEntry> {
        self.index
            .get(kid)
            .and_then(|position| self.entries.get(*position))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key IDs in document order.
    pub fn kids(&self) -> Vec<&str> {
        self.entries.iter().map(|key| key.kid.as_str()).collect()
    }
}

/// A key set together with the time it was fetched.
#[derive(Debug, Clone)]
pub struct CachedKeySet {
    pub key_set: KeySet,
    pub fetched_at: DateTime<Utc>,
}

impl CachedKeySet {
    /// Seconds since the key set was fetched.
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_seconds().max(0)
    }
}

/// Errors from fetching the key set.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("JWKS request failed: {0}")]
    Fetch(String),

    #[error("JWKS endpoint returned HTTP {0}")]
    Status(u16),

    #[error("JWKS response could not be decoded: {0}")]
    Decode(String),

    #[error("JWKS response contains no keys")]
    EmptyKeySet,
}

/// Process-wide holder of the current key set.
pub struct JwksCache {
    jwks_url: String,
    http_client: reqwest::Client,
    current: ArcSwap<CachedKeySet>,
}

impl JwksCache {
    /// Perform the initial fetch and build the cache.
    ///
    /// Blocks until the first fetch completes or `fetch_timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the key set could not be loaded. Callers
    /// must treat this as fatal.
    #[instrument(skip_all, fields(url = %jwks_url))]
    pub async fn initialize(jwks_url: String, fetch_timeout: Duration) -> Result<Self, JwksError> {
        let http_client = build_http_client(fetch_timeout)?;

        let cached = fetch_key_set(&http_client, &jwks_url).await.map_err(|e| {
            tracing::error!(target: "gw.auth.jwks", error = %e, "Initial JWKS fetch failed");
            e
        })?;

        tracing::info!(
            target: "gw.auth.jwks",
            key_count = cached.key_set.len(),
            kids = ?cached.key_set.kids(),
            "JWKS loaded"
        );

        Ok(Self {
            jwks_url,
            http_client,
            current: ArcSwap::from_pointee(cached),
        })
    }

    /// Build a cache around an already-known key set without fetching.
    ///
    /// `refresh` still fetches from `jwks_url`, bounded by `fetch_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::Client` if the HTTP client cannot be built.
    pub fn from_key_set(
        jwks_url: String,
        key_set: KeySet,
        fetch_timeout: Duration,
    ) -> Result<Self, JwksError> {
        let http_client = build_http_client(fetch_timeout)?;

        set_jwks_key_count(key_set.len());
        Ok(Self {
            jwks_url,
            http_client,
            current: ArcSwap::from_pointee(CachedKeySet {
                key_set,
                fetched_at: Utc::now(),
            }),
        })
    }

    /// Fetch the key set again and publish it.
    ///
    /// On success the stored snapshot is replaced in a single swap. On
    /// failure the previous snapshot stays untouched and the error is
    /// returned for the caller to log.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The cache remains usable.
    #[instrument(skip_all, fields(url = %self.jwks_url))]
    pub async fn refresh(&self) -> Result<(), JwksError> {
        let cached = fetch_key_set(&self.http_client, &self.jwks_url).await?;

        tracing::info!(
            target: "gw.auth.jwks",
            key_count = cached.key_set.len(),
            kids = ?cached.key_set.kids(),
            "JWKS refreshed"
        );

        self.current.store(Arc::new(cached));
        Ok(())
    }

    /// Current key set snapshot.
    pub fn get(&self) -> Arc<CachedKeySet> {
        self.current.load_full()
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

fn build_http_client(fetch_timeout: Duration) -> Result<reqwest::Client, JwksError> {
    reqwest::Client::builder()
        .timeout(fetch_timeout)
        .build()
        .map_err(|e| JwksError::Client(e.to_string()))
}

async fn fetch_key_set(
    http_client: &reqwest::Client,
    jwks_url: &str,
) -> Result<CachedKeySet, JwksError> {
    let start = Instant::now();
    let result = fetch_key_set_inner(http_client, jwks_url).await;

    match &result {
        Ok(cached) => {
            record_jwks_refresh("success", start.elapsed());
            set_jwks_key_count(cached.key_set.len());
        }
        Err(_) => record_jwks_refresh("error", start.elapsed()),
    }

    result
}

async fn fetch_key_set_inner(
    http_client: &reqwest::Client,
    jwks_url: &str,
) -> Result<CachedKeySet, JwksError> {
    tracing::debug!(target: "gw.auth.jwks", url = %jwks_url, "Fetching JWKS");

    let response = http_client
        .get(jwks_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| JwksError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(JwksError::Status(status.as_u16()));
    }

    let body: JwksResponse = response
        .json()
        .await
        .map_err(|e| JwksError::Decode(e.to_string()))?;

    if body.keys.is_empty() {
        return Err(JwksError::EmptyKeySet);
    }

    Ok(CachedKeySet {
        key_set: KeySet::new(body.keys),
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JWKS_PATH: &str = "/us-east-1_ABC123/.well-known/jwks.json";

    fn entry(kid: &str, n: &str) -> KeyEntry {
        KeyEntry {
            kid: kid.to_string(),
            alg: "RS256".to_string(),
            kty: "RSA".to_string(),
            n: n.to_string(),
            e: "AQAB".to_string(),
            key_use: Some("sig".to_string()),
        }
    }

    async fn mock_jwks(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_key_entry_deserialization() {
        let json = r#"{
            "alg": "RS256",
            "e": "AQAB",
            "kid": "abc",
            "kty": "RSA",
            "n": "sXch",
            "use": "sig"
        }"#;

        let key: KeyEntry = serde_json::from_str(json).unwrap();

        assert_eq!(key.kid, "abc");
        assert_eq!(key.alg, "RS256");
        assert_eq!(key.kty, "RSA");
        assert_eq!(key.n, "sXch");
        assert_eq!(key.e, "AQAB");
        assert_eq!(key.key_use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_key_entry_deserialization_minimal() {
        let key: KeyEntry = serde_json::from_str(r#"{"kid": "only-kid"}"#).unwrap();

        assert_eq!(key.kid, "only-kid");
        assert!(key.alg.is_empty());
        assert!(key.kty.is_empty());
        assert!(key.key_use.is_none());
    }

    #[test]
    fn test_key_set_lookup_and_order() {
        let key_set = KeySet::new(vec![entry("a", "AA"), entry("b", "BB")]);

        assert_eq!(key_set.len(), 2);
        assert!(!key_set.is_empty());
        assert_eq!(key_set.kids(), vec!["a", "b"]);
        assert_eq!(key_set.get("b").unwrap().n, "BB");
        assert!(key_set.get("c").is_none());
    }

    #[test]
    fn test_key_set_duplicate_kid_last_wins() {
        let key_set = KeySet::new(vec![entry("a", "FIRST"), entry("b", "BB"), entry("a", "LAST")]);

        assert_eq!(key_set.len(), 2);
        assert_eq!(key_set.kids(), vec!["a", "b"]);
        assert_eq!(key_set.get("a").unwrap().n, "LAST");
    }

    #[test]
    fn test_from_key_set_serves_snapshot() {
        let cache = JwksCache::from_key_set(
            "http://localhost/jwks.json".to_string(),
            KeySet::new(vec![entry("a", "AA")]),
            Duration::from_secs(5),
        )
        .unwrap();

        let snapshot = cache.get();
        assert_eq!(snapshot.key_set.kids(), vec!["a"]);
        assert!(snapshot.age_seconds() <= 1);
        assert_eq!(cache.jwks_url(), "http://localhost/jwks.json");
    }

    #[tokio::test]
    async fn test_initialize_loads_key_set() {
        let server = mock_jwks(serde_json::json!({
            "keys": [entry("abc", "AA"), entry("def", "BB")]
        }))
        .await;

        let cache = JwksCache::initialize(
            format!("{}{JWKS_PATH}", server.uri()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(cache.get().key_set.kids(), vec!["abc", "def"]);
    }

    #[tokio::test]
    async fn test_initialize_rejects_empty_key_set() {
        let server = mock_jwks(serde_json::json!({ "keys": [] })).await;

        let result = JwksCache::initialize(
            format!("{}{JWKS_PATH}", server.uri()),
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(JwksError::EmptyKeySet)));
    }

    #[tokio::test]
    async fn test_initialize_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = JwksCache::initialize(
            format!("{}{JWKS_PATH}", server.uri()),
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(JwksError::Status(503))));
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let result = JwksCache::initialize(
            format!("{}{JWKS_PATH}", server.uri()),
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(JwksError::Decode(_))));
    }

    #[tokio::test]
    async fn test_initialize_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "keys": [entry("abc", "AA")] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let result = JwksCache::initialize(
            format!("{}{JWKS_PATH}", server.uri()),
            Duration::from_millis(200),
        )
        .await;

        assert!(matches!(result, Err(JwksError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let server = mock_jwks(serde_json::json!({ "keys": [entry("new", "NN")] })).await;

        let cache = JwksCache::from_key_set(
            format!("{}{JWKS_PATH}", server.uri()),
            KeySet::new(vec![entry("old", "OO")]),
            Duration::from_secs(5),
        )
        .unwrap();
        let before = cache.get();

        cache.refresh().await.unwrap();

        assert_eq!(cache.get().key_set.kids(), vec!["new"]);
        // Snapshots taken before the swap are unaffected
        assert_eq!(before.key_set.kids(), vec!["old"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = JwksCache::from_key_set(
            format!("{}{JWKS_PATH}", server.uri()),
            KeySet::new(vec![entry("old", "OO")]),
            Duration::from_secs(5),
        )
        .unwrap();
        let before = cache.get();

        let result = cache.refresh().await;

        assert!(matches!(result, Err(JwksError::Status(500))));
        let after = cache.get();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.key_set.get("old").unwrap().n, "OO");
    }

    #[tokio::test]
    async fn test_refresh_bounded_by_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "keys": [entry("new", "NN")] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let cache = JwksCache::from_key_set(
            format!("{}{JWKS_PATH}", server.uri()),
            KeySet::new(vec![entry("old", "OO")]),
            Duration::from_millis(200),
        )
        .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), cache.refresh())
            .await
            .expect("refresh should give up after the fetch timeout");

        assert!(matches!(result, Err(JwksError::Fetch(_))));
        assert_eq!(cache.get().key_set.kids(), vec!["old"]);
    }
}

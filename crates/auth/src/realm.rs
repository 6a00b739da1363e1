//! Issuer trust resolution.
//!
//! Trust is a two-variant strategy fixed at configuration time: a statically
//! configured issuer/key pair (no network, for local development and
//! deployments where the identity provider is unreachable), and a list of
//! trusted remote realm base URLs resolved through their discovery endpoint.
//! The static source is always consulted first, deterministically.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use tollgate_core::AuthConfig;

use crate::error::AuthError;

// ─────────────────────────────────────────────────────────────────────────────
// Trust material
// ─────────────────────────────────────────────────────────────────────────────

/// Verification key material for one issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Shared secret, verified with HS256/384/512.
    Secret(String),
    /// PEM-encoded RSA public key, verified with RS256/384/512.
    RsaPem(String),
}

impl KeyMaterial {
    /// Classify configured/fetched key text by shape: PEM armor means an RSA
    /// public key, anything else is treated as an HMAC shared secret.
    pub fn from_key_text(text: &str) -> Self {
        if text.trim_start().starts_with("-----BEGIN") {
            Self::RsaPem(text.to_string())
        } else {
            Self::Secret(text.to_string())
        }
    }
}

/// Resolved trust material for one issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmConfig {
    pub key: KeyMaterial,
    /// Session-liveness endpoint, when the realm advertises one.
    pub session_endpoint: Option<String>,
}

/// Wire shape of a realm discovery document (the issuer URL itself).
///
/// `public_key` is mandatory; any other shape is a fetch error. The
/// token-service field, when present, locates the session-check endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmDocument {
    pub public_key: String,
    #[serde(default, rename = "token-service", alias = "token_service")]
    pub token_service: Option<String>,
}

impl RealmConfig {
    fn from_document(doc: RealmDocument) -> Self {
        Self {
            key: KeyMaterial::from_key_text(&doc.public_key),
            session_endpoint: doc
                .token_service
                .map(|base| format!("{}/userinfo", base.trim_end_matches('/'))),
        }
    }
}

/// Which trust variant produced a resolution.
///
/// The validator branches on this: remote trust gets the rotation-tolerant
/// re-fetch and (when enabled) the session check; static trust gets neither,
/// because a statically trusted issuer has no reachable session service by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustKind {
    Static,
    Remote,
}

/// Trust material plus its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedTrust {
    pub config: RealmConfig,
    pub kind: TrustKind,
}

/// Configured trust source (tagged, selected once at startup).
#[derive(Debug, Clone)]
enum TrustSource {
    Static { issuer: String, config: RealmConfig },
    Remote { realms: Vec<String> },
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetcher seam
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single remote call (transport, status, or body shape).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Network seam for realm discovery and session checks.
///
/// Injected into the resolver/validator so unit tests run without a live
/// identity provider.
#[async_trait]
pub trait RealmFetcher: Send + Sync {
    /// GET the issuer URL and parse the realm document.
    async fn fetch_realm(&self, issuer_url: &str) -> Result<RealmDocument, FetchError>;

    /// GET the session endpoint with the bearer token. `Ok(true)` means the
    /// session is still active.
    async fn check_session(&self, endpoint: &str, token: &str) -> Result<bool, FetchError>;
}

/// Production fetcher backed by `reqwest`, timeout-bounded per call.
pub struct HttpRealmFetcher {
    client: reqwest::Client,
}

impl HttpRealmFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RealmFetcher for HttpRealmFetcher {
    async fn fetch_realm(&self, issuer_url: &str) -> Result<RealmDocument, FetchError> {
        let response = self.client.get(issuer_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError(format!("realm endpoint returned {status}")));
        }
        Ok(response.json::<RealmDocument>().await?)
    }

    async fn check_session(&self, endpoint: &str, token: &str) -> Result<bool, FetchError> {
        let response = self.client.get(endpoint).bearer_auth(token).send().await?;
        Ok(response.status().is_success())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves an issuer to its trust material.
///
/// Owns the only mutable shared state in the engine: the per-issuer cache of
/// successful remote lookups. The lock is never held across a network call;
/// concurrent duplicate fetches are tolerated (idempotent GETs, identical
/// content).
pub struct RealmResolver {
    sources: Vec<TrustSource>,
    fetcher: Arc<dyn RealmFetcher>,
    cache: RwLock<HashMap<String, RealmConfig>>,
}

impl RealmResolver {
    pub fn new(config: &AuthConfig, fetcher: Arc<dyn RealmFetcher>) -> Self {
        let mut sources = Vec::new();

        // Static trust first; resolution order is fixed here, not re-decided
        // per request.
        if let (Some(issuer), Some(key)) = (&config.static_issuer, &config.static_public_key) {
            sources.push(TrustSource::Static {
                issuer: issuer.clone(),
                config: RealmConfig {
                    key: KeyMaterial::from_key_text(key),
                    session_endpoint: None,
                },
            });
        }

        if !config.realms.is_empty() {
            sources.push(TrustSource::Remote {
                realms: config.realms.clone(),
            });
        }

        Self {
            sources,
            fetcher,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve trust material for `issuer`.
    ///
    /// Fails with [`AuthError::UnknownIssuer`] when no configured source
    /// covers the issuer — callers must treat that as verification failure,
    /// never as "valid but keyless".
    pub async fn resolve(&self, issuer: &str) -> Result<ResolvedTrust, AuthError> {
        for source in &self.sources {
            match source {
                TrustSource::Static {
                    issuer: static_issuer,
                    config,
                } if static_issuer == issuer => {
                    return Ok(ResolvedTrust {
                        config: config.clone(),
                        kind: TrustKind::Static,
                    });
                }
                TrustSource::Remote { realms } if realms.iter().any(|r| r == issuer) => {
                    let config = self.resolve_remote(issuer).await?;
                    return Ok(ResolvedTrust {
                        config,
                        kind: TrustKind::Remote,
                    });
                }
                _ => {}
            }
        }

        Err(AuthError::UnknownIssuer(issuer.to_string()))
    }

    /// Evict one issuer from the cache (verification failed; the realm may
    /// have rotated its key). The next resolve re-fetches.
    pub fn invalidate(&self, issuer: &str) {
        self.cache.write().unwrap().remove(issuer);
    }

    async fn resolve_remote(&self, issuer: &str) -> Result<RealmConfig, AuthError> {
        // Guard is dropped at the end of the statement, before any await.
        if let Some(cached) = self.cache.read().unwrap().get(issuer).cloned() {
            return Ok(cached);
        }

        let document = self
            .fetcher
            .fetch_realm(issuer)
            .await
            .map_err(|err| AuthError::RemoteFetch(err.to_string()))?;

        debug!(issuer, "fetched realm configuration");

        let config = RealmConfig::from_document(document);
        self.cache
            .write()
            .unwrap()
            .insert(issuer.to_string(), config.clone());

        Ok(config)
    }

    #[cfg(test)]
    fn cached_issuers(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fetcher that serves a fixed document and counts calls.
    pub(crate) struct FakeFetcher {
        pub document: RealmDocument,
        pub fetches: AtomicUsize,
        pub session_active: bool,
    }

    impl FakeFetcher {
        pub(crate) fn new(public_key: &str) -> Self {
            Self {
                document: RealmDocument {
                    public_key: public_key.to_string(),
                    token_service: None,
                },
                fetches: AtomicUsize::new(0),
                session_active: true,
            }
        }
    }

    #[async_trait]
    impl RealmFetcher for FakeFetcher {
        async fn fetch_realm(&self, _issuer_url: &str) -> Result<RealmDocument, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.clone())
        }

        async fn check_session(&self, _endpoint: &str, _token: &str) -> Result<bool, FetchError> {
            Ok(self.session_active)
        }
    }

    /// Fetcher that always fails (for static-only configurations).
    struct UnreachableFetcher;

    #[async_trait]
    impl RealmFetcher for UnreachableFetcher {
        async fn fetch_realm(&self, url: &str) -> Result<RealmDocument, FetchError> {
            Err(FetchError(format!("unreachable: {url}")))
        }

        async fn check_session(&self, _endpoint: &str, _token: &str) -> Result<bool, FetchError> {
            Err(FetchError("unreachable".to_string()))
        }
    }

    fn static_config() -> AuthConfig {
        AuthConfig {
            static_issuer: Some("my-issuer".to_string()),
            static_public_key: Some("test-pub-key-1234".to_string()),
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn static_issuer_resolves_without_network() {
        let resolver = RealmResolver::new(&static_config(), Arc::new(UnreachableFetcher));

        let resolved = resolver.resolve("my-issuer").await.unwrap();
        assert_eq!(resolved.kind, TrustKind::Static);
        assert_eq!(
            resolved.config.key,
            KeyMaterial::Secret("test-pub-key-1234".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_issuer_is_an_error_not_empty_trust() {
        let resolver = RealmResolver::new(&static_config(), Arc::new(UnreachableFetcher));

        let err = resolver.resolve("https://evil.example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownIssuer(_)));
    }

    #[tokio::test]
    async fn static_wins_over_remote_for_the_same_issuer() {
        let mut config = static_config();
        config.realms = vec!["my-issuer".to_string()];
        let fetcher = Arc::new(FakeFetcher::new("remote-key"));
        let resolver = RealmResolver::new(&config, fetcher.clone());

        let resolved = resolver.resolve("my-issuer").await.unwrap();
        assert_eq!(resolved.kind, TrustKind::Static);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_realm_is_fetched_then_cached() {
        let config = AuthConfig {
            realms: vec!["https://idp.example.com/realms/app".to_string()],
            ..AuthConfig::default()
        };
        let fetcher = Arc::new(FakeFetcher::new("remote-key"));
        let resolver = RealmResolver::new(&config, fetcher.clone());

        for _ in 0..5 {
            let resolved = resolver
                .resolve("https://idp.example.com/realms/app")
                .await
                .unwrap();
            assert_eq!(resolved.kind, TrustKind::Remote);
        }

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached_issuers(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_refetch() {
        let config = AuthConfig {
            realms: vec!["https://idp.example.com/realms/app".to_string()],
            ..AuthConfig::default()
        };
        let fetcher = Arc::new(FakeFetcher::new("remote-key"));
        let resolver = RealmResolver::new(&config, fetcher.clone());

        resolver
            .resolve("https://idp.example.com/realms/app")
            .await
            .unwrap();
        resolver.invalidate("https://idp.example.com/realms/app");
        resolver
            .resolve("https://idp.example.com/realms/app")
            .await
            .unwrap();

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failure_maps_to_remote_fetch_error() {
        let config = AuthConfig {
            realms: vec!["https://idp.example.com/realms/app".to_string()],
            ..AuthConfig::default()
        };
        let resolver = RealmResolver::new(&config, Arc::new(UnreachableFetcher));

        let err = resolver
            .resolve("https://idp.example.com/realms/app")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RemoteFetch(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_resolution_converges_on_one_config() {
        let config = AuthConfig {
            realms: vec!["https://idp.example.com/realms/app".to_string()],
            ..AuthConfig::default()
        };
        let fetcher = Arc::new(FakeFetcher::new("remote-key"));
        let resolver = Arc::new(RealmResolver::new(&config, fetcher.clone()));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    resolver
                        .resolve("https://idp.example.com/realms/app")
                        .await
                        .unwrap()
                        .config
                })
            })
            .collect();

        let mut configs = Vec::new();
        for task in tasks {
            configs.push(task.await.unwrap());
        }

        // All callers observe the same trust material, and the cache holds a
        // single entry regardless of how many duplicate fetches raced.
        assert!(configs.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(resolver.cached_issuers(), 1);

        // Once warm, further resolutions never hit the network.
        let warm = fetcher.fetches.load(Ordering::SeqCst);
        resolver
            .resolve("https://idp.example.com/realms/app")
            .await
            .unwrap();
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), warm);
    }

    #[test]
    fn realm_document_parses_keycloak_shape() {
        let doc: RealmDocument = serde_json::from_str(
            r#"{"realm":"app","public_key":"abc","token-service":"https://idp/realms/app/protocol/openid-connect"}"#,
        )
        .unwrap();
        let config = RealmConfig::from_document(doc);
        assert_eq!(
            config.session_endpoint.as_deref(),
            Some("https://idp/realms/app/protocol/openid-connect/userinfo")
        );
    }

    #[test]
    fn realm_document_requires_public_key() {
        assert!(serde_json::from_str::<RealmDocument>(r#"{"realm":"app"}"#).is_err());
    }

    #[test]
    fn pem_text_classifies_as_rsa() {
        assert!(matches!(
            KeyMaterial::from_key_text("-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----"),
            KeyMaterial::RsaPem(_)
        ));
        assert!(matches!(
            KeyMaterial::from_key_text("test-pub-key-1234"),
            KeyMaterial::Secret(_)
        ));
    }
}

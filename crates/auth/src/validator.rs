//! Token validation: structure, trust, signature, temporal claims, session.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::{debug, warn};

use tollgate_core::AuthConfig;

use crate::claims::{Identity, RawClaims};
use crate::error::AuthError;
use crate::realm::{KeyMaterial, RealmFetcher, RealmResolver, TrustKind};

/// Verifies bearer tokens and derives the caller's [`Identity`].
///
/// Validation order is fixed: structural parse, unverified issuer peek, trust
/// resolution (short-circuits — no signature check without trust material),
/// signature + temporal claims, then the optional remote session check.
pub struct JwtValidator {
    resolver: Arc<RealmResolver>,
    fetcher: Arc<dyn RealmFetcher>,
    remote_validation: bool,
    roles_claim: String,
    clock_skew: Duration,
}

impl JwtValidator {
    pub fn new(
        resolver: Arc<RealmResolver>,
        fetcher: Arc<dyn RealmFetcher>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            remote_validation: config.remote_validation,
            roles_claim: config.roles_claim.clone(),
            clock_skew: config.clock_skew,
        }
    }

    /// Validate `token` and return the identity it represents.
    ///
    /// Performs at most two idempotent network calls (realm resolution and
    /// the session check), both bounded by the fetcher's timeout.
    pub async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let issuer = unverified_issuer(token)?;

        let mut resolved = self.resolver.resolve(&issuer).await?;

        let claims = match verify_token(token, &resolved.config.key, self.clock_skew) {
            Ok(claims) => claims,
            // One cache eviction + re-fetch tolerates key rotation. Remote
            // trust only; static material cannot rotate behind our back.
            Err(AuthError::SignatureInvalid) if resolved.kind == TrustKind::Remote => {
                debug!(issuer, "signature failed against cached key, refetching realm once");
                self.resolver.invalidate(&issuer);
                resolved = self.resolver.resolve(&issuer).await?;
                verify_token(token, &resolved.config.key, self.clock_skew)?
            }
            Err(err) => return Err(err),
        };

        if self.remote_validation && resolved.kind == TrustKind::Remote {
            let endpoint = resolved
                .config
                .session_endpoint
                .clone()
                .unwrap_or_else(|| default_session_endpoint(&issuer));

            let active = self
                .fetcher
                .check_session(&endpoint, token)
                .await
                .map_err(|err| {
                    warn!(issuer, error = %err, "session check failed");
                    AuthError::RemoteSessionInactive
                })?;

            if !active {
                return Err(AuthError::RemoteSessionInactive);
            }
        }

        let roles = claims.roles(&self.roles_claim);

        Ok(Identity {
            issuer,
            roles,
            claims,
        })
    }
}

/// Pull the `iss` claim out of an unverified token.
///
/// Structural rejects happen here, before any cryptographic work: three
/// non-empty dot-separated segments, base64url payload, JSON object payload,
/// string `iss`.
fn unverified_issuer(token: &str) -> Result<String, AuthError> {
    let mut segments = token.split('.');
    let (header, payload, signature) = match (segments.next(), segments.next(), segments.next()) {
        (Some(h), Some(p), Some(s)) if segments.next().is_none() => (h, p, s),
        _ => {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated segments".to_string(),
            ));
        }
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(AuthError::MalformedToken("empty token segment".to_string()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::MalformedToken("payload is not base64url".to_string()))?;

    let payload: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|_| AuthError::MalformedToken("payload is not a JSON object".to_string()))?;

    payload
        .get("iss")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AuthError::MalformedToken("missing iss claim".to_string()))
}

/// Verify signature and temporal claims against resolved trust material.
fn verify_token(
    token: &str,
    key: &KeyMaterial,
    clock_skew: Duration,
) -> Result<RawClaims, AuthError> {
    let header =
        decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;

    // Algorithm family is pinned by the key material; a token declaring
    // anything else is rejected outright (no algorithm confusion).
    let allowed = allowed_algorithms(key);
    if !allowed.contains(&header.alg) {
        return Err(AuthError::SignatureInvalid);
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = vec![header.alg];
    validation.leeway = clock_skew.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let decoding_key = decoding_key(key)?;
    let data =
        decode::<RawClaims>(token, &decoding_key, &validation).map_err(map_jwt_error)?;
    let claims = data.claims;

    // jsonwebtoken checks exp/nbf; iat consistency is on us.
    if let Some(iat) = claims.iat {
        let now = Utc::now().timestamp();
        if iat > now + clock_skew.as_secs() as i64 {
            return Err(AuthError::Expired);
        }
    }

    Ok(claims)
}

fn allowed_algorithms(key: &KeyMaterial) -> &'static [Algorithm] {
    match key {
        KeyMaterial::Secret(_) => &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        KeyMaterial::RsaPem(_) => &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
    }
}

fn decoding_key(key: &KeyMaterial) -> Result<DecodingKey, AuthError> {
    match key {
        KeyMaterial::Secret(secret) => Ok(DecodingKey::from_secret(secret.as_bytes())),
        KeyMaterial::RsaPem(pem) => {
            DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|_| AuthError::SignatureInvalid)
        }
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => AuthError::Expired,
        ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidToken => AuthError::MalformedToken(err.to_string()),
        // Anything else is a cryptographic failure; never downgraded.
        _ => AuthError::SignatureInvalid,
    }
}

fn default_session_endpoint(issuer: &str) -> String {
    format!(
        "{}/protocol/openid-connect/userinfo",
        issuer.trim_end_matches('/')
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Validation error taxonomy.

use thiserror::Error;

/// Why a token failed validation.
///
/// Keep this focused on the per-request failure families; none of these
/// corrupt shared state and none require a restart. Callers expose at most
/// the coarse category (see [`crate::decision::TokenRejection`]), never the
/// detail strings.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Structurally invalid input, rejected before any cryptographic work.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// No trust material resolvable for the token's issuer.
    #[error("unknown issuer: {0}")]
    UnknownIssuer(String),

    /// Cryptographic verification failed. Never downgraded.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Temporal claim violation (`exp` in the past, inconsistent `iat`/`nbf`).
    #[error("token expired or not yet valid")]
    Expired,

    /// Network or parse failure while resolving realm configuration.
    #[error("realm fetch failed: {0}")]
    RemoteFetch(String),

    /// Token is structurally valid but the session was revoked server-side
    /// (or the session check itself could not complete).
    #[error("remote session inactive")]
    RemoteSessionInactive,
}

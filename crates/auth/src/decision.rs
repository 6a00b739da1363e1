//! Allow/deny outcome plus the reason.

use serde::Serialize;

use crate::error::AuthError;

/// Outcome of a single authorization check.
///
/// The host application gets the boolean plus a coarse reason category and
/// decides the externally visible status code/message itself. Decisions are
/// all-or-nothing per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Reason,
}

impl Decision {
    pub fn allow(reason: Reason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: Reason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Why a check came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The global require-token switch is off; nothing was validated.
    AuthorizationDisabled,
    /// Authenticated and all required permissions granted.
    Granted,
    /// Identity holds the super-admin role; permissions were not consulted.
    SuperAdmin,
    /// No bearer token on the request.
    MissingCredential,
    /// Token validation failed (coarse category only).
    TokenRejected(TokenRejection),
    /// Authenticated but not authorized; carries the unmet permission names
    /// for diagnostics (not necessarily exposed to the end caller).
    MissingPermissions(Vec<String>),
}

/// Coarse validation failure category, safe to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    Malformed,
    UnknownIssuer,
    SignatureInvalid,
    Expired,
    RemoteFetch,
    SessionInactive,
}

impl From<&AuthError> for TokenRejection {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::MalformedToken(_) => Self::Malformed,
            AuthError::UnknownIssuer(_) => Self::UnknownIssuer,
            AuthError::SignatureInvalid => Self::SignatureInvalid,
            AuthError::Expired => Self::Expired,
            AuthError::RemoteFetch(_) => Self::RemoteFetch,
            AuthError::RemoteSessionInactive => Self::SessionInactive,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_category_hides_detail() {
        let err = AuthError::RemoteFetch("connect timeout to 10.0.0.5:8443".to_string());
        let rejection = TokenRejection::from(&err);
        assert_eq!(rejection, TokenRejection::RemoteFetch);

        // The category serializes without the internal detail string.
        let json = serde_json::to_string(&rejection).unwrap();
        assert_eq!(json, r#""remote_fetch""#);
    }

    #[test]
    fn deny_reason_serializes_for_diagnostics() {
        let decision = Decision::deny(Reason::MissingPermissions(vec!["update-item".to_string()]));
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("missing_permissions"));
        assert!(json.contains("update-item"));
    }
}

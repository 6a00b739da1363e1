//! Token claims and the identity derived from them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use tollgate_core::Role;

/// Decoded JWT payload.
///
/// `iss` and `exp` are required on the wire; everything else is optional.
/// Application-specific claims (including the role list, whose claim name is
/// configurable) stay in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClaims {
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawClaims {
    /// Extract the role list from the named claim.
    ///
    /// An absent claim (or one that is not an array) yields an empty set,
    /// not an error; non-string entries are skipped.
    pub fn roles(&self, claim: &str) -> Vec<Role> {
        match self.extra.get(claim) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|name| Role::new(name.to_owned()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }
}

/// The authenticated principal derived from a validated token.
///
/// Per-request, created and discarded within a single validation call.
#[derive(Debug, Clone)]
pub struct Identity {
    pub issuer: String,
    pub roles: Vec<Role>,
    pub claims: RawClaims,
}

impl Identity {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.as_str() == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(json: &str) -> RawClaims {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn roles_claim_extracted() {
        let c = claims(r#"{"iss":"i","exp":1,"roles":["role_reader","role_editor"]}"#);
        let roles = c.roles("roles");
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].as_str(), "role_reader");
    }

    #[test]
    fn absent_roles_claim_is_empty_not_error() {
        let c = claims(r#"{"iss":"i","exp":1}"#);
        assert!(c.roles("roles").is_empty());
    }

    #[test]
    fn non_array_roles_claim_is_empty() {
        let c = claims(r#"{"iss":"i","exp":1,"roles":"role_reader"}"#);
        assert!(c.roles("roles").is_empty());
    }

    #[test]
    fn configurable_claim_name() {
        let c = claims(r#"{"iss":"i","exp":1,"resource_roles":["a"]}"#);
        assert!(c.roles("roles").is_empty());
        assert_eq!(c.roles("resource_roles").len(), 1);
    }

    #[test]
    fn missing_required_claims_fail_deserialization() {
        assert!(serde_json::from_str::<RawClaims>(r#"{"exp":1}"#).is_err());
        assert!(serde_json::from_str::<RawClaims>(r#"{"iss":"i"}"#).is_err());
    }

    #[test]
    fn timestamps_convert_to_chrono() {
        let c = claims(r#"{"iss":"i","exp":1700000000,"iat":1690000000}"#);
        assert!(c.expires_at().unwrap() > c.issued_at().unwrap());
    }
}

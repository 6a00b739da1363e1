//! Wire shapes for the demo host's responses.

use serde::Serialize;

use tollgate_auth::Identity;
use tollgate_core::Role;

#[derive(Debug, Serialize)]
pub struct ItemList {
    pub items: Vec<String>,
}

/// Who the caller is, as established by the gate. Both fields are empty when
/// no identity was attached (anonymous access or authorization disabled).
#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub issuer: Option<String>,
    pub roles: Vec<Role>,
}

impl From<Option<Identity>> for WhoAmI {
    fn from(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => Self {
                issuer: Some(identity.issuer),
                roles: identity.roles,
            },
            None => Self {
                issuer: None,
                roles: Vec::new(),
            },
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
    fn whoami_serializes_identity() {
        let identity = Identity {
            issuer: "my-issuer".to_string(),
            roles: vec![Role::new("role_reader")],
            claims: serde_json::from_str(r#"{"iss":"my-issuer","exp":1}"#).unwrap(),
        };

        let body = serde_json::to_value(WhoAmI::from(Some(identity))).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "issuer": "my-issuer", "roles": ["role_reader"] })
        );
    }

    #[test]
    fn whoami_serializes_anonymous() {
        let body = serde_json::to_value(WhoAmI::from(None)).unwrap();
        assert_eq!(body, serde_json::json!({ "issuer": null, "roles": [] }));
    }
}

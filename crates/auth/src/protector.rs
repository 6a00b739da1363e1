//! Per-request façade over validation and authorization.

use tracing::{info, warn};

use tollgate_core::Permission;

use crate::authorize::AuthorizationEngine;
use crate::claims::Identity;
use crate::decision::{Decision, Reason, TokenRejection};
use crate::validator::JwtValidator;

/// The entry point the host application calls once per protected operation.
///
/// Orchestrates [`JwtValidator`] and [`AuthorizationEngine`] and honors the
/// global require-token switch. Safe under arbitrary concurrent invocation.
pub struct ResourceProtector {
    validator: JwtValidator,
    engine: AuthorizationEngine,
    require_token: bool,
}

impl ResourceProtector {
    pub fn new(validator: JwtValidator, engine: AuthorizationEngine, require_token: bool) -> Self {
        Self {
            validator,
            engine,
            require_token,
        }
    }

    /// Gate one request: validate the token (if required) and authorize the
    /// required permissions.
    pub async fn check(&self, token: Option<&str>, required: &[Permission]) -> Decision {
        self.inspect(token, required).await.0
    }

    /// Like [`check`](Self::check), but also hands back the validated
    /// identity so transport layers can attach it to the request.
    pub async fn inspect(
        &self,
        token: Option<&str>,
        required: &[Permission],
    ) -> (Decision, Option<Identity>) {
        // The switch bypasses the validator entirely; nothing is parsed,
        // nothing is fetched.
        if !self.require_token {
            return (Decision::allow(Reason::AuthorizationDisabled), None);
        }

        let Some(token) = token else {
            info!("request rejected: no bearer credential");
            return (Decision::deny(Reason::MissingCredential), None);
        };

        match self.validator.validate(token).await {
            Ok(identity) => {
                let decision = self.engine.authorize(&identity, required);
                if !decision.allowed {
                    info!(
                        issuer = %identity.issuer,
                        ?required,
                        "request rejected: insufficient permissions"
                    );
                }
                (decision, Some(identity))
            }
            Err(err) => {
                warn!(error = %err, "token validation failed");
                (
                    Decision::deny(Reason::TokenRejected(TokenRejection::from(&err))),
                    None,
                )
            }
        }
    }

    /// Direct permission probe for in-application logic outside the
    /// request-gating path. Same policy, super-admin bypass included.
    pub fn check_permission(&self, identity: &Identity, permission: &Permission) -> bool {
        self.engine.has_permission(identity, permission)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

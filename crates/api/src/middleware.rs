//! Request-gating middleware.
//!
//! The engine exposes an explicit contract — (token, required permissions) →
//! decision — and the routing layer composes it per route. Handlers behind an
//! allowing gate receive the validated [`Identity`] as a request extension.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};

use tollgate_auth::{Reason, ResourceProtector};
use tollgate_core::Permission;

/// Per-route guard state: the shared protector plus the permissions this
/// route requires (empty ⇒ authentication only).
#[derive(Clone)]
pub struct AuthState {
    pub protector: Arc<ResourceProtector>,
    pub required: Arc<[Permission]>,
    pub optional: bool,
}

impl AuthState {
    pub fn new<I, S>(protector: Arc<ResourceProtector>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        let required: Vec<Permission> = required.into_iter().map(Permission::new).collect();
        Self {
            protector,
            required: required.into(),
            optional: false,
        }
    }

    /// Let requests without a credential through anonymously (no identity
    /// extension). A credential that is present must still pass validation
    /// and authorization in full.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Gate a request before its handler runs.
///
/// Compose with `axum::middleware::from_fn_with_state(state, auth_middleware)`
/// on any route or subtree.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers());

    let (decision, identity) = state.protector.inspect(token, &state.required).await;
    if !decision.allowed {
        if state.optional && matches!(decision.reason, Reason::MissingCredential) {
            return Ok(next.run(req).await);
        }
        return Err(status_for(&decision.reason));
    }

    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

/// Parse `Authorization: Bearer <token>`. Scheme matching is
/// case-insensitive (RFC 6750 §2.1).
///
/// A malformed header is indistinguishable from an absent credential; the
/// detail never reaches the caller.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, rest) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Coarse reason-to-status mapping: not authenticated ⇒ 401, authenticated
/// but not authorized ⇒ 403.
fn status_for(reason: &Reason) -> StatusCode {
    match reason {
        Reason::MissingPermissions(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::UNAUTHORIZED,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! `tollgate-auth` — bearer-token authorization decision engine.
//!
//! Given a bearer token and the permissions an action requires, this crate
//! decides whether the call may proceed: issuer trust resolution (static or
//! remote), signature and temporal-claim verification, optional remote
//! session-liveness confirmation, and role-to-permission authorization with a
//! super-admin bypass.
//!
//! The crate is transport-agnostic. HTTP framework integration lives in
//! `tollgate-api`; all network access goes through the injectable
//! [`RealmFetcher`] seam so the engine is unit-testable without a live
//! identity provider.

pub mod authorize;
pub mod claims;
pub mod decision;
pub mod error;
pub mod protector;
pub mod realm;
pub mod rolemap;
pub mod validator;

pub use authorize::AuthorizationEngine;
pub use claims::{Identity, RawClaims};
pub use decision::{Decision, Reason, TokenRejection};
pub use error::AuthError;
pub use protector::ResourceProtector;
pub use realm::{
    FetchError, HttpRealmFetcher, KeyMaterial, RealmConfig, RealmDocument, RealmFetcher,
    RealmResolver, ResolvedTrust, TrustKind,
};
pub use rolemap::RolePermissionMap;
pub use validator::JwtValidator;

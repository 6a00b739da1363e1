//! Role-to-permission authorization.

use std::sync::Arc;

use tollgate_core::{Permission, Role};

use crate::claims::Identity;
use crate::decision::{Decision, Reason};
use crate::rolemap::RolePermissionMap;

/// Pure authorization policy: identity roles against required permissions.
///
/// - No IO
/// - No panics
/// - No hidden state (identical inputs always yield identical decisions)
pub struct AuthorizationEngine {
    rolemap: Arc<RolePermissionMap>,
    super_admin: Role,
}

impl AuthorizationEngine {
    pub fn new(rolemap: Arc<RolePermissionMap>, super_admin: Role) -> Self {
        Self {
            rolemap,
            super_admin,
        }
    }

    /// Decide whether `identity` may perform an action requiring `required`.
    ///
    /// The super-admin bypass is checked first and is unconditional. An empty
    /// `required` set is an authentication-only gate and always allows.
    pub fn authorize(&self, identity: &Identity, required: &[Permission]) -> Decision {
        if identity.roles.contains(&self.super_admin) {
            return Decision::allow(Reason::SuperAdmin);
        }

        if required.is_empty() {
            return Decision::allow(Reason::Granted);
        }

        let granted = self.rolemap.effective_permissions(identity.roles.iter());
        let missing: Vec<String> = required
            .iter()
            .filter(|permission| !granted.contains(*permission))
            .map(|permission| permission.as_str().to_owned())
            .collect();

        if missing.is_empty() {
            Decision::allow(Reason::Granted)
        } else {
            Decision::deny(Reason::MissingPermissions(missing))
        }
    }

    /// Single-permission convenience for in-application branching.
    pub fn has_permission(&self, identity: &Identity, permission: &Permission) -> bool {
        self.authorize(identity, std::slice::from_ref(permission))
            .allowed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

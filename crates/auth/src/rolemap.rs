//! Role-to-permission mapping, loaded once at startup.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tollgate_core::{ConfigError, Permission, Role};

/// Immutable mapping from role name to the set of permissions it grants.
///
/// Loaded once at startup from a JSON object of string arrays
/// (`{"role_reader": ["read-item"], ...}`) and shared read-only across all
/// concurrent requests. An absent role grants nothing.
#[derive(Debug, Clone, Default)]
pub struct RolePermissionMap {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl RolePermissionMap {
    /// A map that grants nothing (deployments without a policy file).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the JSON policy document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|source| ConfigError::RolePermissionShape { source })?;

        let grants = raw
            .into_iter()
            .map(|(role, permissions)| {
                (
                    Role::new(role),
                    permissions.into_iter().map(Permission::new).collect(),
                )
            })
            .collect();

        Ok(Self { grants })
    }

    /// Load the policy file. Any failure here is a fatal configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::RolePermissionIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Permissions granted by a single role (empty for unknown roles).
    pub fn permissions_for<'a>(&'a self, role: &Role) -> impl Iterator<Item = &'a Permission> {
        self.grants.get(role).into_iter().flatten()
    }

    /// Union of the permissions granted by every listed role.
    pub fn effective_permissions<'a>(
        &'a self,
        roles: impl IntoIterator<Item = &'a Role>,
    ) -> HashSet<&'a Permission> {
        roles
            .into_iter()
            .flat_map(|role| self.permissions_for(role))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

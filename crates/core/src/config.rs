//! Process configuration for the authorization engine.
//!
//! Everything the engine needs is injected through [`AuthConfig`];
//! components never read the environment themselves.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::Role;

/// Tolerated clock skew when checking temporal claims (`exp`, `iat`, `nbf`).
///
/// Explicit by design: skew must never silently default to zero.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);

/// Upper bound for any single call to an identity provider.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Claim name carrying the role list, unless overridden.
pub const DEFAULT_ROLES_CLAIM: &str = "roles";

/// Super-admin role name, unless overridden.
pub const DEFAULT_SUPER_ADMIN_ROLE: &str = "role_super_admin";

/// Configuration error.
///
/// All of these are fatal at startup; the engine never runs with a
/// half-understood configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A boolean variable held something other than true/false/1/0.
    #[error("invalid boolean for {var}: {value:?} (expected true/false/1/0)")]
    InvalidBool { var: String, value: String },

    /// A numeric variable failed to parse.
    #[error("invalid integer for {var}: {value:?}")]
    InvalidInt { var: String, value: String },

    /// An environment variable was present but not valid unicode.
    #[error("{var} is not valid unicode")]
    NotUnicode { var: String },

    /// A static issuer was configured without its public key (or vice versa
    /// the key alone is useless, but harmless).
    #[error("TOLLGATE_STATIC_ISSUER is set but TOLLGATE_STATIC_PUBLIC_KEY is not")]
    IncompleteStaticTrust,

    /// The role-permission file could not be read.
    #[error("failed to read role-permission file {path}")]
    RolePermissionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The role-permission file is not a JSON object of string arrays.
    #[error("role-permission file is not a JSON object of string arrays")]
    RolePermissionShape {
        #[source]
        source: serde_json::Error,
    },
}

/// Engine configuration.
///
/// `static_issuer`/`static_public_key` and `realms` select the two trust
/// modes (static first, then remote); both may be active at once for
/// different issuer values.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// When false, every check is allowed and the validator is bypassed
    /// entirely (trusted internal environments).
    pub require_token: bool,
    /// Issuer validated against the static public key, without any network.
    pub static_issuer: Option<String>,
    /// Trust material for the static issuer (HMAC secret or RSA PEM).
    pub static_public_key: Option<String>,
    /// Trusted remote realm base URLs (each doubles as a discovery endpoint).
    pub realms: Vec<String>,
    /// Path to the role-permission JSON file.
    pub role_permission_file: Option<PathBuf>,
    /// Role that bypasses all permission checks.
    pub super_admin_role: Role,
    /// Confirm session liveness against the issuer per validated token.
    pub remote_validation: bool,
    /// Claim name carrying the role list.
    pub roles_claim: String,
    /// Tolerated clock skew for temporal claims.
    pub clock_skew: Duration,
    /// Timeout for realm discovery and session-check calls.
    pub http_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_token: true,
            static_issuer: None,
            static_public_key: None,
            realms: Vec::new(),
            role_permission_file: None,
            super_admin_role: Role::new(DEFAULT_SUPER_ADMIN_ROLE),
            remote_validation: false,
            roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
            clock_skew: DEFAULT_CLOCK_SKEW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl AuthConfig {
    /// Load configuration from `TOLLGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            require_token: env_bool("TOLLGATE_REQUIRE_TOKEN")?.unwrap_or(defaults.require_token),
            static_issuer: env_opt("TOLLGATE_STATIC_ISSUER")?,
            static_public_key: env_opt("TOLLGATE_STATIC_PUBLIC_KEY")?,
            realms: env_opt("TOLLGATE_REALMS")?
                .map(|raw| parse_realm_list(&raw))
                .unwrap_or_default(),
            role_permission_file: env_opt("TOLLGATE_ROLE_PERMISSION_FILE")?.map(PathBuf::from),
            super_admin_role: env_opt("TOLLGATE_SUPER_ADMIN_ROLE")?
                .map(Role::new)
                .unwrap_or(defaults.super_admin_role),
            remote_validation: env_bool("TOLLGATE_REMOTE_VALIDATION")?
                .unwrap_or(defaults.remote_validation),
            roles_claim: env_opt("TOLLGATE_ROLES_CLAIM")?.unwrap_or(defaults.roles_claim),
            clock_skew: env_secs("TOLLGATE_CLOCK_SKEW_SECS")?.unwrap_or(defaults.clock_skew),
            http_timeout: env_secs("TOLLGATE_HTTP_TIMEOUT_SECS")?.unwrap_or(defaults.http_timeout),
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks (a static issuer without key material can never
    /// verify anything and must fail loudly at startup).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.static_issuer.is_some() && self.static_public_key.is_none() {
            return Err(ConfigError::IncompleteStaticTrust);
        }
        Ok(())
    }
}

/// Strict boolean parsing.
///
/// Accepts `true`/`false` (ASCII case-insensitive) and `1`/`0`. Anything else
/// is a configuration error, never silently truthy.
pub fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        v if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        other => Err(ConfigError::InvalidBool {
            var: var.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_realm_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

fn env_opt(var: &str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
            var: var.to_string(),
        }),
    }
}

fn env_bool(var: &str) -> Result<Option<bool>, ConfigError> {
    env_opt(var)?.map(|v| parse_bool(var, &v)).transpose()
}

fn env_secs(var: &str) -> Result<Option<Duration>, ConfigError> {
    env_opt(var)?
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidInt {
                    var: var.to_string(),
                    value: v.clone(),
                })
        })
        .transpose()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_strict_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "True").unwrap());
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "False").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
    }

    #[test]
    fn parse_bool_rejects_everything_else() {
        // The upstream implementation this replaces treated any value as
        // truthy; unrecognized text must be a hard error here.
        for bad in ["yes", "no", "on", "off", "2", "", "truthy"] {
            assert!(parse_bool("X", bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn realm_list_is_trimmed_and_normalized() {
        let realms = parse_realm_list(" https://idp.example.com/realms/a/ , https://idp.example.com/realms/b ,, ");
        assert_eq!(
            realms,
            vec![
                "https://idp.example.com/realms/a".to_string(),
                "https://idp.example.com/realms/b".to_string(),
            ]
        );
    }

    #[test]
    fn static_issuer_without_key_is_rejected() {
        let config = AuthConfig {
            static_issuer: Some("my-issuer".to_string()),
            ..AuthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompleteStaticTrust)
        ));
    }

    #[test]
    fn defaults_are_safe() {
        let config = AuthConfig::default();
        assert!(config.require_token);
        assert!(!config.remote_validation);
        assert_eq!(config.roles_claim, "roles");
        assert_eq!(config.super_admin_role.as_str(), "role_super_admin");
        assert!(config.clock_skew > Duration::ZERO);
        config.validate().unwrap();
    }
}

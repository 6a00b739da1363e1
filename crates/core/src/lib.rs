//! `tollgate-core` — shared authorization primitives.
//!
//! This crate contains the pure vocabulary of the engine (roles, permissions)
//! and the process configuration surface. No IO beyond reading environment
//! variables; no HTTP, no crypto.

pub mod config;
pub mod permission;
pub mod role;

pub use config::{AuthConfig, ConfigError, DEFAULT_CLOCK_SKEW, DEFAULT_HTTP_TIMEOUT};
pub use permission::Permission;
pub use role::Role;

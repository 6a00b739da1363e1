//! HTTP integration: bearer extraction, per-route permission guards, and
//! process bootstrap for the authorization engine.

pub mod dto;
pub mod middleware;
pub mod telemetry;

pub use middleware::{AuthState, auth_middleware, extract_bearer};

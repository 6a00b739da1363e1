use std::sync::Arc;

use axum::{Extension, Json, Router, middleware::from_fn_with_state, routing::get};

use tollgate_api::{
    AuthState, auth_middleware,
    dto::{ItemList, WhoAmI},
};
use tollgate_auth::{
    AuthorizationEngine, HttpRealmFetcher, Identity, JwtValidator, RealmResolver,
    ResourceProtector, RolePermissionMap,
};
use tollgate_core::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tollgate_api::telemetry::init();

    let config = AuthConfig::from_env()?;

    let rolemap = match &config.role_permission_file {
        Some(path) => RolePermissionMap::load(path)?,
        None => {
            tracing::warn!("TOLLGATE_ROLE_PERMISSION_FILE not set; no role grants loaded");
            RolePermissionMap::empty()
        }
    };

    let fetcher = Arc::new(HttpRealmFetcher::new(config.http_timeout)?);
    let resolver = Arc::new(RealmResolver::new(&config, fetcher.clone()));
    let validator = JwtValidator::new(resolver, fetcher, &config);
    let engine = AuthorizationEngine::new(Arc::new(rolemap), config.super_admin_role.clone());
    let protector = Arc::new(ResourceProtector::new(
        validator,
        engine,
        config.require_token,
    ));

    let app = router(protector);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Demo host wiring: each route declares the permissions it requires and the
/// routing layer composes the gate.
fn router(protector: Arc<ResourceProtector>) -> Router {
    let read_items = Router::new()
        .route("/items", get(list_items))
        .layer(from_fn_with_state(
            AuthState::new(protector.clone(), ["read-item"]),
            auth_middleware,
        ));

    let whoami = Router::new()
        .route("/whoami", get(current_identity))
        .layer(from_fn_with_state(
            // Anonymous callers are let through; a presented token must
            // still validate.
            AuthState::new(protector, std::iter::empty::<&str>()).optional(),
            auth_middleware,
        ));

    Router::new().merge(read_items).merge(whoami)
}

async fn list_items() -> Json<ItemList> {
    Json(ItemList { items: Vec::new() })
}

async fn current_identity(identity: Option<Extension<Identity>>) -> Json<WhoAmI> {
    Json(WhoAmI::from(identity.map(|Extension(identity)| identity)))
}

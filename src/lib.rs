//! Stockroom API: a session-authenticated inventory management service.
//!
//! The layering is conventional: handlers parse and shape HTTP, services own
//! the business rules, entities define persistence. Authentication is an
//! opaque bearer token checked by middleware; authorization is a per-request
//! capability resolution against the caller's access level.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod mailer;
pub mod observe;
pub mod openapi;
pub mod services;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Extension, Router};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AuthRouterExt, AuthService, Capability};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::mailer::Mailer;
use crate::services::AppServices;

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        let services = AppServices::new(db.clone());
        let auth = Arc::new(AuthService::new(db.clone(), mailer, &config));
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.should_allow_permissive_cors() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect();

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if config.cors_allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

/// Builds the full application router with middleware attached. Tests call
/// this too, so everything request-scoped lives here rather than in `main`.
pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest(
            "/access-levels",
            handlers::access_levels::routes().with_capability(Capability::ManageLevels),
        )
        .nest(
            "/users",
            handlers::users::routes().with_capability(Capability::ManageAccess),
        )
        .nest("/products", handlers::products::routes())
        .nest("/movements", handlers::movements::routes())
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health));

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", api)
        .merge(openapi::swagger_ui())
        // Outermost first at runtime: request id, then tracing, then CORS.
        // The AuthService extension must wrap the auth middleware layers.
        .layer(Extension(state.auth.clone()))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(observe::configure_http_tracing())
        .layer(middleware::from_fn(observe::request_id_middleware))
        .with_state(state)
}

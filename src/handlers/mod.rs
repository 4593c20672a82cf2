//! HTTP layer: request/response DTOs and route registration.

pub mod access_levels;
pub mod auth;
pub mod common;
pub mod movements;
pub mod products;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// Landing page so a bare GET tells you what you are talking to.
pub async fn root() -> impl IntoResponse {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        docs: "/docs",
    })
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses((status = 200, description = "Service identity", body = ServiceInfo)),
    tag = "meta"
)]
pub async fn status() -> impl IntoResponse {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        docs: "/docs",
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthStatus),
        (status = 503, description = "Database is unreachable", body = HealthStatus)
    ),
    tag = "meta"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "ok",
                database: "reachable",
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "degraded",
                    database: "unreachable",
                }),
            )
        }
    }
}

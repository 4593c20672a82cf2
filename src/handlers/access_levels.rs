//! Access level endpoints. All of them require the manage-levels capability.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::PermissionSet;
use crate::entities::access_level;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response, success_response, ApiJson};
use crate::services::access_levels::{NewAccessLevel, UpdateAccessLevel};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessLevelResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

impl From<access_level::Model> for AccessLevelResponse {
    fn from(level: access_level::Model) -> Self {
        Self {
            id: level.id,
            permissions: level.permissions(),
            name: level.name,
            description: level.description,
            is_system: level.is_system,
            created_at: level.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/access-levels",
    responses((status = 200, description = "All access levels", body = [AccessLevelResponse])),
    security(("bearer_token" = [])),
    tag = "access-levels"
)]
pub async fn list_access_levels(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let levels = state.services.access_levels.list().await?;
    let body: Vec<AccessLevelResponse> = levels.into_iter().map(Into::into).collect();
    Ok(success_response(body))
}

#[utoipa::path(
    get,
    path = "/api/access-levels/{id}",
    params(("id" = Uuid, Path, description = "Access level ID")),
    responses(
        (status = 200, description = "The access level", body = AccessLevelResponse),
        (status = 404, description = "No such access level")
    ),
    security(("bearer_token" = [])),
    tag = "access-levels"
)]
pub async fn get_access_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state.services.access_levels.get(id).await?;
    Ok(success_response(AccessLevelResponse::from(level)))
}

#[utoipa::path(
    post,
    path = "/api/access-levels",
    request_body = NewAccessLevel,
    responses(
        (status = 201, description = "Access level created", body = AccessLevelResponse),
        (status = 409, description = "Name already in use")
    ),
    security(("bearer_token" = [])),
    tag = "access-levels"
)]
pub async fn create_access_level(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewAccessLevel>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state.services.access_levels.create(payload).await?;
    Ok(created_response(AccessLevelResponse::from(level)))
}

#[utoipa::path(
    put,
    path = "/api/access-levels/{id}",
    params(("id" = Uuid, Path, description = "Access level ID")),
    request_body = UpdateAccessLevel,
    responses(
        (status = 200, description = "Access level updated", body = AccessLevelResponse),
        (status = 403, description = "System levels are immutable"),
        (status = 404, description = "No such access level"),
        (status = 409, description = "Name already in use")
    ),
    security(("bearer_token" = [])),
    tag = "access-levels"
)]
pub async fn update_access_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateAccessLevel>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state.services.access_levels.update(id, payload).await?;
    Ok(success_response(AccessLevelResponse::from(level)))
}

#[utoipa::path(
    delete,
    path = "/api/access-levels/{id}",
    params(("id" = Uuid, Path, description = "Access level ID")),
    responses(
        (status = 204, description = "Access level deleted"),
        (status = 403, description = "System levels cannot be deleted"),
        (status = 404, description = "No such access level"),
        (status = 409, description = "Level is still assigned to users")
    ),
    security(("bearer_token" = [])),
    tag = "access-levels"
)]
pub async fn delete_access_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.access_levels.delete(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_access_levels).post(create_access_level))
        .route(
            "/:id",
            get(get_access_level)
                .put(update_access_level)
                .delete(delete_access_level),
        )
}

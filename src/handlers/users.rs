//! User account endpoints. All of them require the manage-access capability.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response, success_response, ApiJson};
use crate::services::users::{NewUser, UpdateUser, UserWithLevel};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub login_name: String,
    pub email: String,
    pub display_name: String,
    pub access_level_id: Uuid,
    /// "Unknown" when the referenced level has been deleted
    pub access_level_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserWithLevel> for UserResponse {
    fn from(row: UserWithLevel) -> Self {
        Self {
            id: row.user.id,
            login_name: row.user.login_name,
            email: row.user.email,
            display_name: row.user.display_name,
            access_level_id: row.user.access_level_id,
            access_level_name: row.level_name,
            created_at: row.user.created_at,
            updated_at: row.user.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = [UserResponse])),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.list().await?;
    let body: Vec<UserResponse> = users.into_iter().map(Into::into).collect();
    Ok(success_response(body))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "No such user")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(id).await?;
    Ok(success_response(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Login name or email already in use")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.create(payload).await?;
    Ok(created_response(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "No such user"),
        (status = 409, description = "Login name or email already in use")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.update(id, payload).await?;
    Ok(success_response(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Callers cannot delete their own account"),
        (status = 404, description = "No such user")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.users.delete(id, caller.user_id).await?;
    // Any sessions the deleted account still held are dead weight.
    state.auth.sessions().remove_for_user(id);
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

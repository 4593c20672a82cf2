//! Login, session and password-reset endpoints.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthOutcome, AuthRouterExt, AuthUser, PermissionSet};
use crate::errors::ServiceError;
use crate::handlers::common::{no_content_response, success_response, validate_input, ApiJson};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Login name or email address
    #[validate(length(min = 1, message = "Login is required"))]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetSubmit {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// The caller's identity as returned by login and session checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub id: Uuid,
    pub login_name: String,
    pub email: String,
    pub display_name: String,
    pub access_level_id: Uuid,
    pub access_level_name: String,
}

impl From<&AuthOutcome> for SessionUser {
    fn from(outcome: &AuthOutcome) -> Self {
        let user = &outcome.user;
        Self {
            id: user.id,
            login_name: user.login_name.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            access_level_id: user.access_level_id,
            access_level_name: outcome.level_name.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
    pub permissions: PermissionSet,
}

impl From<AuthOutcome> for SessionResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            user: SessionUser::from(&outcome),
            token: outcome.token,
            permissions: outcome.permissions,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetRequestedResponse {
    pub message: String,
}

/// Session-check result. Anonymous callers get `authenticated: false`
/// instead of an error, so the dashboard can probe without special-casing
/// a 401.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
}

impl SessionStatus {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
            permissions: None,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Invalid credentials or locked account")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let outcome = state.auth.login(&payload.login, &payload.password).await?;
    Ok(success_response(SessionResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Whether the presented token is a live session", body = SessionStatus)
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let status = match token {
        Some(token) => match state.auth.session_check(token).await {
            Ok(outcome) => SessionStatus {
                authenticated: true,
                user: Some(SessionUser::from(&outcome)),
                permissions: Some(outcome.permissions),
            },
            Err(ServiceError::Unauthorized(_)) => SessionStatus::anonymous(),
            Err(err) => return Err(err),
        },
        None => SessionStatus::anonymous(),
    };

    Ok(success_response(status))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.auth.logout(&caller.token);
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset requested", body = ResetRequestedResponse)
    ),
    tag = "auth"
)]
pub async fn password_reset_request(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state.auth.request_password_reset(&payload.email).await?;
    // Identical response whether or not the address has an account.
    Ok(success_response(ResetRequestedResponse {
        message: "If that address has an account, a reset message has been sent".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/submit",
    request_body = PasswordResetSubmit,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 401, description = "Invalid or expired reset token")
    ),
    tag = "auth"
)]
pub async fn password_reset_submit(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PasswordResetSubmit>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state
        .auth
        .submit_password_reset(&payload.token, &payload.password)
        .await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(session))
        .route("/password-reset/request", post(password_reset_request))
        .route("/password-reset/submit", post(password_reset_submit))
        .merge(Router::new().route("/logout", post(logout)).with_auth())
}

//! Stock movement endpoints: record a movement, read the history.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::stock_movement;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, ApiJson, Paginated};
use crate::handlers::products::ProductResponse;
use crate::services::movements::{MovementQuery, NewMovement};
use crate::AppState;

/// A recorded movement plus the product state it left behind, so clients can
/// refresh their stock display without a second request.
#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub movement: stock_movement::Model,
    pub product: ProductResponse,
}

#[utoipa::path(
    post,
    path = "/api/movements",
    request_body = NewMovement,
    responses(
        (status = 201, description = "Movement recorded", body = MovementResponse),
        (status = 404, description = "No such product"),
        (status = 409, description = "Stock contention persisted past the retry budget"),
        (status = 422, description = "Exit exceeds the quantity on hand")
    ),
    security(("bearer_token" = [])),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<NewMovement>,
) -> Result<impl IntoResponse, ServiceError> {
    let recorded = state
        .services
        .movements
        .record(&caller.display_name, payload)
        .await?;
    Ok(created_response(MovementResponse {
        movement: recorded.movement,
        product: ProductResponse::from(recorded.product),
    }))
}

#[utoipa::path(
    get,
    path = "/api/movements",
    params(
        ("product_id" = Option<Uuid>, Query, description = "Only movements for this product"),
        ("kind" = Option<String>, Query, description = "Only entries or only exits"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u64>, Query, description = "Page size, at most 200")
    ),
    responses((status = 200, description = "Movement history, newest first", body = Paginated<stock_movement::Model>)),
    security(("bearer_token" = [])),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page;
    let per_page = query.per_page;
    let (movements, total) = state.services.movements.list(query).await?;
    Ok(success_response(Paginated::new(
        movements, total, page, per_page,
    )))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(record_movement).get(list_movements))
        .with_auth()
}

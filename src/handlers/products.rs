//! Product catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::Router;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthRouterExt, Capability};
use crate::entities::product;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, no_content_response, success_response, ApiJson, Paginated,
};
use crate::services::products::{NewProduct, ProductQuery, UpdateProduct};
use crate::AppState;

/// A product with the derived restock flag the dashboard shows.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: product::Model,
    pub below_minimum: bool,
}

impl From<product::Model> for ProductResponse {
    fn from(product: product::Model) -> Self {
        Self {
            below_minimum: product.is_below_minimum(),
            product,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("search" = Option<String>, Query, description = "Substring match on product name"),
        ("below_minimum" = Option<bool>, Query, description = "Only products needing restock"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u64>, Query, description = "Page size, at most 200")
    ),
    responses((status = 200, description = "Matching products", body = Paginated<ProductResponse>)),
    security(("bearer_token" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page;
    let per_page = query.per_page;
    let (products, total) = state.services.products.list(query).await?;
    let items: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(success_response(Paginated::new(items, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "No such product")
    ),
    security(("bearer_token" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get(id).await?;
    Ok(success_response(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product registered", body = ProductResponse),
        (status = 400, description = "Invalid product data")
    ),
    security(("bearer_token" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewProduct>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.create(payload).await?;
    Ok(created_response(ProductResponse::from(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "No such product")
    ),
    security(("bearer_token" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateProduct>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.update(id, payload).await?;
    Ok(success_response(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted; its movement history is retained"),
        (status = 404, description = "No such product")
    ),
    security(("bearer_token" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    // Deletion is the one catalog operation behind a capability; everything
    // else only needs a session.
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product))
        .with_auth()
        .merge(
            Router::new()
                .route("/:id", delete(delete_product))
                .with_capability(Capability::DeleteProducts),
        )
}

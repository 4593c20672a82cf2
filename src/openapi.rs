//! OpenAPI document and the Swagger UI mount.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::status,
        handlers::health,
        handlers::auth::login,
        handlers::auth::session,
        handlers::auth::logout,
        handlers::auth::password_reset_request,
        handlers::auth::password_reset_submit,
        handlers::access_levels::list_access_levels,
        handlers::access_levels::get_access_level,
        handlers::access_levels::create_access_level,
        handlers::access_levels::update_access_level,
        handlers::access_levels::delete_access_level,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::movements::record_movement,
        handlers::movements::list_movements,
    ),
    components(schemas(crate::errors::ErrorResponse)),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, sessions and password resets"),
        (name = "access-levels", description = "Named permission bundles"),
        (name = "users", description = "User accounts"),
        (name = "products", description = "Product catalog"),
        (name = "movements", description = "The stock movement ledger"),
        (name = "meta", description = "Service status")
    ),
    info(
        title = "Stockroom API",
        description = "Session-authenticated inventory management service"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Opaque session token from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

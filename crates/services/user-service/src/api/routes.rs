//! Route configuration.

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::{health_routes, user_routes};
use crate::api::middleware::{authorize_middleware, identity_middleware};
use crate::api::openapi::ApiDoc;
use crate::api::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth)
        .merge(health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // User routes; identity is resolved before the access policy runs
        .merge(
            user_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    authorize_middleware,
                ))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    identity_middleware,
                )),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

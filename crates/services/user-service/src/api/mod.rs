//! HTTP API: routes, handlers and request middleware.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

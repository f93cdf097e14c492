//! HTTP surface.

mod auth;
mod orders;
mod response;

pub use auth::AdminGuard;
pub use response::{ApiError, ApiJson};

use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::checkout::Checkout;

#[derive(Clone, Debug)]
pub struct AppState {
    pub checkout: Checkout,
    pub admin: AdminGuard,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "mist-storefront"})) }))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health
/// - GET  /api/v1/providers - Describe registered providers
/// - POST /api/v1/{provider}/checkout - Create checkout session
/// - GET  /api/v1/{provider}/payments/{payment_id} - Payment status
/// - POST /webhook/{provider} - Signed webhook intake (raw body)
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/providers", get(handlers::list_providers))
        .route("/{provider}/checkout", post(handlers::create_checkout))
        .route(
            "/{provider}/payments/{payment_id}",
            get(handlers::get_payment),
        );

    let webhook_routes = Router::new().route("/{provider}", post(handlers::webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

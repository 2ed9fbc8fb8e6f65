//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`; the event socket is `/ws`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Sessions
        .route(
            "/sessions",
            post(handlers::session::create_session).get(handlers::session::list_sessions),
        )
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route("/sessions/{id}/start", post(handlers::session::start_session))
        .route("/sessions/{id}/end", post(handlers::session::end_session))
        .route("/sessions/{id}/cancel", post(handlers::session::cancel_session))
        .route("/sessions/{id}/no-show", post(handlers::session::no_show_session))
        .route("/sessions/{id}/feedback", post(handlers::session::submit_feedback))
        // Metered messages
        .route(
            "/sessions/{id}/messages",
            post(handlers::message::send_message).get(handlers::message::list_messages),
        )
        // Payments
        .route(
            "/payments/credit-intent",
            post(handlers::payment::create_credit_intent),
        )
        .route("/payments/verify", post(handlers::payment::verify_payment))
        .route("/payments/stale", get(handlers::payment::list_stale_payments))
        // Wallet
        .route("/wallet/balance", get(handlers::wallet::get_balance))
        .route("/wallet/transactions", get(handlers::wallet::list_transactions))
        .route("/wallet/deduct", post(handlers::wallet::deduct))
        // Presence
        .route("/presence", put(handlers::presence::set_presence))
        .route("/presence/{mentor_id}", get(handlers::presence::get_presence));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

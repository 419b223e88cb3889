//! API routes for downline-server

pub mod members;
pub mod network;
pub mod purchases;
pub mod settlement;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{AppResponse, AppResult, ok};
use crate::rate_limit::read_rate_limit;
use crate::state::AppState;

/// Handlers return the JSON envelope or an `AppError` rendered by its
/// `IntoResponse` impl.
pub type ApiResult<T> = AppResult<Json<AppResponse<T>>>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin surface: roster edits, purchases, settlement.
    let admin = Router::new()
        .route("/api/members", post(members::create_member))
        .route("/api/members/{id}", delete(members::deactivate_member))
        .route("/api/members/{id}/placement", put(members::set_placement))
        .route("/api/purchases", post(purchases::record_purchase))
        .route(
            "/api/settlements/{year}/{month}",
            post(settlement::run_settlement),
        );

    // Read surface: reports and hierarchy queries, rate limited.
    let reads = Router::new()
        .route("/api/members/{id}/wallet", get(members::get_wallet))
        .route("/api/members/{id}/rebates", get(members::get_rebates))
        .route(
            "/api/members/{id}/performance/{year}/{month}",
            get(members::get_performance),
        )
        .route(
            "/api/settlements/{year}/{month}/preview/{member_id}",
            get(settlement::preview),
        )
        .route(
            "/api/network/{id}/downline",
            get(network::get_downline),
        )
        .route(
            "/api/network/{id}/statistics",
            get(network::get_statistics),
        )
        .route("/api/network/{id}/levels", get(network::load_levels))
        .route("/api/network/search", get(network::search))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            read_rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(admin)
        .merge(reads)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<AppResponse<&'static str>> {
    ok("ok")
}

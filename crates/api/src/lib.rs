//! HTTP API server for family-season membership reconciliation.
//!
//! Exposes the reconciliation action and read endpoints over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::ReconciliationService;
use membership_store::MembershipStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::families::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MembershipStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/families/{family_id}/seasons/{season_id}/reconcile",
            post(routes::families::reconcile::<S>),
        )
        .route(
            "/families/{family_id}/seasons/{season_id}/statement",
            get(routes::families::statement::<S>),
        )
        .route(
            "/families/{family_id}/seasons/{season_id}/memberships",
            get(routes::families::memberships::<S>),
        )
        .route(
            "/families/{family_id}/seasons/{season_id}/members/{member_id}/withdraw",
            post(routes::families::withdraw::<S>),
        )
        .route(
            "/families/{family_id}/seasons/{season_id}/members/{member_id}/status",
            put(routes::families::override_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a membership store.
pub fn create_state<S: MembershipStore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        service: ReconciliationService::new(store),
    })
}

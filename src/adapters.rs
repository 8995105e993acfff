pub mod api_errors;
pub mod entries_api;
pub mod hub;

use {
    crate::{AppState, config::HUB_PATH},
    axum::{
        Router,
        extract::DefaultBodyLimit,
        middleware,
        routing::{get, post},
    },
    entries_api::{
        list_all_entries_handler, list_entries_handler, record_event_handler,
        scope_chain_middleware,
    },
    hub::hub_upgrade_handler,
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::timeout::TimeoutLayer,
};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/entries", get(list_all_entries_handler))
        .route("/api/subjects/{id}/entries", get(list_entries_handler))
        .route("/api/subjects/{id}/events", post(record_event_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(Duration::from_secs(10)))
                .layer(middleware::from_fn(scope_chain_middleware)),
        );

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(HUB_PATH, get(hub_upgrade_handler))
        .merge(api)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

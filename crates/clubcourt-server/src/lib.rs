pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Live scoring sessions idle for longer than this are dropped.
const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(6 * 60 * 60);

/// Build a fully configured Router + shared state.
pub async fn build_app(config: &ServerConfig) -> Result<(Router, Arc<AppState>), sqlx::Error> {
    let mut options = SqlitePoolOptions::new().max_connections(config.pool_size());
    if config.is_in_memory() {
        // Closing the only connection would drop the database.
        options = options
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }
    let pool = options.connect(&config.database_url).await?;

    db::init_db(&pool).await?;

    let state = Arc::new(AppState::new(pool, config.max_sessions));

    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(600));
            loop {
                interval.tick().await;
                cleanup(&state);
            }
        });
    }

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/matches", post(routes::create_match))
        .route("/matches/{id}", get(routes::get_match))
        .route("/matches/{id}/proposals", post(routes::propose))
        .route("/matches/{id}/accept", post(routes::accept))
        .route("/matches/{id}/score", post(routes::submit_score))
        .route("/matches/{id}/confirm", post(routes::confirm))
        .route("/matches/{id}/dispute", post(routes::dispute))
        .route("/matches/{id}/walkover", post(routes::walkover))
        .route("/sessions", post(routes::start_session))
        .route("/sessions/{code}", get(routes::get_session))
        .route("/sessions/{code}/events", post(routes::record_event))
        .route("/sessions/{code}/undo", post(routes::undo))
        .route("/sessions/{code}/finish", post(routes::finish_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    Ok((app, state))
}

fn cleanup(state: &AppState) {
    let evicted = state.sessions.evict_idle(SESSION_IDLE_LIMIT);
    if !evicted.is_empty() {
        info!(count = evicted.len(), "evicted idle scoring sessions");
    }
}

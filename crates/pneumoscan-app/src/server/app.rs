use crate::server::{routes, static_files};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Build the Axum application
pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/state", get(routes::get_state))
        .route(
            "/image",
            post(routes::upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/classify", post(routes::classify));

    Router::new()
        .nest("/api", api_routes)
        .fallback(static_files::serve_static)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start loading the model and serve the page
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    state.spawn_model_load();
    let app = build_app(state);

    tracing::info!("Starting PneumoScan server on {}", addr);
    tracing::info!("Open http://{} in your browser", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

mod access_log;
mod config;
mod dataset_reader;
mod routes;
mod state;

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use access_log::{log_request, CYAN, GREEN, RESET};
use config::ServerConfig;
use state::AppState;

fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    // CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/datasets", get(routes::list_datasets))
        .route("/datasets/{id}/info", get(routes::get_dataset_info))
        .route("/datasets/{id}/points", get(routes::get_dataset_points))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(&config.static_dir).append_index_html_on_directories(true))
        .layer(cors)
        .layer(middleware::from_fn(log_request))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("{CYAN}Starting MitoSpace server...{RESET}");

    let config = ServerConfig::from_env();

    // Datasets are loaded once; a missing document just leaves it out of the listing
    let state = Arc::new(AppState::new(&config.data_dir).await);
    log::info!("{GREEN}Found {} datasets{RESET}", state.datasets.len());

    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("{GREEN}Server listening on http://{}{RESET}", config.addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

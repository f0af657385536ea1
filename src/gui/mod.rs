pub mod api;
pub mod error;
pub mod logs;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::report;
use state::AppState;

const BIND_ADDR: &str = "127.0.0.1:8080";

/// Starts the local web GUI and serves it until the process exits.
pub async fn start(config_path: &str) -> Result<(), AppError> {
    let state = Arc::new(AppState::new(config_path));
    let reports_dir = state.config.read().await.report.output_dir.clone();
    let app = router(state, &reports_dir);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR)
        .await
        .map_err(|e| AppError::IO(format!("binding {}", BIND_ADDR), e))?;

    let url = format!("http://{}", BIND_ADDR);
    info!("GUI available at {}", url);
    println!("SVN review GUI running at {}", url);

    // Give the server a moment to start accepting before the browser hits it.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(e) = report::open_in_browser(&url) {
            warn!("Could not open the browser: {}", e);
        }
    });

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::IO("serving the GUI".to_string(), e))
}

fn router(state: Arc<AppState>, reports_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/online", get(online_page))
        .route("/source", get(source_page))
        .route("/api/configs", get(api::list_configs))
        .route("/api/load-config", post(api::load_config))
        .route("/api/scan", post(api::scan_changes))
        .route("/api/diff", post(api::diff))
        .route("/api/review", post(api::review))
        .route("/api/online/connect", post(api::online_connect))
        .route("/api/online/log", post(api::online_log))
        .route("/api/online/revision-files", post(api::online_revision_files))
        .route("/api/online/diff", post(api::online_diff))
        .route("/api/online/review", post(api::online_review))
        .route("/api/source/scan", post(api::source_scan))
        .route("/api/source/content", post(api::source_content))
        .route("/api/source/review", post(api::source_review))
        .route("/api/logs", get(logs::stream_logs))
        .nest_service("/reports", ServeDir::new(reports_dir))
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!("../../assets/gui/index.html"))
}

async fn online_page() -> Html<&'static str> {
    Html(include_str!("../../assets/gui/online.html"))
}

async fn source_page() -> Html<&'static str> {
    Html(include_str!("../../assets/gui/source.html"))
}

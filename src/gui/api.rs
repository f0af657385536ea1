use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::config::{self, AppConfig};
use crate::gui::error::GuiError;
use crate::gui::state::AppState;
use crate::runner::{self, ProgressSink};
use crate::source_scan;
use crate::svn_commands::SvnClient;
use crate::types::FileChange;

// --- configuration ---

pub async fn list_configs(State(state): State<Arc<AppState>>) -> Json<Value> {
    let current = state.config_path.read().await.clone();
    Json(json!({
        "configs": config::list_config_files(),
        "current": current,
    }))
}

#[derive(Deserialize)]
pub struct LoadConfigRequest {
    pub path: String,
}

pub async fn load_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadConfigRequest>,
) -> Result<Json<Value>, GuiError> {
    if req.path.trim().is_empty() {
        return Err(GuiError::BadRequest("config path is required".to_string()));
    }

    let cfg = AppConfig::load(&req.path).map_err(|e| GuiError::BadRequest(e.to_string()))?;
    info!("GUI switched to config '{}'", req.path);

    let response = json!({
        "success": true,
        "provider": cfg.ai.provider,
        "model": cfg.ai.model,
        "output_dir": cfg.report.output_dir,
    });

    *state.config.write().await = cfg;
    *state.config_path.write().await = req.path;
    *state.config_loaded.write().await = true;
    Ok(Json(response))
}

/// Gate for the review endpoints: work must not start before a config file
/// has been loaded. Returns a snapshot of the loaded config.
async fn require_config(state: &AppState) -> Result<AppConfig, GuiError> {
    if !*state.config_loaded.read().await {
        return Err(GuiError::BadRequest(
            "no configuration loaded, load a config file first".to_string(),
        ));
    }
    Ok(state.config.read().await.clone())
}

// --- local working copy ---

#[derive(Deserialize)]
pub struct ScanRequest {
    #[serde(default = "default_dir")]
    pub dir: String,
}

fn default_dir() -> String {
    ".".to_string()
}

pub async fn scan_changes(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = state.config.read().await.clone();
    let svn = SvnClient::new_local(&cfg.svn.command, &req.dir);
    let changes = svn.changed_files(&cfg.ignore)?;

    info!("Scanned {}: {} change(s)", req.dir, changes.len());

    let response = json!({
        "success": true,
        "work_dir": req.dir,
        "changes": changes,
    });

    *state.work_dir.write().await = req.dir;
    *state.changes.write().await = changes;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct DiffRequest {
    pub path: String,
}

/// Returns a single file's diff (or full content for added/unversioned files)
/// for the frontend's diff viewer.
pub async fn diff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiffRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = state.config.read().await.clone();
    let work_dir = state.work_dir.read().await.clone();
    let changes = state.changes.read().await.clone();

    let change = changes
        .iter()
        .find(|c| c.path == req.path)
        .ok_or_else(|| GuiError::NotFound(format!("no scanned change for '{}'", req.path)))?;

    let svn = SvnClient::new_local(&cfg.svn.command, &work_dir);
    let text = match change.status.as_str() {
        "A" | "?" => svn.file_content(&req.path)?,
        "D" => format!("File '{}' was deleted.", req.path),
        _ => svn.file_diff(&req.path)?,
    };

    Ok(Json(json!({ "diff": text })))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    /// Paths to review; empty means every scanned change.
    #[serde(default)]
    pub files: Vec<String>,
}

/// Kicks off a working-copy review in the background. Progress is streamed
/// over `/api/logs`; the final `REPORT_URL:` line links the finished report.
pub async fn review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = require_config(&state).await?;
    let work_dir = state.work_dir.read().await.clone();
    let mut changes = state.changes.read().await.clone();

    if !req.files.is_empty() {
        changes.retain(|c| req.files.contains(&c.path));
    }
    if changes.is_empty() {
        return Err(GuiError::BadRequest(
            "no changes to review, scan first".to_string(),
        ));
    }

    let count = changes.len();
    let svn = SvnClient::new_local(&cfg.svn.command, &work_dir);
    let sink = ProgressSink::Channel(state.log_tx.clone());

    tokio::spawn(async move {
        run_review(&cfg, &sink, async {
            runner::review_changes(&cfg, &svn, &changes, &work_dir, &sink).await
        })
        .await;
    });

    Ok(Json(json!({ "success": true, "count": count })))
}

// --- online repository ---

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub save: bool,
}

pub async fn online_connect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<Value>, GuiError> {
    if req.url.trim().is_empty() {
        return Err(GuiError::BadRequest("repository url is required".to_string()));
    }

    // file:// repositories never take credentials.
    let (username, password) = if req.url.starts_with("file://") {
        (String::new(), String::new())
    } else {
        (req.username.clone(), req.password.clone())
    };

    let cfg = state.config.read().await.clone();
    let svn = SvnClient::new_online(&cfg.svn.command, req.url.trim(), &username, &password);
    svn.test_connection()?;

    info!("GUI connected to {}", req.url.trim());

    if req.save {
        let config_path = state.config_path.read().await.clone();
        let mut cfg = state.config.write().await;
        cfg.online.url = req.url.trim().to_string();
        cfg.online.username = username;
        cfg.online.password = password;
        if let Err(e) = cfg.save(&config_path) {
            error!("Could not save connection details: {}", e);
        }
    }

    let response = json!({ "success": true, "url": svn.url() });
    *state.online.write().await = Some(svn);
    Ok(Json(response))
}

async fn online_client(state: &AppState) -> Result<SvnClient, GuiError> {
    state
        .online
        .read()
        .await
        .clone()
        .ok_or_else(|| GuiError::BadRequest("not connected to a repository".to_string()))
}

#[derive(Deserialize)]
pub struct LogSearchRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub page: usize,
}

const LOG_PAGE_SIZE: usize = 10;

pub async fn online_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogSearchRequest>,
) -> Result<Json<Value>, GuiError> {
    let svn = online_client(&state).await?;
    let (entries, has_more) = svn.search_log(
        &req.path,
        &req.keyword,
        &req.author,
        LOG_PAGE_SIZE,
        req.page * LOG_PAGE_SIZE,
    )?;

    Ok(Json(json!({
        "success": true,
        "entries": entries,
        "has_more": has_more,
        "page": req.page,
    })))
}

#[derive(Deserialize)]
pub struct RevisionRequest {
    pub revision: u64,
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn online_revision_files(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevisionRequest>,
) -> Result<Json<Value>, GuiError> {
    let svn = online_client(&state).await?;
    let files = svn.revision_files(req.revision)?;
    Ok(Json(json!({
        "success": true,
        "revision": req.revision,
        "files": files,
    })))
}

pub async fn online_diff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevisionRequest>,
) -> Result<Json<Value>, GuiError> {
    let svn = online_client(&state).await?;
    let text = svn.revision_diff(req.revision, req.path.as_deref())?;
    Ok(Json(json!({ "diff": text })))
}

#[derive(Deserialize)]
pub struct OnlineReviewRequest {
    pub revision: u64,
    /// Paths to review; empty means every file the revision touched.
    #[serde(default)]
    pub files: Vec<String>,
}

pub async fn online_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnlineReviewRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = require_config(&state).await?;
    let svn = online_client(&state).await?;

    let mut files: Vec<FileChange> = svn.revision_files(req.revision)?;
    if !req.files.is_empty() {
        files.retain(|f| req.files.contains(&f.path));
    }
    if files.is_empty() {
        return Err(GuiError::BadRequest(format!(
            "revision {} has no matching files",
            req.revision
        )));
    }

    let count = files.len();
    let sink = ProgressSink::Channel(state.log_tx.clone());

    tokio::spawn(async move {
        run_review(&cfg, &sink, async {
            runner::review_revision_files(&cfg, &svn, &files, &sink).await
        })
        .await;
    });

    Ok(Json(json!({ "success": true, "count": count })))
}

// --- source files ---

#[derive(Deserialize)]
pub struct SourceScanRequest {
    pub dir: String,
    #[serde(default)]
    pub filter: String,
}

pub async fn source_scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceScanRequest>,
) -> Result<Json<Value>, GuiError> {
    let files = source_scan_list(&req.dir, &req.filter)?;
    let response = json!({
        "success": true,
        "count": files.len(),
        "files": files,
    });

    *state.source_root.write().await = req.dir;
    *state.source_files.write().await = files;
    Ok(Json(response))
}

fn source_scan_list(
    dir: &str,
    filter: &str,
) -> Result<Vec<crate::types::SourceFile>, GuiError> {
    source_scan::scan_source_files(dir, filter)
        .map_err(|e| GuiError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
pub struct SourceContentRequest {
    pub index: usize,
}

/// Returns one scanned source file's content for preview.
pub async fn source_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceContentRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = state.config.read().await.clone();
    let root = state.source_root.read().await.clone();
    let scanned = state.source_files.read().await.clone();

    let file = scanned
        .iter()
        .find(|f| f.index == req.index)
        .ok_or_else(|| GuiError::NotFound(format!("no scanned file with index {}", req.index)))?;

    let svn = SvnClient::new_local(&cfg.svn.command, &root);
    let content = svn.file_content(&file.path)?;
    Ok(Json(json!({ "path": file.path, "content": content })))
}

#[derive(Deserialize)]
pub struct SourceReviewRequest {
    /// 1-based indices into the last scan; empty means every file.
    #[serde(default)]
    pub indices: Vec<usize>,
}

pub async fn source_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceReviewRequest>,
) -> Result<Json<Value>, GuiError> {
    let cfg = require_config(&state).await?;
    let root = state.source_root.read().await.clone();
    let scanned = state.source_files.read().await.clone();

    if scanned.is_empty() {
        return Err(GuiError::BadRequest(
            "no source files scanned yet".to_string(),
        ));
    }

    let paths: Vec<String> = scanned
        .iter()
        .filter(|f| req.indices.is_empty() || req.indices.contains(&f.index))
        .map(|f| f.path.clone())
        .collect();
    if paths.is_empty() {
        return Err(GuiError::BadRequest("no files match the selection".to_string()));
    }

    let count = paths.len();
    let svn = SvnClient::new_local(&cfg.svn.command, &root);
    let sink = ProgressSink::Channel(state.log_tx.clone());

    tokio::spawn(async move {
        run_review(&cfg, &sink, async {
            runner::review_source_files(&cfg, &svn, &paths, &root, &sink).await
        })
        .await;
    });

    Ok(Json(json!({ "success": true, "count": count })))
}

/// Drives a background review to completion and writes the report, turning
/// any failure into a log line the frontend can show.
async fn run_review<F>(cfg: &AppConfig, sink: &ProgressSink, fut: F)
where
    F: Future<Output = Result<crate::report::Report, crate::errors::AppError>>,
{
    match fut.await {
        Ok(report) => {
            if let Err(e) = runner::finalize_report(cfg, &report, sink) {
                sink.log(&format!("ERROR: failed to write the report: {}", e));
            } else {
                sink.log("Review finished.");
            }
        }
        Err(e) => sink.log(&format!("ERROR: review failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn unloaded_state() -> Arc<AppState> {
        Arc::new(AppState::new("/no/such/config.yaml"))
    }

    fn loaded_state() -> Arc<AppState> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ai:\n  provider: openai\n").unwrap();
        Arc::new(AppState::new(file.path().to_str().unwrap()))
    }

    #[tokio::test]
    async fn test_review_rejected_without_loaded_config() {
        let err = review(
            State(unloaded_state()),
            Json(ReviewRequest { files: Vec::new() }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GuiError::BadRequest(_)));
        assert!(err.to_string().contains("no configuration loaded"));
    }

    #[tokio::test]
    async fn test_online_review_rejected_without_loaded_config() {
        let err = online_review(
            State(unloaded_state()),
            Json(OnlineReviewRequest {
                revision: 1,
                files: Vec::new(),
            }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no configuration loaded"));
    }

    #[tokio::test]
    async fn test_source_review_rejected_without_loaded_config() {
        let err = source_review(
            State(unloaded_state()),
            Json(SourceReviewRequest {
                indices: Vec::new(),
            }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no configuration loaded"));
    }

    #[tokio::test]
    async fn test_review_with_loaded_config_passes_the_gate() {
        // With a config loaded the gate passes; the next validation (an empty
        // scanned change set) is what rejects the request.
        let err = review(
            State(loaded_state()),
            Json(ReviewRequest { files: Vec::new() }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no changes to review"));
    }
}

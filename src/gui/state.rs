use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::config::AppConfig;
use crate::svn_commands::SvnClient;
use crate::types::{FileChange, SourceFile};

/// State shared across GUI request handlers.
pub struct AppState {
    /// Config file currently in effect.
    pub config_path: RwLock<String>,
    pub config: RwLock<AppConfig>,
    /// Whether a config file was actually loaded. Review endpoints refuse to
    /// start work while this is false.
    pub config_loaded: RwLock<bool>,
    /// Last scanned working copy and its changes.
    pub work_dir: RwLock<String>,
    pub changes: RwLock<Vec<FileChange>>,
    /// Connected remote client, if any.
    pub online: RwLock<Option<SvnClient>>,
    /// Last scanned source tree and its files.
    pub source_root: RwLock<String>,
    pub source_files: RwLock<Vec<SourceFile>>,
    /// Live progress messages, drained by the SSE endpoint.
    pub log_tx: broadcast::Sender<String>,
}

impl AppState {
    /// Builds the initial state. A missing or broken config file is not fatal
    /// for the GUI; the user can load another one from the page.
    pub fn new(config_path: &str) -> Self {
        let (config, config_loaded) = match AppConfig::load(config_path) {
            Ok(cfg) => (cfg, true),
            Err(e) => {
                warn!("Could not load '{}' at startup: {}", config_path, e);
                let mut cfg = AppConfig::default();
                cfg.svn.command = "svn".to_string();
                cfg.report.output_dir = "./reports".to_string();
                (cfg, false)
            }
        };

        let (log_tx, _) = broadcast::channel(256);

        Self {
            config_path: RwLock::new(config_path.to_string()),
            config: RwLock::new(config),
            config_loaded: RwLock::new(config_loaded),
            work_dir: RwLock::new(".".to_string()),
            changes: RwLock::new(Vec::new()),
            online: RwLock::new(None),
            source_root: RwLock::new(String::new()),
            source_files: RwLock::new(Vec::new()),
            log_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_missing_config_uses_defaults() {
        let state = AppState::new("/no/such/config.yaml");
        let cfg = state.config.blocking_read();
        assert_eq!(cfg.svn.command, "svn");
        assert_eq!(cfg.report.output_dir, "./reports");
        assert!(!*state.config_loaded.blocking_read());
    }
}

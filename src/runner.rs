use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ai_client::AiClient;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::report::{self, FileReview, Report};
use crate::svn_commands::SvnClient;
use crate::types::FileChange;

/// Fallback system prompt when the config does not provide one.
pub const DEFAULT_REVIEW_PROMPT: &str = "You are an experienced code reviewer. \
Review the given code changes and reply with a single JSON object of this shape:\n\
{\n\
  \"summary\": \"one paragraph overall assessment\",\n\
  \"score\": 0-100,\n\
  \"issues\": [{\"severity\": \"high|medium|low\", \"title\": \"...\", \"description\": \"...\", \"suggestion\": \"...\"}],\n\
  \"strengths\": [\"...\"],\n\
  \"recommendations\": [\"...\"]\n\
}\n\
Reply with the JSON object only, no surrounding prose.";

/// Where review progress messages go: the terminal for CLI runs, a broadcast
/// channel (drained by the SSE endpoint) for GUI runs.
pub enum ProgressSink {
    Stdout,
    Channel(broadcast::Sender<String>),
}

impl ProgressSink {
    pub fn log(&self, message: &str) {
        match self {
            ProgressSink::Stdout => println!("{}", message),
            ProgressSink::Channel(tx) => {
                info!("{}", message);
                // A send error just means no browser is listening right now.
                let _ = tx.send(message.to_string());
            }
        }
    }
}

pub fn system_prompt(cfg: &AppConfig) -> &str {
    if cfg.review_prompt.trim().is_empty() {
        DEFAULT_REVIEW_PROMPT
    } else {
        &cfg.review_prompt
    }
}

/// Reviews working-copy changes (`svn status` results).
///
/// Deleted files get a placeholder note, added and unversioned files are
/// reviewed by full content, modified files by diff. Files whose diff comes
/// back empty are skipped.
pub async fn review_changes(
    cfg: &AppConfig,
    svn: &SvnClient,
    changes: &[FileChange],
    work_dir: &str,
    sink: &ProgressSink,
) -> Result<Report, AppError> {
    let ai = AiClient::from_config(cfg)?;
    let prompt = system_prompt(cfg);
    let mut report = Report::new("SVN Code Review Report", work_dir);
    let total = changes.len();

    for (i, change) in changes.iter().enumerate() {
        sink.log(&format!(
            "[{}/{}] Reviewing {} ({})",
            i + 1,
            total,
            change.path,
            change.status
        ));

        let mut file_review = FileReview::new(&change.path, &change.status);

        let diff = match change.status.as_str() {
            "D" => Ok(format!("File '{}' was deleted in this change.", change.path)),
            "A" | "?" => svn
                .file_content(&change.path)
                .map(|content| format!("New file content:\n{}", content)),
            _ => svn.file_diff(&change.path),
        };

        match diff {
            Ok(text) if text.trim().is_empty() => {
                sink.log(&format!("  {} has no textual changes, skipping", change.path));
                continue;
            }
            Ok(text) => {
                file_review.diff = text;
                review_one(&ai, prompt, &mut file_review, sink).await;
            }
            Err(e) => {
                sink.log(&format!("  Failed to read {}: {}", change.path, e));
                file_review.error = Some(e.to_string());
            }
        }

        report.reviews.push(file_review);
    }

    Ok(report)
}

/// Reviews files picked from repository revisions (online mode). Each file
/// carries the revision it came from, so one run can span several revisions.
///
/// Deleted paths are skipped. Added files are reviewed by their reconstructed
/// content, everything else by the file's section of the revision diff; if
/// the section cannot be isolated the whole revision diff is used.
pub async fn review_revision_files(
    cfg: &AppConfig,
    svn: &SvnClient,
    files: &[FileChange],
    sink: &ProgressSink,
) -> Result<Report, AppError> {
    let ai = AiClient::from_config(cfg)?;
    let prompt = system_prompt(cfg);
    let mut report = Report::new("SVN Online Review Report", svn.url());
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        let Some(revision) = file.revision else {
            sink.log(&format!(
                "[{}/{}] {} has no revision attached, skipping",
                i + 1,
                total,
                file.path
            ));
            continue;
        };
        if file.status == "D" {
            sink.log(&format!("[{}/{}] {} was deleted, skipping", i + 1, total, file.path));
            continue;
        }

        sink.log(&format!(
            "[{}/{}] Reviewing {} (r{}, {})",
            i + 1,
            total,
            file.path,
            revision,
            file.status
        ));

        let mut file_review = FileReview::new(&file.path, &file.status);
        file_review.revision = Some(revision);

        let diff = if file.status == "A" {
            match svn.file_content_at_revision(revision, &file.path) {
                Ok(content) => Ok(format!("New file content:\n{}", content)),
                Err(e) => {
                    warn!(
                        "Content extraction for '{}' failed ({}), falling back to the diff",
                        file.path, e
                    );
                    svn.revision_diff(revision, Some(&file.path))
                }
            }
        } else {
            svn.revision_diff(revision, Some(&file.path))
        };

        // 提取不到单文件 diff 时退回整个修订的 diff
        let diff = match diff {
            Ok(text) if text.trim().is_empty() => svn.revision_diff(revision, None),
            other => other,
        };

        match diff {
            Ok(text) if text.trim().is_empty() => {
                sink.log(&format!("  No diff available for {}, skipping", file.path));
                continue;
            }
            Ok(text) => {
                file_review.diff = text;
                review_one(&ai, prompt, &mut file_review, sink).await;
            }
            Err(e) => {
                sink.log(&format!("  Failed to get diff for {}: {}", file.path, e));
                file_review.error = Some(e.to_string());
            }
        }

        report.reviews.push(file_review);
    }

    Ok(report)
}

/// Reviews full source files by content (the GUI's source page).
pub async fn review_source_files(
    cfg: &AppConfig,
    svn: &SvnClient,
    files: &[String],
    root: &str,
    sink: &ProgressSink,
) -> Result<Report, AppError> {
    let ai = AiClient::from_config(cfg)?;
    let prompt = system_prompt(cfg);
    let mut report = Report::new("Source Code Review Report", root);
    let total = files.len();

    for (i, path) in files.iter().enumerate() {
        sink.log(&format!("[{}/{}] Reviewing {}", i + 1, total, path));

        let mut file_review = FileReview::new(path, "M");
        match svn.file_content(path) {
            Ok(content) => {
                file_review.diff = format!("Source file content:\n{}", content);
                review_one(&ai, prompt, &mut file_review, sink).await;
            }
            Err(e) => {
                sink.log(&format!("  Failed to read {}: {}", path, e));
                file_review.error = Some(e.to_string());
            }
        }

        report.reviews.push(file_review);
    }

    Ok(report)
}

/// Runs one file's review and records the outcome on `file_review`.
async fn review_one(
    ai: &AiClient,
    prompt: &str,
    file_review: &mut FileReview,
    sink: &ProgressSink,
) {
    match ai.review(&file_review.file_name, &file_review.diff, prompt).await {
        Ok(result) => {
            match result.review.as_ref() {
                Some(data) => sink.log(&format!("  Score: {}", data.score)),
                None => sink.log("  Review received (unstructured reply)"),
            }
            file_review.result = Some(result);
        }
        Err(e) => {
            sink.log(&format!("  Review failed: {}", e));
            file_review.error = Some(e.to_string());
        }
    }
}

/// Writes the HTML report and announces it.
///
/// The `REPORT_URL:` log line is the contract the GUI frontend relies on to
/// link the finished report from the live log stream.
pub fn finalize_report(
    cfg: &AppConfig,
    report: &Report,
    sink: &ProgressSink,
) -> Result<PathBuf, AppError> {
    let path = report::generate_html(report, &cfg.report.output_dir)?;
    let path_str = path.to_string_lossy().to_string();

    sink.log(&format!("REPORT_URL:{}", path_str));

    if cfg.report.auto_open {
        if let Err(e) = report::open_in_browser(&path_str) {
            warn!("Could not open the report in a browser: {}", e);
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_falls_back_to_default() {
        let cfg = AppConfig::default();
        assert_eq!(system_prompt(&cfg), DEFAULT_REVIEW_PROMPT);

        let mut cfg = AppConfig::default();
        cfg.review_prompt = "   ".to_string();
        assert_eq!(system_prompt(&cfg), DEFAULT_REVIEW_PROMPT);

        cfg.review_prompt = "Custom prompt".to_string();
        assert_eq!(system_prompt(&cfg), "Custom prompt");
    }

    #[test]
    fn test_progress_sink_channel_delivers_messages() {
        let (tx, mut rx) = broadcast::channel(16);
        let sink = ProgressSink::Channel(tx);
        sink.log("hello");
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_progress_sink_channel_without_receiver_does_not_panic() {
        let (tx, rx) = broadcast::channel(16);
        drop(rx);
        ProgressSink::Channel(tx).log("nobody listening");
    }

    #[test]
    fn test_finalize_report_logs_report_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.report.output_dir = dir.path().to_string_lossy().to_string();
        cfg.report.auto_open = false;

        let (tx, mut rx) = broadcast::channel(16);
        let sink = ProgressSink::Channel(tx);
        let report = Report::new("t", "w");

        let path = finalize_report(&cfg, &report, &sink).unwrap();
        assert!(path.exists());

        let line = rx.try_recv().unwrap();
        assert!(line.starts_with("REPORT_URL:"));
        assert!(line.contains("review_report_"));
    }
}

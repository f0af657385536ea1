use serde::Serialize;
use std::process::ExitStatus;

/// Output of an svn subprocess invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.status.success()
    }
}

/// A changed file reported by `svn status` or an `svn log` entry.
///
/// `status` carries the raw SVN status letter (`A`, `M`, `D`, `?`); anything
/// else SVN prints is kept verbatim and rendered as-is downstream.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    pub path: String,
    pub status: String,
    /// Set in online mode only: the revision this change belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

/// One `<logentry>` of `svn log --xml` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogEntry {
    pub revision: u64,
    pub author: String,
    pub date: String,
    pub message: String,
    pub paths: Vec<LogPath>,
}

/// A changed path inside a log entry, with its action letter.
#[derive(Debug, Clone, Serialize)]
pub struct LogPath {
    pub action: String,
    pub path: String,
}

/// A file found by the source-mode directory walk.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub index: usize,
    pub path: String,
}

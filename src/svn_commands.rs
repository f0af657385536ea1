use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::errors::{AppError, SvnError};
use crate::svn_parse::{
    extract_file_diff, extract_new_file_content, parse_log_xml, should_ignore,
};
use crate::types::{CommandOutput, FileChange, LogEntry};

/// Maximum file size read for full-content review (10 MiB).
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Wrapper around the svn command-line client.
///
/// A client is either local (bound to a working copy directory) or online
/// (bound to a repository URL with optional credentials); the two modes share
/// the subprocess plumbing.
#[derive(Debug, Clone)]
pub struct SvnClient {
    command: String,
    work_dir: PathBuf,
    url: String,
    username: String,
    password: String,
}

impl SvnClient {
    /// Creates a client for a local working copy.
    pub fn new_local(command: &str, work_dir: &str) -> Self {
        Self {
            command: command.to_string(),
            work_dir: PathBuf::from(work_dir),
            url: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }

    /// Creates a client for a remote repository URL.
    pub fn new_online(command: &str, url: &str, username: &str, password: &str) -> Self {
        Self {
            command: command.to_string(),
            work_dir: PathBuf::new(),
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs svn with the given arguments and captures its output.
    fn run_svn(&self, args: &[String], in_work_dir: bool) -> Result<CommandOutput, AppError> {
        debug!("Capturing output: {} {}", self.command, args.join(" "));

        let mut cmd = Command::new(&self.command);
        cmd.args(args);
        if in_work_dir && !self.work_dir.as_os_str().is_empty() {
            cmd.current_dir(&self.work_dir);
        }

        let output = cmd.output().map_err(|e| {
            AppError::IO(
                format!("Failed to execute: {} {}", self.command, args.join(" ")),
                e,
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            warn!(
                "SVN cmd '{} {}' non-success {}. Stderr: [{}]",
                self.command,
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            status: output.status,
        })
    }

    /// Appends `--username/--password --non-interactive` when credentials are
    /// configured. Anonymous and `file://` access send no auth arguments.
    fn push_auth_args(&self, args: &mut Vec<String>) {
        if self.username.is_empty() {
            return;
        }
        args.push("--username".to_string());
        args.push(self.username.clone());
        if !self.password.is_empty() {
            args.push("--password".to_string());
            args.push(self.password.clone());
        }
        args.push("--non-interactive".to_string());
    }

    /// Lists changed files in the working copy (`svn status`), including
    /// unversioned files, minus anything matching the ignore patterns.
    pub fn changed_files(&self, ignore: &[String]) -> Result<Vec<FileChange>, AppError> {
        let output = self.run_svn(&["status".to_string()], true)?;
        if !output.is_success() {
            return Err(SvnError::CommandFailed {
                command: format!("{} status", self.command),
                status_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into());
        }
        Ok(parse_status_output(&output.stdout, ignore))
    }

    /// Returns the diff of a single working-copy file.
    ///
    /// svn may exit non-zero when a file has no textual diff; that is not an
    /// error, the (possibly empty) stdout is the answer.
    pub fn file_diff(&self, file_path: &str) -> Result<String, AppError> {
        let abs_path = self.work_dir.join(file_path);
        let output = self.run_svn(
            &["diff".to_string(), abs_path.to_string_lossy().to_string()],
            true,
        )?;
        Ok(output.stdout)
    }

    /// Reads a working-copy file's full content (for added/unversioned files).
    pub fn file_content(&self, file_path: &str) -> Result<String, AppError> {
        let abs_path = self.work_dir.join(file_path);
        let metadata = fs::metadata(&abs_path).map_err(|e| {
            AppError::IO(format!("reading metadata of '{}'", abs_path.display()), e)
        })?;

        if metadata.is_dir() {
            return Err(SvnError::NotAFile(file_path.to_string()).into());
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(SvnError::FileTooLarge {
                path: file_path.to_string(),
                size: metadata.len(),
            }
            .into());
        }

        fs::read_to_string(&abs_path)
            .map_err(|e| AppError::IO(format!("reading '{}'", abs_path.display()), e))
    }

    /// Verifies the repository URL is reachable (`svn info <url>`).
    pub fn test_connection(&self) -> Result<(), AppError> {
        let mut args = vec!["info".to_string(), self.url.clone()];
        self.push_auth_args(&mut args);

        let output = self.run_svn(&args, false)?;
        if !output.is_success() {
            return Err(SvnError::ConnectionFailed(output.stderr.trim().to_string()).into());
        }
        Ok(())
    }

    /// Searches the repository log.
    ///
    /// `author` is forwarded to `svn log --search`; `keyword` is applied as a
    /// post-filter over message and author. Returns the requested page of
    /// entries and whether more entries exist past it.
    pub fn search_log(
        &self,
        path: &str,
        keyword: &str,
        author: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<LogEntry>, bool), AppError> {
        let target = if path.is_empty() || path == "/" {
            self.url.clone()
        } else {
            format!("{}/{}", self.url, path.trim_start_matches('/'))
        };

        let mut args = vec!["log".to_string(), target];
        self.push_auth_args(&mut args);

        // Fetch one past the page end so has_more can be derived.
        args.push("--limit".to_string());
        args.push((offset + limit + 1).to_string());
        if !author.is_empty() {
            args.push("--search".to_string());
            args.push(author.to_string());
        }
        args.push("--verbose".to_string());
        args.push("--xml".to_string());

        let output = self.run_svn(&args, false)?;
        if !output.is_success() {
            return Err(SvnError::CommandFailed {
                command: format!("{} log", self.command),
                status_code: output.status.code(),
                stdout: String::new(),
                stderr: output.stderr,
            }
            .into());
        }

        let mut entries = parse_log_xml(&output.stdout);

        if !keyword.is_empty() {
            entries.retain(|e| e.message.contains(keyword) || e.author.contains(keyword));
        }

        let has_more = entries.len() > offset + limit;
        let page = entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect::<Vec<_>>();

        Ok((page, has_more))
    }

    /// Lists the files changed by a single revision.
    pub fn revision_files(&self, revision: u64) -> Result<Vec<FileChange>, AppError> {
        let mut args = vec![
            "log".to_string(),
            self.url.clone(),
            "-r".to_string(),
            revision.to_string(),
            "--verbose".to_string(),
            "--xml".to_string(),
        ];
        self.push_auth_args(&mut args);

        let output = self.run_svn(&args, false)?;
        if !output.is_success() {
            return Err(SvnError::CommandFailed {
                command: format!("{} log -r {}", self.command, revision),
                status_code: output.status.code(),
                stdout: String::new(),
                stderr: output.stderr,
            }
            .into());
        }

        let entries = parse_log_xml(&output.stdout);
        let entry = entries
            .into_iter()
            .next()
            .ok_or(SvnError::RevisionNotFound(revision))?;

        Ok(entry
            .paths
            .into_iter()
            .map(|p| FileChange {
                path: p.path,
                status: p.action,
                revision: Some(revision),
            })
            .collect())
    }

    /// Returns the diff of a revision (`svn diff -c N`), optionally narrowed
    /// to a single file's section.
    ///
    /// svn sometimes exits non-zero while still printing the diff; output on
    /// stdout wins over the exit status.
    pub fn revision_diff(&self, revision: u64, path: Option<&str>) -> Result<String, AppError> {
        let mut args = vec![
            "diff".to_string(),
            "-c".to_string(),
            revision.to_string(),
            self.url.clone(),
        ];
        self.push_auth_args(&mut args);

        let output = self.run_svn(&args, false)?;
        if !output.is_success() && output.stdout.is_empty() {
            return Err(SvnError::CommandFailed {
                command: format!("{} diff -c {}", self.command, revision),
                status_code: output.status.code(),
                stdout: String::new(),
                stderr: output.stderr,
            }
            .into());
        }

        match path {
            Some(p) => {
                let extracted = extract_file_diff(&output.stdout, p);
                if extracted.is_empty() {
                    debug!(
                        "No diff section matched '{}' in r{} (diff head: {:?})",
                        p,
                        revision,
                        output.stdout.chars().take(200).collect::<String>()
                    );
                }
                Ok(extracted)
            }
            None => Ok(output.stdout),
        }
    }

    /// Reconstructs an added file's content at a revision from the revision
    /// diff. More reliable than `svn cat` for files that were added in the
    /// revision under review.
    pub fn file_content_at_revision(
        &self,
        revision: u64,
        path: &str,
    ) -> Result<String, AppError> {
        let full_diff = self.revision_diff(revision, None)?;
        let content = extract_new_file_content(&full_diff, path);
        if content.is_empty() {
            return Err(SvnError::Other(format!(
                "could not extract content of '{}' from the r{} diff",
                path, revision
            ))
            .into());
        }
        Ok(content)
    }
}

/// Parses `svn status` output into file changes.
///
/// Each line is `<status letter(s)> <path>`; only `A`, `M`, `D` and `?` rows
/// are review candidates.
fn parse_status_output(text: &str, ignore: &[String]) -> Vec<FileChange> {
    let mut changes = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(status) = fields.next() else {
            continue;
        };
        // The path is the last field; a lone status letter has none.
        let Some(path) = fields.last() else {
            continue;
        };

        if matches!(status, "A" | "M" | "D" | "?") && !should_ignore(path, ignore) {
            changes.push(FileChange {
                path: path.to_string(),
                status: status.to_string(),
                revision: None,
            });
        }
    }

    changes
}

/// Checks if the configured svn binary is available.
pub fn is_svn_available(command: &str) -> Result<bool, AppError> {
    match Command::new(command).arg("--version").output() {
        Ok(output) => Ok(output.status.success()),
        Err(e) => Err(AppError::IO(
            format!("Failed to check if '{}' is available", command),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_output_basic() {
        let text = "M       src/main.c\nA       src/util.c\nD       old.c\n?       notes.txt\n";
        let changes = parse_status_output(text, &[]);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0].status, "M");
        assert_eq!(changes[0].path, "src/main.c");
        assert_eq!(changes[3].status, "?");
        assert_eq!(changes[3].path, "notes.txt");
        assert!(changes.iter().all(|c| c.revision.is_none()));
    }

    #[test]
    fn test_parse_status_output_skips_other_statuses() {
        let text = "C       conflicted.c\n!       missing.c\nM       kept.c\n";
        let changes = parse_status_output(text, &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "kept.c");
    }

    #[test]
    fn test_parse_status_output_applies_ignore() {
        let text = "M       src/main.c\n?       target/debug/app\nM       debug.log\n";
        let ignore = vec!["target/".to_string(), "*.log".to_string()];
        let changes = parse_status_output(text, &ignore);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "src/main.c");
    }

    #[test]
    fn test_parse_status_output_empty_and_blank_lines() {
        assert!(parse_status_output("", &[]).is_empty());
        assert!(parse_status_output("\n\n   \n", &[]).is_empty());
    }

    #[test]
    fn test_push_auth_args_with_credentials() {
        let client = SvnClient::new_online("svn", "https://svn.example.com/r", "alice", "pw");
        let mut args = vec!["info".to_string()];
        client.push_auth_args(&mut args);
        assert_eq!(
            args,
            vec!["info", "--username", "alice", "--password", "pw", "--non-interactive"]
        );
    }

    #[test]
    fn test_push_auth_args_username_only() {
        let client = SvnClient::new_online("svn", "file:///repo", "alice", "");
        let mut args = Vec::new();
        client.push_auth_args(&mut args);
        assert_eq!(args, vec!["--username", "alice", "--non-interactive"]);
    }

    #[test]
    fn test_push_auth_args_anonymous() {
        let client = SvnClient::new_online("svn", "file:///repo", "", "");
        let mut args = Vec::new();
        client.push_auth_args(&mut args);
        assert!(args.is_empty());
    }
}

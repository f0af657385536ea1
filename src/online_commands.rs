use std::io::{self, Write};

use colored::Colorize;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::review_commands::{parse_selection, status_colored};
use crate::runner::{self, ProgressSink};
use crate::svn_commands::SvnClient;
use crate::types::{FileChange, LogEntry};

const PAGE_SIZE: usize = 10;

/// Command line overrides for the online session.
#[derive(Debug, Default)]
pub struct OnlineOptions {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub path: String,
    pub keyword: String,
    pub author: String,
    pub save: bool,
}

/// Handles `svnie online`: browses a remote repository's log, lets the user
/// pick one or more revisions, then the files from them to review.
pub async fn handle_online(config_path: &str, opts: OnlineOptions) -> Result<(), AppError> {
    let mut cfg = AppConfig::load(config_path)?;

    let url = match opts.url.or_else(|| non_empty(&cfg.online.url)) {
        Some(u) => u,
        None => prompt("Repository URL: ")?,
    };
    if url.is_empty() {
        println!("{}", "A repository URL is required.".red());
        return Ok(());
    }

    // file:// repositories are local, no credentials involved.
    let (username, password) = if url.starts_with("file://") {
        (String::new(), String::new())
    } else {
        let username = match opts.username.or_else(|| non_empty(&cfg.online.username)) {
            Some(u) => u,
            None => prompt("Username (empty for anonymous): ")?,
        };
        let password = if username.is_empty() {
            String::new()
        } else {
            match opts.password.or_else(|| non_empty(&cfg.online.password)) {
                Some(p) => p,
                None => prompt("Password: ")?,
            }
        };
        (username, password)
    };

    if opts.save {
        cfg.online.url = url.clone();
        cfg.online.username = username.clone();
        cfg.online.password = password.clone();
        cfg.save(config_path)?;
        println!("Connection details saved to {}", config_path);
    }

    let svn = SvnClient::new_online(&cfg.svn.command, &url, &username, &password);

    info!("Testing connection to {}", url);
    svn.test_connection()?;
    println!("{} {}", "Connected to".green(), url);

    let Some(revisions) = browse_log(&svn, &opts.path, &opts.keyword, &opts.author)? else {
        return Ok(());
    };

    // Aggregate the changed files of every picked revision; each file keeps
    // the revision it came from.
    let mut all_files: Vec<FileChange> = Vec::new();
    for revision in &revisions {
        match svn.revision_files(*revision) {
            Ok(files) => all_files.extend(files),
            Err(e) => println!("{} r{}: {}", "Skipping".yellow(), revision, e),
        }
    }
    if all_files.is_empty() {
        println!("The selected revisions contain no file changes.");
        return Ok(());
    }

    println!("\n{} changed file(s):", all_files.len());
    for (i, file) in all_files.iter().enumerate() {
        println!(
            "  {:>3}. {} {} (r{})",
            i + 1,
            status_colored(&file.status),
            file.path,
            file.revision.unwrap_or(0)
        );
    }

    let input = prompt("Select files to review (e.g. 1,3-5 or all): ")?;
    let files = select_files(all_files, &input);
    if files.is_empty() {
        println!("Nothing selected, exiting.");
        return Ok(());
    }

    let sink = ProgressSink::Stdout;
    let report = runner::review_revision_files(&cfg, &svn, &files, &sink).await?;
    let path = runner::finalize_report(&cfg, &report, &sink)?;

    println!("\n{} {}", "Report written to".green().bold(), path.display());
    Ok(())
}

/// Pages through the log until the user picks one or more entries or quits.
/// Returns the picked revision numbers.
fn browse_log(
    svn: &SvnClient,
    path: &str,
    keyword: &str,
    author: &str,
) -> Result<Option<Vec<u64>>, AppError> {
    let mut offset = 0;

    loop {
        let (entries, has_more) = svn.search_log(path, keyword, author, PAGE_SIZE, offset)?;
        if entries.is_empty() {
            println!("No matching log entries.");
            return Ok(None);
        }

        println!();
        for (i, entry) in entries.iter().enumerate() {
            print_log_entry(i + 1, entry);
        }

        let hint = if has_more {
            "Select entries to review (e.g. 1,3), 'n' for more, 'q' to quit: "
        } else {
            "Select entries to review (e.g. 1,3), 'q' to quit: "
        };
        let input = prompt(hint)?;

        match input.as_str() {
            "" | "q" | "Q" => return Ok(None),
            "n" | "N" if has_more => {
                offset += PAGE_SIZE;
            }
            other => {
                let revisions = select_revisions(other, &entries);
                if revisions.is_empty() {
                    println!("{}", "Unrecognized input.".yellow());
                } else {
                    return Ok(Some(revisions));
                }
            }
        }
    }
}

/// Maps a `1,3`-style selection over the displayed entries to revision numbers.
fn select_revisions(input: &str, entries: &[LogEntry]) -> Vec<u64> {
    parse_selection(input, entries.len())
        .into_iter()
        .map(|i| entries[i - 1].revision)
        .collect()
}

/// Keeps the files picked by a `1,3-5`/`all` selection over the numbered list.
fn select_files(files: Vec<FileChange>, input: &str) -> Vec<FileChange> {
    let indices = parse_selection(input, files.len());
    files
        .into_iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(&(i + 1)))
        .map(|(_, f)| f)
        .collect()
}

fn print_log_entry(index: usize, entry: &LogEntry) {
    let first_line = entry.message.lines().next().unwrap_or("");
    println!(
        "  {:>3}. {} {} {} {} ({} file(s))",
        index,
        format!("r{}", entry.revision).cyan().bold(),
        entry.author.yellow(),
        entry.date.dimmed(),
        first_line,
        entry.paths.len()
    );
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn prompt(label: &str) -> Result<String, AppError> {
    print!("{}", label);
    io::stdout()
        .flush()
        .map_err(|e| AppError::IO("flushing stdout".to_string(), e))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| AppError::IO("reading input".to_string(), e))?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(revision: u64) -> LogEntry {
        LogEntry {
            revision,
            ..Default::default()
        }
    }

    fn file(path: &str, revision: u64) -> FileChange {
        FileChange {
            path: path.to_string(),
            status: "M".to_string(),
            revision: Some(revision),
        }
    }

    #[test]
    fn test_select_revisions_maps_indices_to_revisions() {
        let entries = vec![entry(142), entry(141), entry(139)];
        assert_eq!(select_revisions("1,3", &entries), vec![142, 139]);
        assert_eq!(select_revisions("2", &entries), vec![141]);
    }

    #[test]
    fn test_select_revisions_ignores_out_of_range() {
        let entries = vec![entry(142), entry(141)];
        assert_eq!(select_revisions("2,9", &entries), vec![141]);
        assert!(select_revisions("9", &entries).is_empty());
    }

    #[test]
    fn test_select_files_by_indices_across_revisions() {
        let all = vec![file("a.c", 142), file("b.c", 142), file("c.c", 141)];
        let picked = select_files(all, "1,3");
        let paths: Vec<&str> = picked.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.c", "c.c"]);
        assert_eq!(picked[1].revision, Some(141));
    }

    #[test]
    fn test_select_files_all_keyword() {
        let all = vec![file("a.c", 142), file("b.c", 141)];
        assert_eq!(select_files(all, "all").len(), 2);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("x"), Some("x".to_string()));
    }
}

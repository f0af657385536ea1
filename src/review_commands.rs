use std::io::{self, Write};

use colored::Colorize;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::{AppError, SvnError};
use crate::runner::{self, ProgressSink};
use crate::svn_commands::{self, SvnClient};
use crate::types::FileChange;

/// Handles `svnie review`: reviews uncommitted changes in a working copy.
///
/// # Arguments
///
/// * `config_path` - Path to the YAML configuration file
/// * `dir` - Working copy directory
/// * `files` - Optional comma separated list restricting the review
/// * `interactive` - Ask the user to pick files from a numbered list
pub async fn handle_review(
    config_path: &str,
    dir: &str,
    files: Option<&str>,
    interactive: bool,
) -> Result<(), AppError> {
    let cfg = AppConfig::load(config_path)?;

    if !svn_commands::is_svn_available(&cfg.svn.command)? {
        return Err(SvnError::Other(format!(
            "svn client '{}' is not available",
            cfg.svn.command
        ))
        .into());
    }

    let svn = SvnClient::new_local(&cfg.svn.command, dir);
    info!("Scanning working copy at {}", dir);

    let mut changes = svn.changed_files(&cfg.ignore)?;
    if changes.is_empty() {
        println!("{}", "No changes to review.".green());
        return Ok(());
    }

    if let Some(list) = files {
        changes = filter_by_list(changes, list);
        if changes.is_empty() {
            println!("{}", "None of the requested files have changes.".yellow());
            return Ok(());
        }
    }

    if interactive {
        changes = pick_interactively(changes)?;
        if changes.is_empty() {
            println!("Nothing selected, exiting.");
            return Ok(());
        }
    }

    println!(
        "Reviewing {} file(s) with {}/{}",
        changes.len(),
        cfg.ai.provider,
        cfg.ai.model
    );

    let sink = ProgressSink::Stdout;
    let report = runner::review_changes(&cfg, &svn, &changes, dir, &sink).await?;
    let path = runner::finalize_report(&cfg, &report, &sink)?;

    println!("\n{} {}", "Report written to".green().bold(), path.display());
    Ok(())
}

/// Keeps only changes whose path contains one of the comma separated names.
/// Substring matching, so `-f main` selects `src/main.c`.
fn filter_by_list(changes: Vec<FileChange>, list: &str) -> Vec<FileChange> {
    let wanted: Vec<&str> = list
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    changes
        .into_iter()
        .filter(|c| wanted.iter().any(|w| c.path.contains(w)))
        .collect()
}

fn pick_interactively(changes: Vec<FileChange>) -> Result<Vec<FileChange>, AppError> {
    println!("Changed files:");
    for (i, change) in changes.iter().enumerate() {
        println!("  {:>3}. {} {}", i + 1, status_colored(&change.status), change.path);
    }

    print!("Select files to review (e.g. 1,3-5 or all): ");
    io::stdout()
        .flush()
        .map_err(|e| AppError::IO("flushing stdout".to_string(), e))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| AppError::IO("reading selection".to_string(), e))?;

    let indices = parse_selection(&input, changes.len());
    Ok(changes
        .into_iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(&(i + 1)))
        .map(|(_, c)| c)
        .collect())
}

/// Parses a selection like `1,3-5` into 1-based indices. `all` (or an empty
/// line) selects everything; out-of-range numbers are ignored.
pub fn parse_selection(input: &str, max: usize) -> Vec<usize> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return (1..=max).collect();
    }

    let mut indices = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
            else {
                continue;
            };
            for i in start..=end {
                if i >= 1 && i <= max && !indices.contains(&i) {
                    indices.push(i);
                }
            }
        } else if let Ok(i) = part.parse::<usize>() {
            if i >= 1 && i <= max && !indices.contains(&i) {
                indices.push(i);
            }
        }
    }

    indices
}

/// Colors a status letter the way `svn status` readers expect.
pub fn status_colored(status: &str) -> colored::ColoredString {
    match status {
        "A" => status.green(),
        "M" => status.yellow(),
        "D" => status.red(),
        "?" => status.blue(),
        _ => status.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, status: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            status: status.to_string(),
            revision: None,
        }
    }

    #[test]
    fn test_parse_selection_single_numbers() {
        assert_eq!(parse_selection("1,3", 5), vec![1, 3]);
    }

    #[test]
    fn test_parse_selection_ranges_and_duplicates() {
        assert_eq!(parse_selection("1-3,2,5", 5), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_parse_selection_all_and_empty() {
        assert_eq!(parse_selection("all", 3), vec![1, 2, 3]);
        assert_eq!(parse_selection("  ", 3), vec![1, 2, 3]);
        assert_eq!(parse_selection("ALL", 2), vec![1, 2]);
    }

    #[test]
    fn test_parse_selection_ignores_out_of_range_and_garbage() {
        assert_eq!(parse_selection("0,2,9,abc", 3), vec![2]);
        assert_eq!(parse_selection("2-9", 3), vec![2, 3]);
    }

    #[test]
    fn test_filter_by_list_substring_match() {
        let changes = vec![
            change("src/main.c", "M"),
            change("src/util.c", "M"),
            change("docs/readme.md", "M"),
        ];
        let kept = filter_by_list(changes, "main, docs/readme.md");
        let paths: Vec<&str> = kept.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.c", "docs/readme.md"]);
    }

    #[test]
    fn test_filter_by_list_partial_name_selects_file() {
        let changes = vec![change("src/main.c", "M"), change("src/util.c", "M")];
        let kept = filter_by_list(changes, "main");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "src/main.c");
    }

    #[test]
    fn test_filter_by_list_no_match() {
        let changes = vec![change("src/main.c", "M")];
        assert!(filter_by_list(changes, "other.c").is_empty());
    }
}

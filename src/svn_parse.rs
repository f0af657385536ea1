//! Hand-rolled scanners for the text output of the svn client.
//!
//! `svn log --xml` is scraped by substring indexing rather than a real XML
//! parser: the output shape is fixed enough that splitting on `<logentry` and
//! pulling tags out by position has held up, and entries that do not scan are
//! skipped rather than failing the whole log.

use crate::types::{LogEntry, LogPath};

/// Parses the XML output of `svn log --xml --verbose` into log entries.
pub fn parse_log_xml(xml: &str) -> Vec<LogEntry> {
    let mut entries = Vec::new();

    // Skip everything before the first <logentry.
    for chunk in xml.split("<logentry").skip(1) {
        let mut entry = LogEntry::default();

        if let Some(rev) = extract_xml_attr(chunk, "revision") {
            entry.revision = rev.parse().unwrap_or(0);
        }
        entry.author = extract_xml_tag(chunk, "author").unwrap_or_default();
        entry.date = extract_xml_tag(chunk, "date").unwrap_or_default();
        entry.message = extract_xml_tag(chunk, "msg").unwrap_or_default();

        if let Some(paths_section) = extract_xml_section(chunk, "paths") {
            for path_chunk in paths_section.split("<path").skip(1) {
                let action = extract_xml_attr(path_chunk, "action").unwrap_or_default();
                if let Some(path) = extract_tag_body(path_chunk, "path") {
                    entry.paths.push(LogPath { action, path });
                }
            }
        }

        entries.push(entry);
    }

    entries
}

/// Extracts an `attr="value"` attribute from a tag fragment.
fn extract_xml_attr(s: &str, attr: &str) -> Option<String> {
    let marker = format!("{}=\"", attr);
    let start = s.find(&marker)? + marker.len();
    let end = s[start..].find('"')?;
    Some(s[start..start + end].to_string())
}

/// Extracts the trimmed content between `<tag>` and `</tag>`.
fn extract_xml_tag(s: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = s.find(&open)? + open.len();
    let end = s[start..].find(&close)?;
    Some(s[start..start + end].trim().to_string())
}

/// Extracts the full `<tag>...</tag>` section, tags included.
fn extract_xml_section(s: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = s.find(&open)?;
    let end = s[start..].find(&close)?;
    Some(s[start..start + end + close.len()].to_string())
}

/// For a `<path action="A" ...>content</path>` fragment that was split on
/// `<path`, returns the trimmed content after the attribute list.
fn extract_tag_body(s: &str, tag: &str) -> Option<String> {
    let start = s.find('>')? + 1;
    let close = format!("</{}", tag);
    let end = s[start..].find(&close)?;
    let body = s[start..start + end].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Extracts a single file's section from a multi-file unified diff.
///
/// `svn diff` introduces each file with an `Index: <path>` header. Matching is
/// deliberately loose (full path containment, path suffix, then bare file
/// name) because log paths are repository-absolute while diff headers are
/// relative to the diff target.
pub fn extract_file_diff(full_diff: &str, file_path: &str) -> String {
    if full_diff.is_empty() {
        return String::new();
    }

    let target_path = file_path.trim_start_matches('/');
    let file_name = target_path.rsplit('/').next().unwrap_or(target_path);

    let mut result: Vec<&str> = Vec::new();
    let mut in_file = false;

    for line in full_diff.lines() {
        if let Some(index_path) = line.strip_prefix("Index: ") {
            if in_file {
                // Reached the next file's section; ours is complete.
                break;
            }
            let index_path = index_path.trim();
            in_file = index_matches(index_path, target_path, file_name);
            if in_file {
                result.push(line);
            }
        } else if in_file {
            result.push(line);
        }
    }

    result.join("\n")
}

fn index_matches(index_path: &str, target_path: &str, file_name: &str) -> bool {
    index_path.contains(target_path)
        || index_path.ends_with(target_path)
        || index_path.ends_with(file_name)
}

/// Reconstructs an added file's content from a revision diff.
///
/// Added files have no pre-image to diff against, so the whole content shows
/// up as `+` lines after the first `@@` hunk header of the file's section.
pub fn extract_new_file_content(full_diff: &str, file_path: &str) -> String {
    if full_diff.is_empty() {
        return String::new();
    }

    let target_path = file_path.trim_start_matches('/');
    let file_name = target_path.rsplit('/').next().unwrap_or(target_path);

    let mut result: Vec<&str> = Vec::new();
    let mut in_file = false;
    let mut in_content = false;

    for line in full_diff.lines() {
        if let Some(index_path) = line.strip_prefix("Index: ") {
            if in_file {
                break;
            }
            in_file = index_matches(index_path.trim(), target_path, file_name);
            in_content = false;
        } else if in_file {
            if line.starts_with("@@") {
                in_content = true;
                continue;
            }
            // "+++" is part of the diff header, not file content.
            if in_content && line.starts_with('+') && !line.starts_with("+++") {
                result.push(&line[1..]);
            }
        }
    }

    result.join("\n")
}

/// Checks whether a path matches any configured ignore pattern.
pub fn should_ignore(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| matches_pattern(path, p))
}

/// Loose single-pattern match: exact, directory prefix (trailing `/`),
/// `*` wildcard against the file name, or plain substring.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }

    if let Some(dir) = pattern.strip_suffix('/') {
        if path.starts_with(pattern) || path.starts_with(dir) {
            return true;
        }
    }

    if pattern.contains('*') {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if wildcard_match(file_name, pattern) {
            return true;
        }
        // Fall back to checking the literal remnant of the pattern.
        let literal = pattern.replace('*', "");
        if !literal.is_empty() && path.contains(&literal) {
            return true;
        }
        return false;
    }

    path.contains(pattern)
}

/// Minimal `*`-only glob match.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(found) => {
                // A leading literal must anchor at the start.
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            }
            None => return false,
        }
    }

    // A trailing literal must anchor at the end.
    if let Some(last) = parts.last() {
        if !last.is_empty() && !text.ends_with(last) {
            return false;
        }
    }

    true
}

use std::path::Path;

use ignore::WalkBuilder;
use tracing::debug;

use crate::errors::SvnError;
use crate::types::SourceFile;

/// Walks `root` and returns every file matching `filter`, honoring
/// .gitignore-style rules along the way. Paths are returned relative to
/// `root` with forward slashes.
pub fn scan_source_files(root: &str, filter: &str) -> Result<Vec<SourceFile>, SvnError> {
    let root_path = Path::new(root);
    if !root_path.is_dir() {
        return Err(SvnError::Other(format!("not a directory: {}", root)));
    }

    let walker = WalkBuilder::new(root_path)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        // .svn administrative files never belong in a review.
        if entry
            .path()
            .components()
            .any(|c| c.as_os_str() == ".svn")
        {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root_path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        if !matches_filter(&relative, filter) {
            continue;
        }

        files.push(SourceFile {
            index: 0,
            path: relative,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    for (i, file) in files.iter_mut().enumerate() {
        file.index = i + 1;
    }

    debug!("Scanned {} source files under {}", files.len(), root);
    Ok(files)
}

/// Matches a relative path against a user-supplied filter.
///
/// An empty filter matches everything. A filter starting with `*.` matches
/// the extension, a filter containing `*` is treated as a glob on the file
/// name, and anything else matches as a substring of the path.
pub fn matches_filter(path: &str, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        return true;
    }

    if let Some(ext) = filter.strip_prefix("*.") {
        return path
            .rsplit('.')
            .next()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            && path.contains('.');
    }

    if filter.contains('*') {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        return glob_match(file_name, filter);
    }

    path.contains(filter)
}

fn glob_match(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            let Some(pos) = rest.find(part) else {
                return false;
            };
            rest = &rest[pos + part.len()..];
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_finds_files_relative_to_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.c"), "int main() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let files = scan_source_files(dir.path().to_str().unwrap(), "").unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/main.c"]);
        assert_eq!(files[0].index, 1);
        assert_eq!(files[1].index, 2);
    }

    #[test]
    fn test_scan_applies_extension_filter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::write(dir.path().join("b.h"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = scan_source_files(dir.path().to_str().unwrap(), "*.c").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.c");
    }

    #[test]
    fn test_scan_skips_svn_admin_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".svn")).unwrap();
        fs::write(dir.path().join(".svn/entries"), "12").unwrap();
        fs::write(dir.path().join("real.c"), "").unwrap();

        let files = scan_source_files(dir.path().to_str().unwrap(), "").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "real.c");
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let err = scan_source_files("/definitely/not/here", "").unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_matches_filter_empty_matches_all() {
        assert!(matches_filter("any/path.rs", ""));
        assert!(matches_filter("any/path.rs", "   "));
    }

    #[test]
    fn test_matches_filter_extension() {
        assert!(matches_filter("src/main.c", "*.c"));
        assert!(matches_filter("src/MAIN.C", "*.c"));
        assert!(!matches_filter("src/main.cpp", "*.c"));
        assert!(!matches_filter("Makefile", "*.c"));
    }

    #[test]
    fn test_matches_filter_glob_on_file_name() {
        assert!(matches_filter("src/test_parser.c", "test_*"));
        assert!(!matches_filter("src/parser_test.c", "test_*"));
        assert!(matches_filter("src/parser_test.c", "*_test.c"));
    }

    #[test]
    fn test_matches_filter_substring() {
        assert!(matches_filter("src/network/socket.c", "network"));
        assert!(!matches_filter("src/main.c", "network"));
    }

    #[test]
    fn test_glob_match_middle_segments() {
        assert!(glob_match("foo_bar_baz", "foo*baz"));
        assert!(glob_match("foo_bar_baz", "*bar*"));
        assert!(!glob_match("foo_bar", "foo*baz"));
    }
}

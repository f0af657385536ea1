use std::fs;
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::ai_client::ReviewResult;
use crate::errors::ReportError;

/// Review outcome for one file, as rendered in the report.
#[derive(Debug, Clone)]
pub struct FileReview {
    pub file_name: String,
    pub status: String,
    /// Revision the change belongs to (online mode only).
    pub revision: Option<u64>,
    /// The diff or content that was submitted for review.
    pub diff: String,
    pub result: Option<ReviewResult>,
    pub error: Option<String>,
}

impl FileReview {
    pub fn new(file_name: &str, status: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: status.to_string(),
            revision: None,
            diff: String::new(),
            result: None,
            error: None,
        }
    }
}

/// A full review run, ready to be rendered.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub work_dir: String,
    pub reviews: Vec<FileReview>,
}

impl Report {
    pub fn new(title: &str, work_dir: &str) -> Self {
        Self {
            title: title.to_string(),
            generated_at: Local::now(),
            work_dir: work_dir.to_string(),
            reviews: Vec::new(),
        }
    }
}

/// Renders the report and writes it to a timestamped file under `output_dir`.
/// Returns the path of the written file.
pub fn generate_html(report: &Report, output_dir: &str) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir)
        .map_err(|e| ReportError::OutputDir(output_dir.to_string(), e))?;

    let filename = format!(
        "review_report_{}.html",
        report.generated_at.format("%Y%m%d_%H%M%S")
    );
    let path = PathBuf::from(output_dir).join(filename);

    let html = render_html(report);
    fs::write(&path, html)
        .map_err(|e| ReportError::FileWrite(path.to_string_lossy().to_string(), e))?;

    debug!("Report written to {}", path.display());
    Ok(path)
}

/// Opens a file or URL with the platform's default handler.
pub fn open_in_browser(target: &str) -> Result<(), ReportError> {
    let result = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/c", "start", "", target]).spawn()
    } else if cfg!(target_os = "macos") {
        Command::new("open").arg(target).spawn()
    } else {
        Command::new("xdg-open").arg(target).spawn()
    };

    result.map(|_| ()).map_err(ReportError::BrowserSpawn)
}

// --- rendering ---

struct Summary {
    total: usize,
    reviewed: usize,
    failed: usize,
    avg_score: i32,
}

fn summarize(report: &Report) -> Summary {
    let mut reviewed = 0;
    let mut failed = 0;
    let mut total_score = 0;
    let mut score_count = 0;

    for review in &report.reviews {
        if review.error.is_some() {
            failed += 1;
        } else if let Some(result) = &review.result {
            reviewed += 1;
            if let Some(data) = &result.review {
                if data.score > 0 {
                    total_score += data.score;
                    score_count += 1;
                }
            }
        }
    }

    Summary {
        total: report.reviews.len(),
        reviewed,
        failed,
        avg_score: if score_count > 0 {
            total_score / score_count
        } else {
            0
        },
    }
}

fn score_class(score: i32) -> &'static str {
    if score >= 80 {
        "high"
    } else if score >= 60 {
        "medium"
    } else {
        "low"
    }
}

fn severity_class(severity: &str) -> &'static str {
    match severity {
        "high" => "deleted",
        "low" => "new",
        _ => "modified",
    }
}

fn severity_label(severity: &str) -> String {
    match severity {
        "high" => "High".to_string(),
        "medium" => "Medium".to_string(),
        "low" => "Low".to_string(),
        other => other.to_string(),
    }
}

fn status_class(status: &str) -> &'static str {
    match status {
        "A" => "new",
        "D" => "deleted",
        "?" => "untracked",
        _ => "modified",
    }
}

fn status_label(status: &str) -> String {
    match status {
        "A" => "Added".to_string(),
        "M" => "Modified".to_string(),
        "D" => "Deleted".to_string(),
        "?" => "Unversioned".to_string(),
        other => other.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Serializes the per-file diffs into the JSON blob the diff viewer reads.
fn file_data_json(report: &Report) -> String {
    let entries: Vec<serde_json::Value> = report
        .reviews
        .iter()
        .map(|r| {
            serde_json::json!({
                "fileName": r.file_name,
                "status": r.status,
                "diff": r.diff,
            })
        })
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

fn render_html(report: &Report) -> String {
    let summary = summarize(report);
    let mut out = String::with_capacity(32 * 1024);

    out.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Code Review Report</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            line-height: 1.6; color: #333; background: #f5f5f5; padding: 20px;
        }
        .container {
            max-width: 1200px; margin: 0 auto; background: white;
            border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); overflow: hidden;
        }
        .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; }
        .header h1 { font-size: 28px; margin-bottom: 10px; }
        .header .meta { opacity: 0.9; font-size: 14px; }
        .summary {
            padding: 20px 30px; background: #f8f9fa; border-bottom: 1px solid #e9ecef;
            display: flex; justify-content: space-between; align-items: center;
        }
        .summary-stats { display: flex; gap: 30px; }
        .summary-item { font-size: 14px; }
        .summary-item strong { color: #667eea; }
        .toggle-all-btn {
            padding: 8px 20px; background: #667eea; color: white; border: none;
            border-radius: 5px; cursor: pointer; font-size: 14px;
        }
        .file-card { border-bottom: 1px solid #e9ecef; }
        .file-header {
            padding: 16px 30px; cursor: pointer; display: flex;
            justify-content: space-between; align-items: center; gap: 10px;
        }
        .file-header:hover { background: #f8f9fa; }
        .file-title { font-weight: 600; font-size: 15px; word-break: break-all; }
        .file-badges { display: flex; gap: 8px; align-items: center; flex-shrink: 0; }
        .badge { padding: 2px 10px; border-radius: 10px; font-size: 12px; font-weight: 600; }
        .badge.new { background: #d4edda; color: #155724; }
        .badge.modified { background: #fff3cd; color: #856404; }
        .badge.deleted { background: #f8d7da; color: #721c24; }
        .badge.untracked { background: #e2e3e5; color: #41464b; }
        .score { padding: 2px 10px; border-radius: 10px; font-size: 12px; font-weight: 700; }
        .score.high { background: #d4edda; color: #155724; }
        .score.medium { background: #fff3cd; color: #856404; }
        .score.low { background: #f8d7da; color: #721c24; }
        .risk-flag { color: #dc3545; font-size: 12px; font-weight: 700; }
        .file-body { display: none; padding: 0 30px 20px; }
        .file-card.open .file-body { display: block; }
        .section-title { font-size: 13px; text-transform: uppercase; color: #888; margin: 14px 0 6px; }
        .issue { border-left: 3px solid #e9ecef; padding: 8px 12px; margin-bottom: 8px; background: #f8f9fa; }
        .issue-title { font-weight: 600; font-size: 14px; }
        .issue-desc, .issue-suggestion { font-size: 13px; color: #555; margin-top: 4px; }
        .error-box { background: #f8d7da; color: #721c24; padding: 10px 14px; border-radius: 5px; font-size: 13px; }
        ul.plain { padding-left: 20px; font-size: 14px; }
        .diff-btn {
            padding: 4px 12px; background: transparent; color: #667eea;
            border: 1px solid #667eea; border-radius: 5px; cursor: pointer; font-size: 12px;
        }
        .diff-view {
            display: none; margin-top: 10px; background: #282c34; color: #abb2bf;
            padding: 14px; border-radius: 5px; overflow-x: auto;
            font-family: "SF Mono", Menlo, Consolas, monospace; font-size: 12px; white-space: pre;
        }
        .footer { padding: 16px 30px; color: #999; font-size: 12px; text-align: center; }
    </style>
</head>
<body>
<div class="container">
"#,
    );

    // Header
    out.push_str(&format!(
        "    <div class=\"header\">\n        <h1>{}</h1>\n        <div class=\"meta\">Generated {} &middot; {}</div>\n    </div>\n",
        escape_html(&report.title),
        report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        escape_html(&report.work_dir),
    ));

    // Summary bar
    out.push_str(&format!(
        r#"    <div class="summary">
        <div class="summary-stats">
            <div class="summary-item">Files: <strong>{}</strong></div>
            <div class="summary-item">Reviewed: <strong>{}</strong></div>
            <div class="summary-item">Failed: <strong>{}</strong></div>
            <div class="summary-item">Average score: <strong>{}</strong></div>
        </div>
        <button class="toggle-all-btn" onclick="toggleAll()">Expand / collapse all</button>
    </div>
"#,
        summary.total, summary.reviewed, summary.failed, summary.avg_score
    ));

    for (i, review) in report.reviews.iter().enumerate() {
        render_file_card(&mut out, i, review);
    }

    out.push_str("    <div class=\"footer\">svnie code review report</div>\n</div>\n");

    // Diff data and the viewer script
    out.push_str(&format!(
        r#"<script>
const fileData = {};
function toggleCard(i) {{
    document.getElementById('card-' + i).classList.toggle('open');
}}
function toggleAll() {{
    const cards = document.querySelectorAll('.file-card');
    const anyClosed = Array.from(cards).some(c => !c.classList.contains('open'));
    cards.forEach(c => c.classList.toggle('open', anyClosed));
}}
function toggleDiff(event, i) {{
    event.stopPropagation();
    const view = document.getElementById('diff-' + i);
    if (view.style.display === 'block') {{
        view.style.display = 'none';
        return;
    }}
    view.textContent = fileData[i] ? fileData[i].diff : '';
    view.style.display = 'block';
}}
</script>
</body>
</html>
"#,
        file_data_json(report)
    ));

    out
}

fn render_file_card(out: &mut String, index: usize, review: &FileReview) {
    let display_name = match review.revision {
        Some(rev) => format!("{} (r{})", review.file_name, rev),
        None => review.file_name.clone(),
    };

    out.push_str(&format!(
        "    <div class=\"file-card\" id=\"card-{}\">\n        <div class=\"file-header\" onclick=\"toggleCard({})\">\n            <div class=\"file-title\">{}</div>\n            <div class=\"file-badges\">\n",
        index,
        index,
        escape_html(&display_name)
    ));

    out.push_str(&format!(
        "                <span class=\"badge {}\">{}</span>\n",
        status_class(&review.status),
        escape_html(&status_label(&review.status))
    ));

    let mut high_risk = false;
    if let Some(data) = review.result.as_ref().and_then(|r| r.review.as_ref()) {
        high_risk = data.score < 60 || data.issues.iter().any(|i| i.severity == "high");
        out.push_str(&format!(
            "                <span class=\"score {}\">{}</span>\n",
            score_class(data.score),
            data.score
        ));
    }
    if high_risk {
        out.push_str("                <span class=\"risk-flag\">HIGH RISK</span>\n");
    }
    if !review.diff.is_empty() {
        out.push_str(&format!(
            "                <button class=\"diff-btn\" onclick=\"toggleDiff(event, {})\">Diff</button>\n",
            index
        ));
    }

    out.push_str("            </div>\n        </div>\n        <div class=\"file-body\">\n");

    if let Some(error) = &review.error {
        out.push_str(&format!(
            "            <div class=\"error-box\">{}</div>\n",
            escape_html(error)
        ));
    } else if let Some(result) = &review.result {
        match &result.review {
            Some(data) => {
                if !data.summary.is_empty() {
                    out.push_str(&format!(
                        "            <div class=\"section-title\">Summary</div>\n            <p>{}</p>\n",
                        escape_html(&data.summary)
                    ));
                }
                if !data.issues.is_empty() {
                    out.push_str("            <div class=\"section-title\">Issues</div>\n");
                    for issue in &data.issues {
                        out.push_str(&format!(
                            "            <div class=\"issue\">\n                <div class=\"issue-title\"><span class=\"badge {}\">{}</span> {}</div>\n                <div class=\"issue-desc\">{}</div>\n                <div class=\"issue-suggestion\">Suggestion: {}</div>\n            </div>\n",
                            severity_class(&issue.severity),
                            escape_html(&severity_label(&issue.severity)),
                            escape_html(&issue.title),
                            escape_html(&issue.description),
                            escape_html(&issue.suggestion),
                        ));
                    }
                }
                if !data.strengths.is_empty() {
                    out.push_str("            <div class=\"section-title\">Strengths</div>\n            <ul class=\"plain\">\n");
                    for s in &data.strengths {
                        out.push_str(&format!("                <li>{}</li>\n", escape_html(s)));
                    }
                    out.push_str("            </ul>\n");
                }
                if !data.recommendations.is_empty() {
                    out.push_str("            <div class=\"section-title\">Recommendations</div>\n            <ul class=\"plain\">\n");
                    for r in &data.recommendations {
                        out.push_str(&format!("                <li>{}</li>\n", escape_html(r)));
                    }
                    out.push_str("            </ul>\n");
                }
            }
            None => {
                // No structured data; show the raw model reply.
                out.push_str(&format!(
                    "            <div class=\"section-title\">Review</div>\n            <p>{}</p>\n",
                    escape_html(&result.content)
                ));
            }
        }
    }

    out.push_str(&format!(
        "            <div class=\"diff-view\" id=\"diff-{}\"></div>\n        </div>\n    </div>\n",
        index
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::{Issue, ReviewJson, ReviewResult};
    use tempfile::tempdir;

    fn sample_report() -> Report {
        let mut report = Report::new("SVN Code Review Report", "/work/copy");
        let mut ok = FileReview::new("src/main.c", "M");
        ok.diff = "@@ -1 +1 @@\n-old\n+new".to_string();
        ok.result = Some(ReviewResult {
            file_name: "src/main.c".to_string(),
            content: "{}".to_string(),
            review: Some(ReviewJson {
                summary: "Solid change".to_string(),
                score: 88,
                issues: vec![Issue {
                    severity: "low".to_string(),
                    title: "Nit".to_string(),
                    description: "Variable naming".to_string(),
                    suggestion: "Rename x".to_string(),
                }],
                strengths: vec!["Has tests".to_string()],
                recommendations: vec!["Add docs".to_string()],
            }),
        });

        let mut failed = FileReview::new("src/<bad>.c", "A");
        failed.error = Some("read failed: <oops>".to_string());

        report.reviews.push(ok);
        report.reviews.push(failed);
        report
    }

    #[test]
    fn test_generate_html_writes_timestamped_file() {
        let dir = tempdir().unwrap();
        let report = sample_report();
        let path = generate_html(&report, dir.path().to_str().unwrap()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("review_report_"));
        assert!(name.ends_with(".html"));
        assert!(path.exists());
    }

    #[test]
    fn test_render_html_contains_review_sections() {
        let html = render_html(&sample_report());
        assert!(html.contains("SVN Code Review Report"));
        assert!(html.contains("Solid change"));
        assert!(html.contains("Has tests"));
        assert!(html.contains("Add docs"));
        assert!(html.contains("Modified"));
    }

    #[test]
    fn test_render_html_escapes_interpolated_text() {
        let html = render_html(&sample_report());
        assert!(html.contains("src/&lt;bad&gt;.c"));
        assert!(html.contains("read failed: &lt;oops&gt;"));
        assert!(!html.contains("read failed: <oops>"));
    }

    #[test]
    fn test_render_html_marks_high_risk() {
        let mut report = Report::new("t", "w");
        let mut review = FileReview::new("bad.c", "M");
        review.result = Some(ReviewResult {
            file_name: "bad.c".to_string(),
            content: "{}".to_string(),
            review: Some(ReviewJson {
                score: 40,
                ..Default::default()
            }),
        });
        report.reviews.push(review);

        let html = render_html(&report);
        assert!(html.contains("HIGH RISK"));
        assert!(html.contains("score low"));
    }

    #[test]
    fn test_summarize_counts_and_average() {
        let summary = summarize(&sample_report());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.reviewed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.avg_score, 88);
    }

    #[test]
    fn test_summarize_empty_report() {
        let summary = summarize(&Report::new("t", "w"));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_score, 0);
    }

    #[test]
    fn test_score_and_status_classes() {
        assert_eq!(score_class(95), "high");
        assert_eq!(score_class(80), "high");
        assert_eq!(score_class(60), "medium");
        assert_eq!(score_class(59), "low");

        assert_eq!(status_class("A"), "new");
        assert_eq!(status_class("M"), "modified");
        assert_eq!(status_class("D"), "deleted");
        assert_eq!(status_class("?"), "untracked");
        assert_eq!(status_label("?"), "Unversioned");
        assert_eq!(status_label("R"), "R");
    }

    #[test]
    fn test_file_data_json_is_valid_json() {
        let json = file_data_json(&sample_report());
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["fileName"], "src/main.c");
    }

    #[test]
    fn test_revision_shown_in_display_name() {
        let mut report = Report::new("t", "w");
        let mut review = FileReview::new("a.c", "M");
        review.revision = Some(142);
        report.reviews.push(review);
        assert!(render_html(&report).contains("a.c (r142)"));
    }
}

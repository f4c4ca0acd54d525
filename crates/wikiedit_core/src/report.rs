use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use similar::TextDiff;

use crate::driver::{PageOutcome, RunReport};

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    dry_run: bool,
    summary: &'a str,
    total: usize,
    updated: usize,
    unchanged: usize,
    failed: usize,
    request_count: usize,
    pages: Vec<PageEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct PageEntry<'a> {
    title: &'a str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision_id: Option<i64>,
}

/// Unified diff between the fetched and the transformed content.
pub fn render_diff(title: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{title}"), &format!("b/{title}"))
        .to_string()
}

pub fn report_json(report: &RunReport) -> Result<serde_json::Value> {
    let file = ReportFile {
        dry_run: report.dry_run(),
        summary: report.summary(),
        total: report.len(),
        updated: report.updated(),
        unchanged: report.unchanged(),
        failed: report.failed(),
        request_count: report.request_count(),
        pages: report
            .pages()
            .iter()
            .map(|page| {
                let (failure, reason, revision_id) = match &page.outcome {
                    PageOutcome::Unchanged => (None, None, None),
                    PageOutcome::Updated { revision_id, .. } => (None, None, *revision_id),
                    PageOutcome::Failed(failure) => {
                        (Some(failure.kind.as_str()), Some(failure.reason.as_str()), None)
                    }
                };
                PageEntry {
                    title: &page.title,
                    outcome: page.outcome.label(),
                    failure,
                    reason,
                    revision_id,
                }
            })
            .collect(),
    };
    serde_json::to_value(file).context("failed to serialize run report")
}

pub fn write_json_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let rendered = serde_json::to_string_pretty(&report_json(report)?)
        .context("failed to render run report")?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote run report");
    Ok(())
}

/// `key: value` lines describing the run, followed by one line per page.
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        format!("mode: {}", if report.dry_run() { "dry-run" } else { "live" }),
        format!("summary: {}", report.summary()),
        format!("pages.total: {}", report.len()),
        format!("pages.updated: {}", report.updated()),
        format!("pages.unchanged: {}", report.unchanged()),
        format!("pages.failed: {}", report.failed()),
        format!("request_count: {}", report.request_count()),
    ];
    for page in report.pages() {
        match &page.outcome {
            PageOutcome::Failed(failure) => lines.push(format!(
                "page.{}: {} ({}: {})",
                page.outcome.label(),
                page.title,
                failure.kind.as_str(),
                failure.reason
            )),
            outcome => lines.push(format!("page.{}: {}", outcome.label(), page.title)),
        }
    }
    lines
}

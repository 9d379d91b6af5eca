use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table;
use ridetrace_core::pipeline::{FileStatus, RunReport};

pub fn render_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["file", "status", "rows", "detail"]);

    for entry in &report.reports {
        let status = match entry.status {
            FileStatus::Rendered => "rendered",
            FileStatus::Failed => "failed",
        };
        let rows = entry
            .rows
            .map(|rows| rows.to_string())
            .unwrap_or_else(|| "-".to_string());
        let detail = match (&entry.artifact, &entry.error) {
            (Some(artifact), _) => artifact.display().to_string(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        table.add_row(vec![entry.path.display().to_string(), status.to_string(), rows, detail]);
    }

    table
}

pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(report).context("failed to serialize run report")?;
    fs::write(path, bytes)
        .with_context(|| format!("failed to write run report to {}", path.display()))
}

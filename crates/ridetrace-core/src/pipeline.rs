use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ridetrace_parser::{reconstruct, ColumnNames, CsvTabularSource, TabularSource};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, warn, Level};

use crate::error::{PipelineError, Result};
use crate::extract::{extract_archive, ExtractedDataset};
use crate::fetch::{fetch_archive, RemoteSource};
use crate::locate::locate_batch_files;
use crate::render::{chart_path_for, render_chart, ChartBackend, PlottersPng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Rendered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Parse,
    Render,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub rows: Option<usize>,
    pub artifact: Option<PathBuf>,
    pub stage: Option<FailureStage>,
    pub error: Option<String>,
}

impl FileReport {
    fn rendered(path: &Path, rows: usize, artifact: PathBuf) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Rendered,
            rows: Some(rows),
            artifact: Some(artifact),
            stage: None,
            error: None,
        }
    }

    fn failed(path: &Path, stage: FailureStage, rows: Option<usize>, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            rows,
            artifact: None,
            stage: Some(stage),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub reports: Vec<FileReport>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn rendered(&self) -> usize {
        self.count(FileStatus::Rendered)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == status)
            .count()
    }
}

/// Shared, read-only inputs for processing the batch files of one dataset.
#[derive(Clone)]
pub struct BatchContext {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub columns: ColumnNames,
    pub source: Arc<dyn TabularSource>,
    pub backend: Arc<dyn ChartBackend>,
}

impl BatchContext {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
            columns: ColumnNames::default(),
            source: Arc::new(CsvTabularSource::default()),
            backend: Arc::new(PlottersPng::default()),
        }
    }

    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn TabularSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ChartBackend>) -> Self {
        self.backend = backend;
        self
    }
}

impl std::fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("root", &self.root)
            .field("output_dir", &self.output_dir)
            .field("columns", &self.columns)
            .field("source", &self.source.name())
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Reconstructs and charts one batch file. Failures are captured in the
/// returned report so sibling files are unaffected.
pub fn process_batch_file(ctx: &BatchContext, relative: &Path) -> FileReport {
    let full_path = ctx.root.join(relative);

    let series = match reconstruct(&full_path, ctx.source.as_ref(), &ctx.columns) {
        Ok(series) => series,
        Err(err) => {
            warn!(path = %relative.display(), error = %err, "skipping batch file");
            return FileReport::failed(relative, FailureStage::Parse, None, err.to_string());
        }
    };

    if tracing::enabled!(Level::DEBUG) {
        match series.to_dataframe() {
            Ok(df) => debug!(path = %relative.display(), "reconstructed time series:\n{df}"),
            Err(err) => debug!(path = %relative.display(), error = %err, "could not tabulate series"),
        }
    }

    let output = chart_path_for(&full_path, &ctx.output_dir);
    match render_chart(&series, &output, ctx.backend.as_ref()) {
        Ok(artifact) => FileReport::rendered(relative, series.len(), artifact.path),
        Err(err) => {
            warn!(path = %relative.display(), error = %err, "chart rendering failed");
            FileReport::failed(
                relative,
                FailureStage::Render,
                Some(series.len()),
                err.to_string(),
            )
        }
    }
}

/// Processes `files` with at most `workers` in flight. Reports come back
/// sorted by path whatever order the work finished in. A task that panics
/// is reported as a failure of its own file.
pub async fn process_batch(
    ctx: Arc<BatchContext>,
    files: Vec<PathBuf>,
    workers: usize,
) -> Result<RunReport> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut in_flight: HashMap<Id, PathBuf> = HashMap::with_capacity(files.len());

    for relative in files {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|err| PipelineError::Task(err.to_string()))?;
        let ctx = Arc::clone(&ctx);
        let task_path = relative.clone();
        let handle = tasks.spawn_blocking(move || {
            let _permit = permit;
            process_batch_file(&ctx, &task_path)
        });
        in_flight.insert(handle.id(), relative);
    }

    let mut reports = Vec::with_capacity(in_flight.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(err) => {
                let path = in_flight.remove(&err.id()).unwrap_or_default();
                let message = task_failure_message(err);
                warn!(path = %path.display(), error = %message, "batch file task aborted");
                reports.push(FileReport::failed(
                    &path,
                    FailureStage::Render,
                    None,
                    message,
                ));
            }
        }
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));

    let report = RunReport { reports };
    info!(
        total = report.total(),
        rendered = report.rendered(),
        failed = report.failed(),
        "batch processing finished"
    );
    Ok(report)
}

fn task_failure_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("panicked: {detail}")
}

/// Locates batch files under the context root and processes them.
/// `limit` caps how many of the (sorted) matches are processed.
pub async fn render_dataset(
    ctx: Arc<BatchContext>,
    pattern: &str,
    workers: usize,
    limit: Option<usize>,
) -> Result<RunReport> {
    let mut files = locate_batch_files(&ctx.root, pattern)?;
    if let Some(limit) = limit {
        if files.len() > limit {
            info!(found = files.len(), limit, "limiting batch files processed");
            files.truncate(limit);
        }
    }
    process_batch(ctx, files, workers).await
}

/// Fetches the archive for `identifier` and extracts it into `destination`.
/// The two steps run strictly one after the other.
pub async fn prepare_dataset(
    client: &reqwest::Client,
    remote: &RemoteSource,
    identifier: &str,
    staging_dir: &Path,
    destination: &Path,
) -> Result<ExtractedDataset> {
    let archive = fetch_archive(client, remote, identifier, staging_dir).await?;
    info!(
        identifier,
        bytes = archive.bytes_written,
        hash = %archive.content_hash,
        "dataset archive downloaded"
    );

    let destination = destination.to_path_buf();
    let dataset = tokio::task::spawn_blocking(move || extract_archive(archive, &destination))
        .await
        .map_err(|err| PipelineError::Task(err.to_string()))??;
    Ok(dataset)
}

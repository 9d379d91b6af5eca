mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ridetrace_core::error::RenderError;
use ridetrace_core::parser::{ColumnNames, CsvTabularSource};
use ridetrace_core::pipeline::{
    process_batch, process_batch_file, render_dataset, BatchContext, FailureStage, FileStatus,
};
use ridetrace_core::render::{ChartBackend, ChartPlan, PlottersPng};

use common::{write_file, GOOD_BATCH};

struct FailingBackend;

impl ChartBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn draw(&self, _plan: &ChartPlan, output: &Path) -> Result<(), RenderError> {
        Err(RenderError::Draw {
            path: output.to_path_buf(),
            message: "disk full".to_string(),
        })
    }
}

fn dataset_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    write_file(&root.path().join("2023_04_01_12_30_00.csv"), GOOD_BATCH.as_bytes());
    write_file(&root.path().join("2023_04_01.csv"), GOOD_BATCH.as_bytes());
    write_file(
        &root.path().join("2023_04_02_09_15_00.csv"),
        b"secs,km\n0,0\n1,0.01\n",
    );
    root
}

#[test]
fn single_file_is_reconstructed_and_charted() {
    let root = dataset_root();
    let out = tempfile::tempdir().expect("tempdir");
    let ctx = BatchContext::new(root.path(), out.path());

    let report = process_batch_file(&ctx, Path::new("2023_04_01_12_30_00.csv"));
    assert_eq!(report.status, FileStatus::Rendered);
    assert_eq!(report.rows, Some(4));
    let artifact = report.artifact.expect("artifact");
    assert_eq!(artifact, out.path().join("2023_04_01_12_30_00.png"));
    assert!(artifact.exists());
}

#[test]
fn render_failure_is_reported_with_row_count() {
    let root = dataset_root();
    let out = tempfile::tempdir().expect("tempdir");
    let ctx = BatchContext::new(root.path(), out.path()).with_backend(Arc::new(FailingBackend));

    let report = process_batch_file(&ctx, Path::new("2023_04_01_12_30_00.csv"));
    assert_eq!(report.status, FileStatus::Failed);
    assert_eq!(report.stage, Some(FailureStage::Render));
    assert_eq!(report.rows, Some(4));
    assert!(report.error.expect("error").contains("disk full"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_file_does_not_stop_its_siblings() {
    let root = dataset_root();
    let out = tempfile::tempdir().expect("tempdir");
    let ctx = Arc::new(BatchContext::new(root.path(), out.path()));

    let files = vec![
        PathBuf::from("2023_04_02_09_15_00.csv"),
        PathBuf::from("2023_04_01_12_30_00.csv"),
        PathBuf::from("2023_04_01.csv"),
    ];
    let report = process_batch(ctx, files, 2).await.expect("batch");

    assert_eq!(report.total(), 3);
    assert_eq!(report.rendered(), 1);
    assert_eq!(report.failed(), 2);

    let paths: Vec<&Path> = report.reports.iter().map(|r| r.path.as_path()).collect();
    assert_eq!(
        paths,
        vec![
            Path::new("2023_04_01.csv"),
            Path::new("2023_04_01_12_30_00.csv"),
            Path::new("2023_04_02_09_15_00.csv"),
        ]
    );

    let bad_name = &report.reports[0];
    assert_eq!(bad_name.stage, Some(FailureStage::Parse));
    assert!(bad_name.error.as_deref().unwrap_or_default().contains("expected 6"));

    let missing_alt = &report.reports[2];
    assert_eq!(missing_alt.stage, Some(FailureStage::Parse));
    assert!(missing_alt.error.as_deref().unwrap_or_default().contains("alt"));

    assert!(out.path().join("2023_04_01_12_30_00.png").exists());
    assert!(!out.path().join("2023_04_01.png").exists());
}

#[tokio::test]
async fn render_dataset_applies_limit_to_sorted_matches() {
    let root = dataset_root();
    let out = tempfile::tempdir().expect("tempdir");
    let ctx = Arc::new(BatchContext::new(root.path(), out.path()));

    let report = render_dataset(ctx, "*.csv", 1, Some(2)).await.expect("run");
    assert_eq!(report.total(), 2);
    assert_eq!(report.reports[0].path, PathBuf::from("2023_04_01.csv"));
    assert_eq!(report.reports[1].path, PathBuf::from("2023_04_01_12_30_00.csv"));
}

#[tokio::test]
async fn bad_pattern_aborts_before_processing() {
    let root = dataset_root();
    let out = tempfile::tempdir().expect("tempdir");
    let ctx = Arc::new(BatchContext::new(root.path(), out.path()));

    let err = render_dataset(ctx, "***.csv", 1, None).await.unwrap_err();
    assert!(matches!(
        err,
        ridetrace_core::error::PipelineError::Discovery(_)
    ));
    assert_eq!(std::fs::read_dir(out.path()).expect("read out").count(), 0);
}

#[test]
fn custom_source_and_columns_are_used() {
    let root = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    write_file(
        &root.path().join("2023_07_04_18_00_00.csv"),
        b"t;dist;elev\n0;0.0;12.0\n30;0.2;14.5\n60;0.4;13.0\n",
    );

    let ctx = BatchContext::new(root.path(), out.path())
        .with_source(Arc::new(CsvTabularSource { delimiter: b';' }))
        .with_columns(ColumnNames {
            elapsed: "t".to_string(),
            distance: "dist".to_string(),
            altitude: "elev".to_string(),
        });

    let report = process_batch_file(&ctx, Path::new("2023_07_04_18_00_00.csv"));
    assert_eq!(report.status, FileStatus::Rendered, "{:?}", report.error);
    assert_eq!(report.rows, Some(3));
    assert!(out.path().join("2023_07_04_18_00_00.png").exists());
}

/// Delegates to the PNG backend but panics on one chosen output.
struct PanicsOn(&'static str);

impl ChartBackend for PanicsOn {
    fn name(&self) -> &'static str {
        "panics-on"
    }

    fn draw(&self, plan: &ChartPlan, output: &Path) -> Result<(), RenderError> {
        if output.ends_with(self.0) {
            panic!("backend blew up on {}", output.display());
        }
        PlottersPng::default().draw(plan, output)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_task_is_reported_and_siblings_survive() {
    let root = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");
    write_file(&root.path().join("2023_04_01_12_30_00.csv"), GOOD_BATCH.as_bytes());
    write_file(&root.path().join("2023_04_03_08_00_00.csv"), GOOD_BATCH.as_bytes());
    write_file(&root.path().join("2023_04_01.csv"), GOOD_BATCH.as_bytes());

    let ctx = BatchContext::new(root.path(), out.path())
        .with_backend(Arc::new(PanicsOn("2023_04_03_08_00_00.png")));
    let files = vec![
        PathBuf::from("2023_04_03_08_00_00.csv"),
        PathBuf::from("2023_04_01.csv"),
        PathBuf::from("2023_04_01_12_30_00.csv"),
    ];

    let report = process_batch(Arc::new(ctx), files, 2).await.expect("batch");

    assert_eq!(report.total(), 3);
    assert_eq!(report.rendered(), 1);
    assert_eq!(report.failed(), 2);

    let panicked = &report.reports[2];
    assert_eq!(panicked.path, PathBuf::from("2023_04_03_08_00_00.csv"));
    assert_eq!(panicked.status, FileStatus::Failed);
    assert_eq!(panicked.stage, Some(FailureStage::Render));
    assert!(panicked
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("backend blew up"));

    assert_eq!(report.reports[0].stage, Some(FailureStage::Parse));
    assert_eq!(report.reports[1].status, FileStatus::Rendered);
    assert!(out.path().join("2023_04_01_12_30_00.png").exists());
}

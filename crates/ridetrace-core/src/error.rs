// crates/ridetrace-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("dataset identifier '{identifier}' is empty or contains a path separator")]
    InvalidIdentifier { identifier: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed writing staging file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("destination {} already exists", .path.display())]
    DestinationExists { path: PathBuf },

    #[error("failed to create destination {}: {source}", .path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open archive {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to open archive entry #{index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry '{name}' would be written outside the destination")]
    UnsafeEntry { name: String },

    #[error("failed to extract entry '{entry}' to {}: {source}", .path.display())]
    Write {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid discovery pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("discovery root {} is not valid UTF-8", .path.display())]
    NonUtf8Root { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("output directory for {} does not exist", .path.display())]
    OutputDirectory { path: PathBuf },

    #[error("chart font '{family}' could not be loaded")]
    Font { family: String },

    #[error("failed to draw chart {}: {message}", .path.display())]
    Draw { path: PathBuf, message: String },
}

/// Run-level failures. Any of these stops the run before (or instead of)
/// per-file processing.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

use std::path::{Path, PathBuf};
use std::time::Duration;

use blake3::Hasher;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::NetworkError;

pub const DEFAULT_ARCHIVE_SUFFIX: &str = ".zip";

/// Where dataset archives live: `<base_url><identifier><archive_suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub base_url: String,
    pub archive_suffix: String,
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string(),
        }
    }

    pub fn archive_url(&self, identifier: &str) -> String {
        format!("{}{}{}", self.base_url, identifier, self.archive_suffix)
    }

    pub fn staging_file_name(&self, identifier: &str) -> String {
        format!("{identifier}{}", self.archive_suffix)
    }
}

/// A fully downloaded archive sitting in local staging storage.
///
/// Extraction consumes the handle and removes the staging file once every
/// entry has been written. If extraction never happens, or fails, the file
/// stays where it is.
#[derive(Debug)]
pub struct DatasetArchive {
    pub identifier: String,
    pub url: String,
    pub staging_path: PathBuf,
    pub bytes_written: u64,
    pub content_hash: String,
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, NetworkError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(NetworkError::Client)
}

/// Downloads the archive for `identifier` into `staging_dir`.
///
/// The call only succeeds once the whole body is on disk. A body shorter than
/// its declared Content-Length surfaces from the HTTP client as a
/// [`NetworkError::Request`]. A partially written staging file may remain
/// after an error; the caller decides what to do with it.
pub async fn fetch_archive(
    client: &reqwest::Client,
    remote: &RemoteSource,
    identifier: &str,
    staging_dir: &Path,
) -> Result<DatasetArchive, NetworkError> {
    validate_identifier(identifier)?;

    let url = remote.archive_url(identifier);
    let staging_path = staging_dir.join(remote.staging_file_name(identifier));
    info!(%url, staging = %staging_path.display(), "fetching dataset archive");

    let request_err = |source: reqwest::Error| NetworkError::Request {
        url: url.clone(),
        source,
    };

    let mut response = client.get(&url).send().await.map_err(request_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let io_err = |source: std::io::Error| NetworkError::Io {
        path: staging_path.clone(),
        source,
    };

    let mut hasher = Hasher::new();
    let mut received = 0u64;
    {
        let mut file = File::create(&staging_path).await.map_err(io_err)?;
        while let Some(chunk) = response.chunk().await.map_err(request_err)? {
            file.write_all(&chunk).await.map_err(io_err)?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
    }

    let content_hash = hasher.finalize().to_hex().to_string();
    debug!(%url, bytes = received, hash = %content_hash, "archive download complete");

    Ok(DatasetArchive {
        identifier: identifier.to_string(),
        url,
        staging_path,
        bytes_written: received,
        content_hash,
    })
}

fn validate_identifier(identifier: &str) -> Result<(), NetworkError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty()
        || trimmed != identifier
        || identifier.contains(['/', '\\'])
        || identifier == "."
        || identifier == ".."
    {
        return Err(NetworkError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_concatenates_base_identifier_and_suffix() {
        let remote = RemoteSource::new("http://example.test/data/");
        assert_eq!(
            remote.archive_url("000db8a2-a1f6-42bd-8228-fdfae659f476"),
            "http://example.test/data/000db8a2-a1f6-42bd-8228-fdfae659f476.zip"
        );
    }

    #[test]
    fn identifiers_with_separators_are_rejected() {
        for bad in ["", "  ", "../etc", "a/b", "a\\b", "..", " id"] {
            assert!(
                matches!(
                    validate_identifier(bad),
                    Err(NetworkError::InvalidIdentifier { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_identifier("000db8a2-a1f6").is_ok());
    }
}

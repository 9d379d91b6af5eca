use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::ArchiveError;
use crate::fetch::DatasetArchive;

/// Directory tree mirroring the archive entries, owned by the caller.
#[derive(Debug, Clone)]
pub struct ExtractedDataset {
    pub root: PathBuf,
    /// File entries relative to `root`, in archive order.
    pub entries: Vec<PathBuf>,
}

/// Extracts a downloaded archive and deletes its staging file on success.
pub fn extract_archive(
    archive: DatasetArchive,
    destination: &Path,
) -> Result<ExtractedDataset, ArchiveError> {
    let dataset = extract_zip(&archive.staging_path, destination)?;

    match fs::remove_file(&archive.staging_path) {
        Ok(()) => debug!(path = %archive.staging_path.display(), "removed staging archive"),
        Err(err) => warn!(
            path = %archive.staging_path.display(),
            error = %err,
            "failed to remove staging archive"
        ),
    }

    Ok(dataset)
}

/// Writes every entry of the ZIP at `archive_path` under `destination`.
///
/// `destination` must not exist yet. A failure part way through leaves the
/// entries written so far in place.
pub fn extract_zip(archive_path: &Path, destination: &Path) -> Result<ExtractedDataset, ArchiveError> {
    let file = File::open(archive_path).map_err(|source| ArchiveError::Read {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Open {
            path: archive_path.to_path_buf(),
            source,
        })?;

    create_destination(destination)?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| ArchiveError::Entry { index, source })?;
        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ArchiveError::UnsafeEntry { name: name.clone() })?;
        let target = destination.join(&relative);

        let write_err = |source: io::Error| ArchiveError::Write {
            entry: name.clone(),
            path: target.clone(),
            source,
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(write_err)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut out = File::create(&target).map_err(write_err)?;
        let bytes = io::copy(&mut entry, &mut out).map_err(write_err)?;
        debug!(entry = %name, bytes, "extracted archive entry");

        entries.push(relative);
    }

    info!(
        archive = %archive_path.display(),
        destination = %destination.display(),
        entries = entries.len(),
        "archive extracted"
    );

    Ok(ExtractedDataset {
        root: destination.to_path_buf(),
        entries,
    })
}

fn create_destination(destination: &Path) -> Result<(), ArchiveError> {
    let exists = || ArchiveError::DestinationExists {
        path: destination.to_path_buf(),
    };
    if destination.exists() {
        return Err(exists());
    }

    let create_err = |source: io::Error| ArchiveError::CreateDestination {
        path: destination.to_path_buf(),
        source,
    };
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(create_err)?;
    }
    fs::create_dir(destination).map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            exists()
        } else {
            create_err(err)
        }
    })
}

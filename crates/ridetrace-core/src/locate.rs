use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, info, warn};

use crate::error::DiscoveryError;

pub const DEFAULT_BATCH_PATTERN: &str = "*.csv";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Finds batch files under `root` matching a shell-style `pattern`.
///
/// `*` stays within one directory level; only `**` descends. Returned paths
/// are relative to `root`, sorted and unique. No match is an empty vector,
/// not an error, and unreadable directories met during the walk are skipped.
pub fn locate_batch_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let pattern_err = |message: String| DiscoveryError::Pattern {
        pattern: pattern.to_string(),
        message,
    };

    if pattern.is_empty() {
        return Err(pattern_err("pattern is empty".to_string()));
    }
    if Path::new(pattern).is_absolute() {
        return Err(pattern_err(
            "pattern must be relative to the discovery root".to_string(),
        ));
    }
    Pattern::new(pattern).map_err(|err| pattern_err(err.to_string()))?;

    let root_str = root.to_str().ok_or_else(|| DiscoveryError::NonUtf8Root {
        path: root.to_path_buf(),
    })?;
    let full = PathBuf::from(Pattern::escape(root_str)).join(pattern);
    let full = full.to_str().ok_or_else(|| DiscoveryError::NonUtf8Root {
        path: root.to_path_buf(),
    })?;

    let mut matches = Vec::new();
    for entry in glob_with(full, MATCH_OPTIONS).map_err(|err| pattern_err(err.to_string()))? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(
                    path = %err.path().display(),
                    error = %err.error(),
                    "skipping unreadable path"
                );
                continue;
            }
        };
        let relative = match path.strip_prefix(root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => path,
        };
        matches.push(relative);
    }

    matches.sort();
    matches.dedup();

    if matches.is_empty() {
        info!(root = %root.display(), pattern, "no batch files matched");
    } else {
        debug!(root = %root.display(), pattern, count = matches.len(), "located batch files");
    }

    Ok(matches)
}

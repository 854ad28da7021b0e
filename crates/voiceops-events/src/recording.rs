use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Errors from searching the recording directory
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("cannot search recordings under {}: {source}", .path.display())]
    Search {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("recording search task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Locates call recordings on disk and maps them to public URLs
#[derive(Clone, Debug)]
pub struct RecordingLocator {
    /// Directory searched for recordings
    root: PathBuf,

    /// Public URL prefix for files under `root`
    url_prefix: String,
}

impl RecordingLocator {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Find the single recording whose file name contains `call_id`
    ///
    /// Zero or several matches are both reported as `None`.
    pub fn find(&self, call_id: &str) -> Result<Option<PathBuf>, RecordingError> {
        if call_id.is_empty() {
            return Ok(None);
        }

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                // An unreadable root means nothing can be found
                Err(e) if e.depth() == 0 => {
                    return Err(RecordingError::Search {
                        path: self.root.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable recording entry");
                    continue;
                }
            };

            if entry.file_type().is_file()
                && entry.file_name().to_string_lossy().contains(call_id)
            {
                matches.push(entry.into_path());
            }
        }

        match matches.len() {
            1 => Ok(matches.pop()),
            0 => {
                debug!(call_id, "No recording found");
                Ok(None)
            }
            n => {
                warn!(call_id, matches = n, "Ambiguous recording lookup");
                Ok(None)
            }
        }
    }

    /// Public URL of the recording for `call_id`, empty when none is found
    pub async fn url_for(&self, call_id: &str) -> String {
        let locator = self.clone();
        let id = call_id.to_string();
        let found = tokio::task::spawn_blocking(move || locator.find(&id))
            .await
            .map_err(RecordingError::from)
            .and_then(|r| r);

        match found {
            Ok(Some(path)) => recording_url_for(&self.root, &self.url_prefix, &path),
            Ok(None) => String::new(),
            Err(e) => {
                warn!(call_id, error = %e, "Recording search failed");
                String::new()
            }
        }
    }
}

/// Public URL for a recording found under `root`
pub fn recording_url_for(root: &Path, url_prefix: &str, found: &Path) -> String {
    let root = root.to_string_lossy();
    let found = found.to_string_lossy();
    let relative = found
        .strip_prefix(&*root)
        .unwrap_or(&*found)
        .trim_start_matches('/')
        .trim_end_matches(['\r', '\n']);
    format!("{}{}", url_prefix, relative)
}

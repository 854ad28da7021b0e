use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors from starting a log follower
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("cannot open queue log {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Follows a growing log file from its current end
pub struct LogFollower {
    /// Completed lines in file order
    receiver: mpsc::UnboundedReceiver<String>,

    /// Cancellation token for stopping the reader
    cancel: CancellationToken,

    /// Reader task handle
    task: tokio::task::JoinHandle<()>,
}

impl LogFollower {
    /// Open `path`, seek to its end and start delivering appended lines
    pub async fn start(path: impl Into<PathBuf>, poll_interval: Duration) -> Result<Self, FollowError> {
        let path = path.into();
        let (reader, offset, identity) = open_at(&path, SeekFrom::End(0))
            .await
            .map_err(|source| FollowError::Open {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), offset, "Following queue log");

        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(follow(
            path,
            reader,
            offset,
            identity,
            poll_interval,
            sender,
            cancel.clone(),
        ));

        Ok(Self {
            receiver,
            cancel,
            task,
        })
    }

    /// Receive the next complete line
    pub async fn next_line(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Stop reading the file
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Check if the reader task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for LogFollower {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device and inode of an open file, `None` where the platform has none
type FileId = Option<(u64, u64)>;

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> FileId {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> FileId {
    None
}

async fn open_at(path: &Path, pos: SeekFrom) -> std::io::Result<(BufReader<File>, u64, FileId)> {
    let mut file = File::open(path).await?;
    let identity = file_id(&file.metadata().await?);
    let offset = file.seek(pos).await?;
    Ok((BufReader::new(file), offset, identity))
}

async fn follow(
    path: PathBuf,
    mut reader: BufReader<File>,
    mut offset: u64,
    mut identity: FileId,
    poll_interval: Duration,
    sender: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
) {
    // Bytes of a line whose newline has not been written yet
    let mut pending: Vec<u8> = Vec::new();

    while !cancel.is_cancelled() {
        match reader.read_until(b'\n', &mut pending).await {
            Ok(0) => {
                if let Some(reason) = rotated(&path, offset, identity).await {
                    match open_at(&path, SeekFrom::Start(0)).await {
                        Ok((fresh, start, id)) => {
                            info!(path = %path.display(), reason, "Queue log rotated, reading from start");
                            reader = fresh;
                            offset = start;
                            identity = id;
                            pending.clear();
                            continue;
                        }
                        Err(e) => warn!(path = %path.display(), error = %e, "Failed to reopen queue log"),
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Ok(n) => {
                offset += n as u64;
                if pending.last() != Some(&b'\n') {
                    // Partial line, wait for the rest
                    continue;
                }

                let line = take_line(&mut pending);
                if sender.send(line).is_err() {
                    // Receiver dropped, stop following
                    break;
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error reading queue log");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }

    debug!(path = %path.display(), "Stopped following queue log");
}

/// Check if the path no longer holds the data being read
///
/// A different file at the path means it was replaced; a shorter one means
/// it was truncated in place. A truncated file that has already grown back
/// past `offset` cannot be told apart from one that was only appended to.
async fn rotated(path: &Path, offset: u64, identity: FileId) -> Option<&'static str> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let current = file_id(&meta);
    if identity.is_some() && current.is_some() && current != identity {
        Some("replaced")
    } else if meta.len() < offset {
        Some("truncated")
    } else {
        None
    }
}

/// Drain a complete line from the buffer without its terminator
fn take_line(pending: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(pending)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    pending.clear();
    line
}

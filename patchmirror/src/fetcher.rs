//! HTTP transfer of single files into the mirror.
//!
//! This module provides the core transfer functionality:
//! - Skip-if-present: an existing file at the mirrored path is a cache hit
//! - Streaming GET of the body to disk in fixed-size chunks
//! - Bounded retry with linear backoff for transient failures
//! - Interrupt safety: cancellation is noticed while waiting on the network,
//!   and a partially written file is always removed

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::config::FetchConfig;
use crate::error::{FetchError, MirrorError, MirrorResult};
use crate::mirror::MirrorPath;

/// Snapshot of a transfer in progress.
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress<'a> {
    /// File being transferred.
    pub path: &'a MirrorPath,
    /// Bytes written so far.
    pub downloaded: u64,
    /// Size announced by the server, if any.
    pub total: Option<u64>,
}

/// Callback invoked after every chunk written to disk.
pub type ProgressCallback = Arc<dyn Fn(&TransferProgress<'_>) + Send + Sync>;

/// Result of fetching one file.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The mirrored file already existed; no request was made.
    AlreadyPresent,
    /// The file was transferred.
    Downloaded { bytes: u64 },
    /// The transfer failed and was skipped.
    Failed(FetchError),
}

/// Something that can bring a remote file into the local mirror.
///
/// Only cancellation escapes; every other failure is folded into
/// [`FetchOutcome::Failed`] so one bad file never aborts a batch.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `path` unless it is already mirrored.
    fn fetch(&self, path: &MirrorPath) -> Result<FetchOutcome, Cancelled>;

    /// Local location of `path` in the mirror.
    fn local_path(&self, path: &MirrorPath) -> PathBuf;
}

/// Blocking HTTP fetcher bound to one CDN host and one mirror root.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    root: PathBuf,
    retries: u32,
    retry_delay: Duration,
    chunk_size: usize,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("base_url", &self.base_url)
            .field("root", &self.root)
            .field("retries", &self.retries)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Create a fetcher for `base_url` using the settings in `config`.
    pub fn new(
        base_url: impl Into<String>,
        config: &FetchConfig,
        cancel: CancelToken,
    ) -> MirrorResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| MirrorError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            root: config.output_dir.clone(),
            retries: config.retries,
            retry_delay: config.retry_delay,
            chunk_size: config.chunk_size.max(1),
            cancel,
            progress: None,
        })
    }

    /// Report chunk-level progress to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run one GET and stream the body to `dest`.
    ///
    /// The request runs on a worker thread so that cancellation is noticed
    /// while the server is slow to answer or stalls mid-body. A cancelled
    /// worker is abandoned; it exits once its next send finds no receiver.
    fn download(&self, path: &MirrorPath, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let events = spawn_transfer(self.client.clone(), url.to_string(), self.chunk_size);

        let total = match self.next_event(&events, url)? {
            TransferEvent::Head { status, total } => {
                if status != StatusCode::OK {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                total
            }
            TransferEvent::Failed(e) => return Err(e),
            TransferEvent::Chunk(_) | TransferEvent::Done => return Err(worker_gone(url)),
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = PartialFile::create(dest)?;
        let mut downloaded = 0u64;

        loop {
            let chunk = match self.next_event(&events, url)? {
                TransferEvent::Chunk(chunk) => chunk,
                TransferEvent::Done => break,
                TransferEvent::Failed(e) => return Err(e),
                TransferEvent::Head { .. } => return Err(worker_gone(url)),
            };

            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;

            if let Some(ref cb) = self.progress {
                cb(&TransferProgress {
                    path,
                    downloaded,
                    total,
                });
            }
        }

        file.commit()?;
        Ok(downloaded)
    }

    fn next_event(
        &self,
        events: &Receiver<TransferEvent>,
        url: &str,
    ) -> Result<TransferEvent, FetchError> {
        match self.cancel.recv(events) {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(worker_gone(url)),
            Err(Cancelled) => Err(FetchError::Cancelled),
        }
    }
}

/// Messages from a transfer worker, in order: one `Head`, then chunks,
/// then `Done`. `Failed` may replace any of them and ends the stream.
enum TransferEvent {
    Head { status: StatusCode, total: Option<u64> },
    Chunk(Vec<u8>),
    Done,
    Failed(FetchError),
}

/// Start a GET of `url` on its own thread.
///
/// The channel holds one chunk, so the worker never runs more than a chunk
/// ahead of the disk writes.
fn spawn_transfer(client: Client, url: String, chunk_size: usize) -> Receiver<TransferEvent> {
    let (tx, rx) = mpsc::sync_channel(1);

    thread::spawn(move || {
        let mut response = match client.get(&url).send() {
            Ok(response) => response,
            Err(e) => {
                let _ = tx.send(TransferEvent::Failed(FetchError::Request {
                    url,
                    reason: e.to_string(),
                }));
                return;
            }
        };

        let status = response.status();
        let head = TransferEvent::Head {
            status,
            total: response.content_length(),
        };
        if tx.send(head).is_err() || status != StatusCode::OK {
            return;
        }

        let mut buffer = vec![0u8; chunk_size];
        loop {
            let event = match response.read(&mut buffer) {
                Ok(0) => TransferEvent::Done,
                Ok(n) => TransferEvent::Chunk(buffer[..n].to_vec()),
                Err(e) => TransferEvent::Failed(FetchError::Body {
                    url: url.clone(),
                    reason: e.to_string(),
                }),
            };
            let last = !matches!(event, TransferEvent::Chunk(_));
            if tx.send(event).is_err() || last {
                return;
            }
        }
    });

    rx
}

fn worker_gone(url: &str) -> FetchError {
    FetchError::Body {
        url: url.to_string(),
        reason: "transfer ended unexpectedly".to_string(),
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, path: &MirrorPath) -> Result<FetchOutcome, Cancelled> {
        let dest = self.local_path(path);
        if dest.exists() {
            debug!("File {} already exists; skipping", path);
            return Ok(FetchOutcome::AlreadyPresent);
        }

        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let url = path.url(&self.base_url);
        info!("Fetching {}...", path);

        let mut attempt = 0u32;
        loop {
            match self.download(path, &url, &dest) {
                Ok(bytes) => return Ok(FetchOutcome::Downloaded { bytes }),
                Err(FetchError::Cancelled) => {
                    warn!("Interrupted while fetching {}; partial file removed", path);
                    return Err(Cancelled);
                }
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    warn!(
                        "Fetching {} failed ({}); retrying in {:?} (attempt {}/{})",
                        path, e, delay, attempt, self.retries
                    );
                    if !self.cancel.sleep(delay) {
                        return Err(Cancelled);
                    }
                }
                Err(e) => {
                    error!("Failed to fetch {}; {}", path, e);
                    return Ok(FetchOutcome::Failed(e));
                }
            }
        }
    }

    fn local_path(&self, path: &MirrorPath) -> PathBuf {
        path.local_path(&self.root)
    }
}

/// Destination file that deletes itself unless committed.
///
/// Any early return from a transfer (cancellation, broken body, write
/// error) drops the guard and removes whatever was written, so the mirror
/// never holds a truncated file that would later count as a cache hit.
struct PartialFile {
    path: PathBuf,
    file: Option<File>,
}

impl PartialFile {
    fn create(path: &Path) -> Result<Self, FetchError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| FetchError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), FetchError> {
        let path = &self.path;
        match self.file.as_mut() {
            Some(file) => file.write_all(buf).map_err(|e| FetchError::Write {
                path: path.clone(),
                source: e,
            }),
            None => Ok(()),
        }
    }

    fn commit(mut self) -> Result<(), FetchError> {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                self.file = Some(file);
                return Err(FetchError::Write {
                    path: self.path.clone(),
                    source: e,
                });
            }
        }
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed partial file {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to remove partial file {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

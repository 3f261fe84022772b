//! Frame sources and the background capture loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{
    self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError, TrySendError,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbaImage;
use thiserror::Error;

use crate::constants::{FRAME_QUEUE_DEPTH, IMAGE_EXTENSIONS};

/// Capture failures.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode frame {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to spawn capture thread: {0}")]
    Spawn(String),
}

/// A lazy, non-restartable stream of frames.
///
/// `None` means the source is exhausted.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Option<Result<RgbaImage, CaptureError>>;
}

/// Replays the images of a folder as if they came from a camera.
#[derive(Debug)]
pub struct FolderReplaySource {
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

impl FolderReplaySource {
    /// Collect the images of `dir` in name order. With `looping` the
    /// sequence restarts after the last image.
    pub fn open(dir: &Path, looping: bool) -> Result<Self, CaptureError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            })
            .collect();
        if files.is_empty() {
            return Err(CaptureError::Unavailable(format!(
                "no images in {}",
                dir.display()
            )));
        }
        files.sort();
        log::info!("Replaying {} frames from {}", files.len(), dir.display());

        Ok(Self {
            files,
            position: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for FolderReplaySource {
    fn next_frame(&mut self) -> Option<Result<RgbaImage, CaptureError>> {
        if self.position >= self.files.len() {
            if !self.looping {
                return None;
            }
            self.position = 0;
        }
        let path = self.files.get(self.position)?.clone();
        self.position += 1;

        Some(
            image::open(&path)
                .map(|img| img.to_rgba8())
                .map_err(|source| CaptureError::Decode { path, source }),
        )
    }
}

/// Pumps frames from a [`FrameSource`] on a background thread.
///
/// The queue towards the consumer is bounded; frames are dropped instead of
/// piling up when the consumer falls behind.
pub struct CaptureWorker {
    frame_rx: Receiver<Arc<RgbaImage>>,
    stop_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn(
        source: Box<dyn FrameSource>,
        frame_interval: Duration,
    ) -> Result<Self, CaptureError> {
        let (frame_tx, frame_rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let (stop_tx, stop_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                log::info!("Capture thread started");
                Self::thread_loop(source, frame_interval, frame_tx, stop_rx);
                log::info!("Capture thread exiting");
            })
            .map_err(|e| CaptureError::Spawn(e.to_string()))?;

        Ok(Self {
            frame_rx,
            stop_tx,
            thread_handle: Some(thread_handle),
        })
    }

    fn thread_loop(
        mut source: Box<dyn FrameSource>,
        frame_interval: Duration,
        frame_tx: SyncSender<Arc<RgbaImage>>,
        stop_rx: Receiver<()>,
    ) {
        let mut dropped = 0u64;
        loop {
            match source.next_frame() {
                None => {
                    log::debug!("Frame source exhausted");
                    break;
                }
                Some(Err(e)) => log::warn!("Skipping frame: {e}"),
                Some(Ok(frame)) => match frame_tx.try_send(Arc::new(frame)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        log::trace!("Consumer lagging, dropped {dropped} frames so far");
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                },
            }

            match stop_rx.recv_timeout(frame_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if dropped > 0 {
            log::debug!("Capture dropped {dropped} frames");
        }
    }

    /// The newest queued frame; older queued frames are discarded.
    pub fn latest_frame(&self) -> Option<Arc<RgbaImage>> {
        let mut latest = None;
        loop {
            match self.frame_rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return latest,
            }
        }
    }

    /// Block until a frame arrives or the source ends.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<RgbaImage>> {
        self.frame_rx.recv_timeout(timeout).ok()
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop capturing and wait for the thread.
    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Capture thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWorker")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

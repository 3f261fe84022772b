//! Object detector boundary.
//!
//! A [`Detector`] turns a frame into overlay boxes. Inference is slow, so it
//! runs on a [`DetectorWorker`] thread; the caller submits frames and polls
//! results without blocking. [`InferenceThrottle`] limits how often frames
//! are submitted.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbaImage;
use thiserror::Error;
use web_time::Instant;

use crate::canvas::OverlayBox;

/// Detector failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("model not loaded: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("failed to spawn detector thread: {0}")]
    Spawn(String),
}

/// Something that finds objects in a frame.
///
/// Returned boxes are in image pixels of the given frame.
pub trait Detector: Send {
    fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<OverlayBox>, DetectorError>;
}

/// Result of one submitted frame.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    /// Id returned by [`DetectorWorker::submit`]
    pub request_id: u64,
    pub result: Result<Vec<OverlayBox>, DetectorError>,
}

struct DetectRequest {
    id: u64,
    frame: Arc<RgbaImage>,
}

/// Message sent to the detector thread.
enum ThreadMessage {
    Detect(DetectRequest),
    Shutdown,
}

/// Runs a detector on a background thread.
pub struct DetectorWorker {
    request_tx: Sender<ThreadMessage>,
    result_rx: Receiver<DetectionBatch>,
    thread_handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl DetectorWorker {
    /// Move `detector` onto a new thread.
    pub fn spawn(detector: Box<dyn Detector>) -> Result<Self, DetectorError> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<DetectionBatch>();

        let thread_handle = thread::Builder::new()
            .name("detector".to_string())
            .spawn(move || {
                log::info!("Detector thread started");
                Self::thread_loop(detector, request_rx, result_tx);
                log::info!("Detector thread exiting");
            })
            .map_err(|e| DetectorError::Spawn(e.to_string()))?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            next_id: 1,
        })
    }

    fn thread_loop(
        mut detector: Box<dyn Detector>,
        request_rx: Receiver<ThreadMessage>,
        result_tx: Sender<DetectionBatch>,
    ) {
        loop {
            let mut request = match request_rx.recv() {
                Ok(ThreadMessage::Detect(request)) => request,
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    return;
                }
                Err(_) => {
                    log::debug!("Request channel closed, detector thread exiting");
                    return;
                }
            };

            // Only the newest queued frame is worth running
            loop {
                match request_rx.try_recv() {
                    Ok(ThreadMessage::Detect(newer)) => {
                        log::trace!("Skipping frame {} in favour of {}", request.id, newer.id);
                        request = newer;
                    }
                    Ok(ThreadMessage::Shutdown) => return,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            let started = Instant::now();
            let result = detector.detect(&request.frame);
            match &result {
                Ok(boxes) => log::debug!(
                    "Request {}: {} boxes in {:?}",
                    request.id,
                    boxes.len(),
                    started.elapsed()
                ),
                Err(e) => log::warn!("Request {} failed: {e}", request.id),
            }

            let batch = DetectionBatch {
                request_id: request.id,
                result,
            };
            if result_tx.send(batch).is_err() {
                log::warn!("Result channel closed, detector thread exiting");
                return;
            }
        }
    }

    /// Queue a frame. Returns the request id its batch will carry.
    pub fn submit(&mut self, frame: Arc<RgbaImage>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self
            .request_tx
            .send(ThreadMessage::Detect(DetectRequest { id, frame }))
            .is_err()
        {
            log::error!("Failed to send detect request: channel closed");
        }
        id
    }

    /// Take one finished batch, if any. Non-blocking.
    pub fn try_recv(&mut self) -> Option<DetectionBatch> {
        match self.result_rx.try_recv() {
            Ok(batch) => Some(batch),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Detector thread disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for a batch.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<DetectionBatch> {
        self.result_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for DetectorWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down detector thread");
        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Detector thread panicked: {:?}", e);
            }
        }
    }
}

impl std::fmt::Debug for DetectorWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorWorker")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Allows at most one inference request per interval.
#[derive(Debug, Clone)]
pub struct InferenceThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl InferenceThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take the slot if the interval has passed since the last one taken.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        let ready = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if ready {
            self.last = Some(now);
        }
        ready
    }

    /// Forget the last request so the next one goes through immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for InferenceThrottle {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_INFERENCE_INTERVAL)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::PixelBox;

    /// Reports one box covering the left half of every frame.
    pub(crate) struct HalfFrameDetector;

    impl Detector for HalfFrameDetector {
        fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<OverlayBox>, DetectorError> {
            let (w, h) = frame.dimensions();
            Ok(vec![OverlayBox::detection(
                PixelBox::new(0.0, 0.0, f64::from(w) / 2.0, f64::from(h)),
                "half",
                0.75,
            )])
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&mut self, _frame: &RgbaImage) -> Result<Vec<OverlayBox>, DetectorError> {
            Err(DetectorError::Inference("boom".into()))
        }
    }

    #[test]
    fn test_worker_returns_batches() {
        let mut worker = DetectorWorker::spawn(Box::new(HalfFrameDetector)).unwrap();
        let id = worker.submit(Arc::new(RgbaImage::new(40, 20)));

        let batch = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch.request_id, id);
        let boxes = batch.result.unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].bbox, PixelBox::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_worker_ids_increase() {
        let mut worker = DetectorWorker::spawn(Box::new(HalfFrameDetector)).unwrap();
        let a = worker.submit(Arc::new(RgbaImage::new(4, 4)));
        let b = worker.submit(Arc::new(RgbaImage::new(4, 4)));
        assert!(b > a);

        // At least the newest frame is always answered
        let mut last = 0;
        while let Some(batch) = worker.recv_timeout(Duration::from_secs(5)) {
            last = batch.request_id;
            if last == b {
                break;
            }
        }
        assert_eq!(last, b);
    }

    #[test]
    fn test_worker_reports_errors() {
        let mut worker = DetectorWorker::spawn(Box::new(FailingDetector)).unwrap();
        worker.submit(Arc::new(RgbaImage::new(4, 4)));
        let batch = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(batch.result, Err(DetectorError::Inference(_))));
    }

    #[test]
    fn test_throttle_spacing() {
        let mut throttle = InferenceThrottle::new(Duration::from_millis(200));
        let t0 = Instant::now();

        assert!(throttle.try_acquire_at(t0));
        assert!(!throttle.try_acquire_at(t0 + Duration::from_millis(50)));
        assert!(!throttle.try_acquire_at(t0 + Duration::from_millis(199)));
        assert!(throttle.try_acquire_at(t0 + Duration::from_millis(200)));
        assert!(!throttle.try_acquire_at(t0 + Duration::from_millis(250)));

        throttle.reset();
        assert!(throttle.try_acquire_at(t0 + Duration::from_millis(260)));
    }

    #[test]
    fn test_throttle_frame_rate_independent() {
        // 100 frames at 60 fps over ~1.65 s allow at most 9 requests
        let mut throttle = InferenceThrottle::default();
        let t0 = Instant::now();
        let accepted = (0..100u64)
            .filter(|i| throttle.try_acquire_at(t0 + Duration::from_micros(i * 16_667)))
            .count();
        assert!(accepted <= 9, "{accepted}");
        assert!(accepted >= 8, "{accepted}");
    }
}

//! The labeling session: a dataset, a canvas, and the live/preview mode
//! that decides what the canvas shows and what a finished box means.
//!
//! In [`ViewMode::Live`] the canvas follows camera frames and optional
//! detector output. In [`ViewMode::Preview`] it shows one dataset image with
//! its ground-truth boxes, and finished drags are appended to that image's
//! label file under the selected class.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use thiserror::Error;

use crate::canvas::{AnnotationCanvas, CanvasEvent, OverlayBox};
use crate::dataset::{DatasetEntry, DatasetLayout, Split};
use crate::detector::{DetectorError, DetectorWorker, InferenceThrottle};
use crate::format::{
    ClassTaxonomy, FormatError, LabelRecord, append_record, label_status, read_label_file,
};
use crate::geometry::{PixelPoint, Size};

/// What the canvas is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Camera frames
    #[default]
    Live,
    /// A still image from the dataset
    Preview { image_path: PathBuf },
}

/// Why a finished box was not saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Boxes are only saved against a previewed dataset image
    LiveMode,
    NoClassSelected,
}

/// Result of a finished drag.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LabelSaved {
        label_path: PathBuf,
        record: LabelRecord,
    },
    BoxDiscarded(DiscardReason),
}

/// Session failures.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("no dataset folder is open")]
    NoDataset,

    #[error("no detector model is loaded")]
    NoDetector,

    #[error("no camera frame to capture")]
    NoFrame,

    #[error("'{0}' is not an image of the current split")]
    UnknownEntry(String),

    #[error("class id {0} is not defined")]
    UnknownClassId(u32),

    #[error("operation needs {0} mode")]
    WrongMode(&'static str),
}

/// Host-side controller for one labeling window.
#[derive(Debug)]
pub struct LabelingSession {
    canvas: AnnotationCanvas,
    mode: ViewMode,
    layout: Option<DatasetLayout>,
    taxonomy: Option<ClassTaxonomy>,
    split: Split,
    entries: Vec<DatasetEntry>,
    current_index: Option<usize>,
    selected_class: Option<u32>,
    ground_truth: Vec<OverlayBox>,
    detections: Vec<OverlayBox>,
    last_frame: Option<Arc<RgbaImage>>,
    detector: Option<DetectorWorker>,
    inference_running: bool,
    throttle: InferenceThrottle,
    /// Id of the newest detector request
    latest_request: u64,
    /// Batches with a smaller id belong to an earlier image or mode
    stale_before: u64,
}

impl LabelingSession {
    pub fn new(viewport: Size, inference_interval: Duration) -> Self {
        Self {
            canvas: AnnotationCanvas::new(viewport),
            mode: ViewMode::Live,
            layout: None,
            taxonomy: None,
            split: Split::default(),
            entries: Vec::new(),
            current_index: None,
            selected_class: None,
            ground_truth: Vec::new(),
            detections: Vec::new(),
            last_frame: None,
            detector: None,
            inference_running: false,
            throttle: InferenceThrottle::new(inference_interval),
            latest_request: 0,
            stale_before: 0,
        }
    }

    // --- accessors ---

    pub fn canvas(&self) -> &AnnotationCanvas {
        &self.canvas
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn layout(&self) -> Option<&DatasetLayout> {
        self.layout.as_ref()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// The previewed entry and its position in [`Self::entries`].
    pub fn current_entry(&self) -> Option<(usize, &DatasetEntry)> {
        let idx = self.current_index?;
        self.entries.get(idx).map(|entry| (idx, entry))
    }

    pub fn classes(&self) -> &[String] {
        self.taxonomy
            .as_ref()
            .map(ClassTaxonomy::names)
            .unwrap_or_default()
    }

    pub fn selected_class(&self) -> Option<u32> {
        self.selected_class
    }

    pub fn is_inference_running(&self) -> bool {
        self.inference_running
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    fn layout_or_err(&self) -> Result<&DatasetLayout, SessionError> {
        self.layout.as_ref().ok_or(SessionError::NoDataset)
    }

    /// Drop detector results of requests already in flight.
    fn invalidate_detections(&mut self) {
        self.stale_before = self.latest_request + 1;
        self.detections.clear();
    }

    // --- dataset ---

    /// Open a dataset folder.
    ///
    /// Missing `images/<split>` / `labels/<split>` folders and `data.yaml`
    /// are created when `create_missing` is set; otherwise missing folders
    /// are an error.
    pub fn open_dataset(&mut self, root: &Path, create_missing: bool) -> Result<(), SessionError> {
        let layout = DatasetLayout::new(root);
        if create_missing {
            layout.ensure_split(self.split)?;
        } else if let Some(path) = layout.missing_dirs(self.split).into_iter().next() {
            return Err(FormatError::MissingDirectory { path }.into());
        }

        let yaml = layout.data_yaml_path();
        let taxonomy = if yaml.exists() {
            Some(ClassTaxonomy::load(&yaml)?)
        } else if create_missing {
            Some(ClassTaxonomy::create_default(&yaml)?)
        } else {
            log::warn!("{} not found, no classes defined", yaml.display());
            None
        };

        log::info!("Opened dataset {}", root.display());
        self.layout = Some(layout);
        self.taxonomy = taxonomy;
        self.selected_class = None;
        if matches!(self.mode, ViewMode::Preview { .. }) {
            self.resume_live();
        }
        self.refresh_entries()
    }

    /// Switch between train and val. Returns to live view.
    ///
    /// The new split is scanned before anything changes; if the scan fails
    /// the session keeps its split but lists no entries.
    pub fn set_split(&mut self, split: Split) -> Result<(), SessionError> {
        if matches!(self.mode, ViewMode::Preview { .. }) {
            self.resume_live();
        }
        let Some(layout) = self.layout.as_ref() else {
            self.split = split;
            return Ok(());
        };

        match layout.entries(split) {
            Ok(entries) => {
                self.split = split;
                self.entries = entries;
                self.current_index = None;
                Ok(())
            }
            Err(e) => {
                self.entries.clear();
                self.current_index = None;
                Err(e.into())
            }
        }
    }

    /// Re-scan the current split.
    pub fn refresh_entries(&mut self) -> Result<(), SessionError> {
        let layout = self.layout_or_err()?;
        let entries = layout.entries(self.split)?;

        // Keep the previewed file selected across the rescan
        let current = self
            .current_entry()
            .map(|(_, entry)| entry.file_name.clone());
        self.current_index =
            current.and_then(|name| entries.iter().position(|e| e.file_name == name));
        self.entries = entries;
        Ok(())
    }

    /// Choose the class used for new boxes. `None` clears the selection.
    pub fn select_class(&mut self, class_id: Option<u32>) -> Result<(), SessionError> {
        if let Some(id) = class_id {
            let known = usize::try_from(id).is_ok_and(|idx| idx < self.classes().len());
            if !known {
                return Err(SessionError::UnknownClassId(id));
            }
        }
        self.selected_class = class_id;
        Ok(())
    }

    /// Append a class to `data.yaml`, creating the file if needed.
    pub fn add_class(&mut self, name: &str) -> Result<u32, SessionError> {
        let yaml = self.layout_or_err()?.data_yaml_path();
        let taxonomy = match self.taxonomy.as_mut() {
            Some(taxonomy) => taxonomy,
            None => self.taxonomy.insert(ClassTaxonomy::load_or_create(&yaml)?),
        };
        let id = taxonomy.add(name)?;
        taxonomy.save()?;
        self.relabel_ground_truth();
        Ok(id)
    }

    /// Remove a class from `data.yaml`.
    pub fn remove_class(&mut self, name: &str) -> Result<(), SessionError> {
        let taxonomy = self
            .taxonomy
            .as_mut()
            .ok_or_else(|| FormatError::unknown_class(name))?;
        taxonomy.remove(name)?;
        taxonomy.save()?;

        let count = taxonomy.len();
        if self
            .selected_class
            .is_some_and(|id| usize::try_from(id).map_or(true, |idx| idx >= count))
        {
            self.selected_class = None;
        }
        self.relabel_ground_truth();
        Ok(())
    }

    /// Rebuild ground-truth captions after the class list changed.
    fn relabel_ground_truth(&mut self) {
        if !matches!(self.mode, ViewMode::Preview { .. }) {
            return;
        }
        let label_path = self
            .current_entry()
            .map(|(_, entry)| entry.label_path.clone());
        if let (Some(label_path), Some(size)) = (label_path, self.canvas.image_size()) {
            self.ground_truth = self.load_ground_truth(&label_path, size);
            if !self.inference_running {
                self.canvas.set_boxes(self.ground_truth.clone());
            }
        }
    }

    // --- live view ---

    /// Feed a camera frame. Ignored while previewing.
    ///
    /// Returns true if the frame was shown.
    pub fn on_frame(&mut self, frame: Arc<RgbaImage>) -> bool {
        if self.mode != ViewMode::Live {
            return false;
        }
        self.canvas
            .replace_frame(Arc::clone(&frame), self.detections.clone());

        if self.inference_running && self.throttle.try_acquire() {
            if let Some(worker) = self.detector.as_mut() {
                self.latest_request = worker.submit(Arc::clone(&frame));
            }
        }
        self.last_frame = Some(frame);
        true
    }

    /// Apply the newest finished detector batch. Returns true if the
    /// overlay changed.
    pub fn poll_detections(&mut self) -> bool {
        let Some(worker) = self.detector.as_mut() else {
            return false;
        };

        let mut newest = None;
        while let Some(batch) = worker.try_recv() {
            if batch.request_id < self.stale_before || !self.inference_running {
                log::debug!("Dropping stale detections for request {}", batch.request_id);
                continue;
            }
            match batch.result {
                Ok(boxes) => newest = Some(boxes),
                Err(e) => log::warn!("Detection failed: {e}"),
            }
        }

        match newest {
            Some(boxes) => {
                self.detections = boxes;
                self.canvas.set_boxes(self.detections.clone());
                true
            }
            None => false,
        }
    }

    /// Wait up to `timeout` for the next usable batch and apply it.
    pub fn wait_for_detections(&mut self, timeout: Duration) -> bool {
        let Some(worker) = self.detector.as_mut() else {
            return false;
        };
        let deadline = web_time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(web_time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let Some(batch) = worker.recv_timeout(remaining) else {
                return false;
            };
            if batch.request_id < self.stale_before || !self.inference_running {
                continue;
            }
            match batch.result {
                Ok(boxes) => {
                    self.detections = boxes;
                    self.canvas.set_boxes(self.detections.clone());
                    return true;
                }
                Err(e) => {
                    log::warn!("Detection failed: {e}");
                    return false;
                }
            }
        }
    }

    /// Install a detector. Any running inference stops.
    pub fn set_detector(&mut self, worker: DetectorWorker) {
        self.stop_inference();
        self.detector = Some(worker);
        log::info!("Detector installed");
    }

    /// Start sending frames to the detector. In preview the shown image is
    /// submitted right away.
    pub fn start_inference(&mut self) -> Result<(), SessionError> {
        let worker = self.detector.as_mut().ok_or(SessionError::NoDetector)?;
        self.inference_running = true;
        self.throttle.reset();

        if matches!(self.mode, ViewMode::Preview { .. }) {
            if let Some(image) = self.canvas.image() {
                self.latest_request = worker.submit(Arc::clone(image));
            }
        }
        log::info!("Inference started");
        Ok(())
    }

    /// Stop inference and remove its boxes. A previewed image shows its
    /// ground truth again.
    pub fn stop_inference(&mut self) {
        if self.inference_running {
            log::info!("Inference stopped");
        }
        self.inference_running = false;
        self.invalidate_detections();
        let boxes = match self.mode {
            ViewMode::Preview { .. } => self.ground_truth.clone(),
            ViewMode::Live => Vec::new(),
        };
        self.canvas.set_boxes(boxes);
    }

    /// Save the latest camera frame into `images/<split>`.
    pub fn capture(&mut self) -> Result<PathBuf, SessionError> {
        if self.mode != ViewMode::Live {
            return Err(SessionError::WrongMode("live"));
        }
        let frame = self.last_frame.clone().ok_or(SessionError::NoFrame)?;
        let now = chrono::Local::now().naive_local();
        let path = self
            .layout_or_err()?
            .save_capture(self.split, &frame, &now)?;
        self.refresh_entries()?;
        Ok(path)
    }

    // --- preview ---

    fn load_ground_truth(&self, label_path: &Path, size: Size) -> Vec<OverlayBox> {
        if !label_path.exists() {
            return Vec::new();
        }
        match read_label_file(label_path) {
            Ok(file) => file
                .records
                .iter()
                .map(|r| r.to_overlay(size.width, size.height, self.classes()))
                .collect(),
            Err(e) => {
                log::warn!("Failed to read label {}: {e}", label_path.display());
                Vec::new()
            }
        }
    }

    fn open_index(&mut self, index: usize) -> Result<(), SessionError> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| SessionError::UnknownEntry(index.to_string()))?;
        let image_path = entry.image_path.clone();
        let label_path = entry.label_path.clone();

        // A failed load leaves the current view untouched
        let image = image::open(&image_path)?.to_rgba8();
        let size = Size::new(image.width(), image.height());

        if self.inference_running {
            self.stop_inference();
        }
        self.invalidate_detections();
        self.ground_truth = self.load_ground_truth(&label_path, size);
        self.canvas
            .set_image(Arc::new(image), self.ground_truth.clone());
        self.current_index = Some(index);
        log::info!(
            "Previewing {} ({}/{})",
            image_path.display(),
            index + 1,
            self.entries.len()
        );
        self.mode = ViewMode::Preview { image_path };
        Ok(())
    }

    /// Show a dataset image of the current split with its labels.
    pub fn open_preview(&mut self, file_name: &str) -> Result<(), SessionError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.file_name == file_name)
            .ok_or_else(|| SessionError::UnknownEntry(file_name.to_string()))?;
        self.open_index(index)
    }

    /// Preview the next entry. Returns false at the end of the list.
    pub fn open_next(&mut self) -> Result<bool, SessionError> {
        let next = match self.current_index {
            Some(idx) => idx + 1,
            None => 0,
        };
        if next >= self.entries.len() {
            return Ok(false);
        }
        self.open_index(next)?;
        Ok(true)
    }

    /// Preview the previous entry. Returns false at the start of the list.
    pub fn open_previous(&mut self) -> Result<bool, SessionError> {
        match self.current_index {
            Some(idx) if idx > 0 => {
                self.open_index(idx - 1)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Leave preview and follow the camera again.
    pub fn resume_live(&mut self) {
        if self.mode == ViewMode::Live {
            return;
        }
        log::info!("Resuming live view");
        self.mode = ViewMode::Live;
        self.current_index = None;
        self.ground_truth.clear();
        self.invalidate_detections();
        self.canvas.clear_image();
    }

    /// Delete the previewed image and its label, then step back one entry.
    pub fn delete_current(&mut self) -> Result<PathBuf, SessionError> {
        let ViewMode::Preview { image_path } = &self.mode else {
            return Err(SessionError::WrongMode("preview"));
        };
        let image_path = image_path.clone();
        let file_name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SessionError::UnknownEntry(image_path.display().to_string()))?
            .to_string();
        let index = self.current_index.unwrap_or(0);

        self.layout_or_err()?.delete_entry(self.split, &file_name)?;
        self.resume_live();
        self.refresh_entries()?;

        if !self.entries.is_empty() {
            let target = index.saturating_sub(1).min(self.entries.len() - 1);
            if let Err(e) = self.open_index(target) {
                log::warn!("Could not open neighbour after delete: {e}");
            }
        }
        Ok(image_path)
    }

    // --- pointer input ---

    pub fn resize(&mut self, viewport: Size) {
        self.canvas.on_resize(viewport);
    }

    pub fn pointer_down(&mut self, pos: PixelPoint) {
        self.canvas.on_pointer_down(pos);
    }

    pub fn pointer_move(&mut self, pos: PixelPoint) {
        self.canvas.on_pointer_move(pos);
    }

    pub fn pointer_leave(&mut self) {
        self.canvas.on_pointer_leave();
    }

    /// Finish a drag. A valid box on a previewed image is appended to its
    /// label file under the selected class.
    pub fn pointer_up(&mut self, pos: PixelPoint) -> Result<Option<SessionEvent>, SessionError> {
        let Some(CanvasEvent::BoxFinalized(bbox)) = self.canvas.on_pointer_up(pos) else {
            return Ok(None);
        };

        let ViewMode::Preview { image_path } = &self.mode else {
            log::debug!("Box drawn in live view discarded");
            return Ok(Some(SessionEvent::BoxDiscarded(DiscardReason::LiveMode)));
        };
        let Some(class_id) = self.selected_class else {
            log::warn!("No class selected, box discarded");
            return Ok(Some(SessionEvent::BoxDiscarded(
                DiscardReason::NoClassSelected,
            )));
        };

        // Label path of the opened entry, not of the current split
        let label_path = self
            .current_entry()
            .filter(|(_, entry)| &entry.image_path == image_path)
            .map(|(_, entry)| entry.label_path.clone())
            .ok_or_else(|| SessionError::UnknownEntry(image_path.display().to_string()))?;

        let record = LabelRecord::new(class_id, bbox);
        append_record(&label_path, &record)?;

        if let Some(size) = self.canvas.image_size() {
            let overlay = record.to_overlay(size.width, size.height, self.classes());
            self.ground_truth.push(overlay);
        }
        if !self.inference_running {
            self.canvas.set_boxes(self.ground_truth.clone());
        }
        if let Some(idx) = self.current_index {
            if let Some(entry) = self.entries.get_mut(idx) {
                entry.status = label_status(&label_path);
            }
        }

        Ok(Some(SessionEvent::LabelSaved { label_path, record }))
    }
}

impl Default for LabelingSession {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_VIEWPORT,
            crate::constants::DEFAULT_INFERENCE_INTERVAL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::tests::HalfFrameDetector;
    use crate::format::LabelStatus;
    use crate::geometry::NormalizedBox;

    /// Dataset with two 64x48 train images, `a.png` labeled and `b.png` not.
    fn dataset() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        layout.ensure_split(Split::Train).unwrap();
        for name in ["a.png", "b.png"] {
            RgbaImage::new(64, 48)
                .save(layout.image_path(Split::Train, name))
                .unwrap();
        }
        std::fs::write(
            layout.label_path(Split::Train, "a.png"),
            "0 0.5 0.5 0.5 0.5\n",
        )
        .unwrap();
        std::fs::write(
            layout.data_yaml_path(),
            "train: images/train\nval: images/val\nnc: 2\nnames: ['person', 'car']\n",
        )
        .unwrap();
        dir
    }

    fn session(root: &Path) -> LabelingSession {
        // 64x48 shown 1:1 with 16px pillarbox on each side
        let mut session = LabelingSession::new(Size::new(96, 48), Duration::from_millis(200));
        session.open_dataset(root, false).unwrap();
        session
    }

    fn detector() -> DetectorWorker {
        DetectorWorker::spawn(Box::new(HalfFrameDetector)).unwrap()
    }

    #[test]
    fn test_open_dataset_lists_entries_and_classes() {
        let dir = dataset();
        let session = session(dir.path());

        let statuses: Vec<_> = session.entries().iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![LabelStatus::Valid, LabelStatus::Missing]);
        assert_eq!(session.classes(), &["person", "car"]);
        assert_eq!(session.mode(), &ViewMode::Live);
    }

    #[test]
    fn test_open_dataset_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LabelingSession::default();
        assert!(matches!(
            session.open_dataset(dir.path(), false),
            Err(SessionError::Format(FormatError::MissingDirectory { .. }))
        ));

        session.open_dataset(dir.path(), true).unwrap();
        assert!(dir.path().join("images/train").is_dir());
        assert!(dir.path().join("data.yaml").is_file());
        assert!(session.entries().is_empty());
    }

    #[test]
    fn test_preview_shows_ground_truth() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("a.png").unwrap();

        assert!(matches!(session.mode(), ViewMode::Preview { .. }));
        let boxes = session.canvas().boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label.as_deref(), Some("person"));
        assert_eq!(session.current_entry().unwrap().0, 0);
    }

    #[test]
    fn test_preview_unknown_entry() {
        let dir = dataset();
        let mut session = session(dir.path());
        assert!(matches!(
            session.open_preview("zzz.png"),
            Err(SessionError::UnknownEntry(_))
        ));
        assert_eq!(session.mode(), &ViewMode::Live);
    }

    #[test]
    fn test_corrupt_image_keeps_previous_view() {
        let dir = dataset();
        let mut session = session(dir.path());
        std::fs::write(dir.path().join("images/train/c.png"), b"not a png").unwrap();
        session.refresh_entries().unwrap();

        session.open_preview("a.png").unwrap();
        assert!(session.open_preview("c.png").is_err());
        let (_, entry) = session.current_entry().unwrap();
        assert_eq!(entry.file_name, "a.png");
    }

    #[test]
    fn test_navigation() {
        let dir = dataset();
        let mut session = session(dir.path());

        assert!(!session.open_previous().unwrap());
        assert!(session.open_next().unwrap());
        assert_eq!(session.current_entry().unwrap().1.file_name, "a.png");
        assert!(session.open_next().unwrap());
        assert_eq!(session.current_entry().unwrap().1.file_name, "b.png");
        assert!(!session.open_next().unwrap());
        assert!(session.open_previous().unwrap());
        assert_eq!(session.current_entry().unwrap().1.file_name, "a.png");
    }

    #[test]
    fn test_drag_in_preview_appends_label() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("b.png").unwrap();
        session.select_class(Some(1)).unwrap();

        session.pointer_down(PixelPoint::new(16, 0));
        session.pointer_move(PixelPoint::new(50, 30));
        let event = session.pointer_up(PixelPoint::new(80, 48)).unwrap();

        let Some(SessionEvent::LabelSaved { label_path, record }) = event else {
            panic!("expected a saved label, got {event:?}");
        };
        assert_eq!(record.class_id, 1);
        assert_eq!(record.bbox, NormalizedBox::new(0.5, 0.5, 1.0, 1.0));
        assert_eq!(
            std::fs::read_to_string(&label_path).unwrap(),
            "1 0.500000 0.500000 1.000000 1.000000\n"
        );
        assert_eq!(session.canvas().boxes().len(), 1);
        assert_eq!(session.current_entry().unwrap().1.status, LabelStatus::Valid);
    }

    #[test]
    fn test_drag_without_class_is_discarded() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("b.png").unwrap();

        session.pointer_down(PixelPoint::new(20, 5));
        let event = session.pointer_up(PixelPoint::new(60, 40)).unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::BoxDiscarded(DiscardReason::NoClassSelected))
        );
        assert!(!dir.path().join("labels/train/b.txt").exists());
    }

    #[test]
    fn test_drag_in_live_is_discarded() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.select_class(Some(0)).unwrap();
        assert!(session.on_frame(Arc::new(RgbaImage::new(64, 48))));

        session.pointer_down(PixelPoint::new(20, 5));
        let event = session.pointer_up(PixelPoint::new(60, 40)).unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::BoxDiscarded(DiscardReason::LiveMode))
        );
    }

    #[test]
    fn test_click_does_nothing() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("b.png").unwrap();
        session.select_class(Some(0)).unwrap();

        session.pointer_down(PixelPoint::new(30, 30));
        assert_eq!(session.pointer_up(PixelPoint::new(30, 30)).unwrap(), None);
    }

    #[test]
    fn test_frames_ignored_in_preview() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("a.png").unwrap();
        assert!(!session.on_frame(Arc::new(RgbaImage::new(10, 10))));
        assert_eq!(session.canvas().image_size(), Some(Size::new(64, 48)));

        session.resume_live();
        assert!(session.canvas().image().is_none());
        assert!(session.on_frame(Arc::new(RgbaImage::new(10, 10))));
    }

    #[test]
    fn test_select_unknown_class() {
        let dir = dataset();
        let mut session = session(dir.path());
        assert!(matches!(
            session.select_class(Some(5)),
            Err(SessionError::UnknownClassId(5))
        ));
    }

    #[test]
    fn test_add_and_remove_class() {
        let dir = dataset();
        let mut session = session(dir.path());
        assert_eq!(session.add_class("dog").unwrap(), 2);
        session.select_class(Some(2)).unwrap();

        session.remove_class("car").unwrap();
        assert_eq!(session.classes(), &["person", "dog"]);
        assert_eq!(session.selected_class(), None);

        let reloaded = ClassTaxonomy::load(&dir.path().join("data.yaml")).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_capture_saves_last_frame() {
        let dir = dataset();
        let mut session = session(dir.path());
        assert!(matches!(session.capture(), Err(SessionError::NoFrame)));

        session.on_frame(Arc::new(RgbaImage::new(32, 24)));
        let path = session.capture().unwrap();
        assert!(path.is_file());
        assert_eq!(session.entries().len(), 3);

        session.open_preview("a.png").unwrap();
        assert!(matches!(
            session.capture(),
            Err(SessionError::WrongMode("live"))
        ));
    }

    #[test]
    fn test_delete_current_steps_back() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.open_preview("b.png").unwrap();

        session.delete_current().unwrap();
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.current_entry().unwrap().1.file_name, "a.png");

        session.delete_current().unwrap();
        assert!(session.entries().is_empty());
        assert_eq!(session.mode(), &ViewMode::Live);
        assert!(!dir.path().join("labels/train/a.txt").exists());
    }

    #[test]
    fn test_failed_split_switch_keeps_labels_in_place() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.select_class(Some(0)).unwrap();

        assert!(matches!(
            session.set_split(Split::Val),
            Err(SessionError::Format(FormatError::MissingDirectory { .. }))
        ));
        assert_eq!(session.split(), Split::Train);
        assert!(session.entries().is_empty());
        assert!(matches!(
            session.open_preview("a.png"),
            Err(SessionError::UnknownEntry(_))
        ));

        session.refresh_entries().unwrap();
        session.open_preview("b.png").unwrap();
        session.pointer_down(PixelPoint::new(16, 0));
        let event = session.pointer_up(PixelPoint::new(80, 48)).unwrap();
        let Some(SessionEvent::LabelSaved { label_path, .. }) = event else {
            panic!("expected a saved label, got {event:?}");
        };
        assert_eq!(label_path, dir.path().join("labels/train/b.txt"));
        assert!(!dir.path().join("labels/val").exists());
    }

    #[test]
    fn test_split_switch_lists_new_split() {
        let dir = dataset();
        let layout = DatasetLayout::new(dir.path());
        layout.ensure_split(Split::Val).unwrap();
        RgbaImage::new(8, 8)
            .save(layout.image_path(Split::Val, "v.png"))
            .unwrap();

        let mut session = session(dir.path());
        session.open_preview("a.png").unwrap();
        session.set_split(Split::Val).unwrap();

        assert_eq!(session.split(), Split::Val);
        assert_eq!(session.mode(), &ViewMode::Live);
        assert_eq!(session.entries().len(), 1);
        assert_eq!(
            session.entries()[0].label_path,
            dir.path().join("labels/val/v.txt")
        );
    }

    #[test]
    fn test_leaving_preview_cancels_drag() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.select_class(Some(0)).unwrap();

        session.open_preview("b.png").unwrap();
        session.pointer_down(PixelPoint::new(20, 5));
        session.resume_live();
        assert_eq!(session.pointer_up(PixelPoint::new(60, 40)).unwrap(), None);

        session.open_preview("a.png").unwrap();
        session.pointer_down(PixelPoint::new(20, 5));
        session.open_preview("b.png").unwrap();
        assert_eq!(session.pointer_up(PixelPoint::new(60, 40)).unwrap(), None);
        assert!(!dir.path().join("labels/train/b.txt").exists());
    }

    #[test]
    fn test_start_inference_requires_detector() {
        let mut session = LabelingSession::default();
        assert!(matches!(
            session.start_inference(),
            Err(SessionError::NoDetector)
        ));
    }

    #[test]
    fn test_preview_inference_and_stop_restores_ground_truth() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.set_detector(detector());
        session.open_preview("a.png").unwrap();

        session.start_inference().unwrap();
        assert!(session.wait_for_detections(Duration::from_secs(5)));
        let boxes = session.canvas().boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label.as_deref(), Some("half"));

        session.stop_inference();
        let boxes = session.canvas().boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label.as_deref(), Some("person"));
    }

    #[test]
    fn test_live_inference_and_stop_clears() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.set_detector(detector());
        session.start_inference().unwrap();

        session.on_frame(Arc::new(RgbaImage::new(64, 48)));
        assert!(session.wait_for_detections(Duration::from_secs(5)));
        assert_eq!(session.canvas().boxes().len(), 1);

        // Detections stay on screen across frames
        session.on_frame(Arc::new(RgbaImage::new(64, 48)));
        assert_eq!(session.canvas().boxes().len(), 1);

        session.stop_inference();
        assert!(session.canvas().boxes().is_empty());
        session.on_frame(Arc::new(RgbaImage::new(64, 48)));
        assert!(session.canvas().boxes().is_empty());
    }

    #[test]
    fn test_stale_batches_dropped_after_switch() {
        let dir = dataset();
        let mut session = session(dir.path());
        session.set_detector(detector());
        session.open_preview("a.png").unwrap();
        session.start_inference().unwrap();

        // Switching image stops inference; the in-flight batch must not land
        session.open_preview("b.png").unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!session.poll_detections());
        assert!(session.canvas().boxes().is_empty());
    }
}

//! labelcam - YOLO dataset labeling
//!
//! Draw bounding boxes on camera frames or dataset images and store them as
//! YOLO label files. The [`session::LabelingSession`] ties together the
//! annotation [`canvas`], the dataset on disk, an optional [`detector`] and a
//! frame source from [`capture`].

pub mod canvas;
pub mod capture;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod detector;
pub mod format;
pub mod geometry;
pub mod session;

pub use canvas::AnnotationCanvas;
pub use session::LabelingSession;

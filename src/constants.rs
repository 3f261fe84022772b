//! Global constants for labelcam

use std::time::Duration;

use crate::canvas::Color;
use crate::geometry::Size;

/// Viewport used when no size has been configured
pub const DEFAULT_VIEWPORT: Size = Size::new(800, 600);

/// Minimum spacing between two detector requests
pub const DEFAULT_INFERENCE_INTERVAL: Duration = Duration::from_millis(200);

/// Frames buffered between the capture thread and the consumer before dropping
pub const FRAME_QUEUE_DEPTH: usize = 2;

/// Image file extensions listed in a dataset split
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Label file extension
pub const LABEL_EXTENSION: &str = "txt";

/// Upper bound on class ids read from a `names` mapping
pub const MAX_CLASSES: usize = 10_000;

/// Class taxonomy file at the dataset root
pub const DATA_YAML: &str = "data.yaml";

/// Prefix of captured frame file names
pub const CAPTURE_PREFIX: &str = "capture_";

/// Timestamp layout of captured frame file names
pub const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Canvas drawing styles
pub mod style {
    use super::Color;

    /// Letterbox padding
    pub const BACKGROUND: Color = Color::rgb(32, 32, 32);

    /// Overlay (detections and ground truth) outline
    pub const BOX_COLOR: Color = Color::rgb(255, 0, 0);
    pub const BOX_WIDTH: f32 = 2.0;

    /// Overlay caption
    pub const LABEL_COLOR: Color = Color::rgb(0, 255, 0);
    pub const LABEL_SIZE: f32 = 14.0;
    /// Caption position relative to the box's top-left corner
    pub const LABEL_OFFSET: (i32, i32) = (4, 16);

    /// Rectangle being dragged
    pub const GESTURE_COLOR: Color = Color::rgb(255, 0, 0);
    pub const GESTURE_WIDTH: f32 = 2.0;

    /// Crosshair guide
    pub const GUIDE_COLOR: Color = Color::rgba(150, 150, 150, 180);
    pub const GUIDE_WIDTH: f32 = 1.0;

    /// Dash pattern (on, off) for dashed strokes
    pub const DASH_PATTERN: [f32; 2] = [6.0, 4.0];
}

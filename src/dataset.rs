//! On-disk layout of a YOLO dataset.
//!
//! ```text
//! <root>/
//!   data.yaml
//!   images/train/*.jpg   labels/train/*.txt
//!   images/val/*.jpg     labels/val/*.txt
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CAPTURE_PREFIX, CAPTURE_TIMESTAMP_FORMAT, DATA_YAML, IMAGE_EXTENSIONS, LABEL_EXTENSION,
};
use crate::format::{FormatError, LabelStatus, label_status};

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Train,
    Val,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "val" | "valid" | "validation" => Ok(Split::Val),
            other => Err(FormatError::invalid_format(format!(
                "unknown split '{other}', expected train or val"
            ))),
        }
    }
}

/// Check if a path has a supported image extension.
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// One image of a split with the state of its label file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    /// File name inside `images/<split>`
    pub file_name: String,
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    pub status: LabelStatus,
}

/// Paths of a dataset rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self, split: Split) -> PathBuf {
        self.root.join("images").join(split.as_str())
    }

    pub fn labels_dir(&self, split: Split) -> PathBuf {
        self.root.join("labels").join(split.as_str())
    }

    pub fn data_yaml_path(&self) -> PathBuf {
        self.root.join(DATA_YAML)
    }

    /// Label file belonging to an image: same stem, `.txt`, under `labels/<split>`.
    pub fn label_path(&self, split: Split, file_name: &str) -> PathBuf {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        self.labels_dir(split)
            .join(format!("{stem}.{LABEL_EXTENSION}"))
    }

    pub fn image_path(&self, split: Split, file_name: &str) -> PathBuf {
        self.images_dir(split).join(file_name)
    }

    /// Directories of `split` that do not exist yet.
    pub fn missing_dirs(&self, split: Split) -> Vec<PathBuf> {
        [self.images_dir(split), self.labels_dir(split)]
            .into_iter()
            .filter(|dir| !dir.is_dir())
            .collect()
    }

    /// Create the image and label directories of `split`.
    pub fn ensure_split(&self, split: Split) -> Result<(), FormatError> {
        for dir in self.missing_dirs(split) {
            std::fs::create_dir_all(&dir)?;
            log::info!("Created {}", dir.display());
        }
        Ok(())
    }

    /// Images of `split` sorted by file name, each with its label status.
    pub fn entries(&self, split: Split) -> Result<Vec<DatasetEntry>, FormatError> {
        let images_dir = self.images_dir(split);
        if !images_dir.is_dir() {
            return Err(FormatError::MissingDirectory { path: images_dir });
        }

        let mut names: Vec<String> = std::fs::read_dir(&images_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image_file(path))
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        names.sort();

        let entries: Vec<DatasetEntry> = names
            .into_iter()
            .map(|file_name| {
                let label_path = self.label_path(split, &file_name);
                DatasetEntry {
                    image_path: images_dir.join(&file_name),
                    status: label_status(&label_path),
                    label_path,
                    file_name,
                }
            })
            .collect();

        log::debug!(
            "Scanned {}: {} images",
            images_dir.display(),
            entries.len()
        );
        Ok(entries)
    }

    /// Save a captured frame as `capture_<timestamp>.jpg` in `images/<split>`.
    ///
    /// A `_<n>` suffix is added when several frames share the same second.
    pub fn save_capture(
        &self,
        split: Split,
        frame: &RgbaImage,
        timestamp: &NaiveDateTime,
    ) -> Result<PathBuf, FormatError> {
        let dir = self.images_dir(split);
        std::fs::create_dir_all(&dir)?;

        let base = format!(
            "{CAPTURE_PREFIX}{}",
            timestamp.format(CAPTURE_TIMESTAMP_FORMAT)
        );
        let mut path = dir.join(format!("{base}.jpg"));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("{base}_{n}.jpg"));
            n += 1;
        }

        // JPEG has no alpha channel
        DynamicImage::ImageRgba8(frame.clone())
            .into_rgb8()
            .save(&path)?;
        log::info!("Saved capture to {}", path.display());
        Ok(path)
    }

    /// Delete an image and its label file. Returns false if the image did
    /// not exist.
    pub fn delete_entry(&self, split: Split, file_name: &str) -> Result<bool, FormatError> {
        let image_path = self.image_path(split, file_name);
        let label_path = self.label_path(split, file_name);

        let existed = image_path.is_file();
        if existed {
            std::fs::remove_file(&image_path)?;
            log::info!("Deleted {}", image_path.display());
        }
        if label_path.is_file() {
            std::fs::remove_file(&label_path)?;
            log::info!("Deleted {}", label_path.display());
        }
        if !existed {
            log::debug!("{} already gone", image_path.display());
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn layout_with_split() -> (tempfile::TempDir, DatasetLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        layout.ensure_split(Split::Train).unwrap();
        (dir, layout)
    }

    #[test]
    fn test_paths() {
        let layout = DatasetLayout::new("/data/set");
        assert_eq!(
            layout.images_dir(Split::Val),
            PathBuf::from("/data/set/images/val")
        );
        assert_eq!(
            layout.label_path(Split::Train, "frame.001.JPG"),
            PathBuf::from("/data/set/labels/train/frame.001.txt")
        );
        assert_eq!(layout.data_yaml_path(), PathBuf::from("/data/set/data.yaml"));
    }

    #[test]
    fn test_split_parse_and_display() {
        assert_eq!("Train".parse::<Split>().unwrap(), Split::Train);
        assert_eq!("valid".parse::<Split>().unwrap(), Split::Val);
        assert!("test".parse::<Split>().is_err());
        assert_eq!(Split::Val.to_string(), "val");
    }

    #[test]
    fn test_missing_dirs_and_ensure() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        assert_eq!(layout.missing_dirs(Split::Val).len(), 2);

        layout.ensure_split(Split::Val).unwrap();
        assert!(layout.missing_dirs(Split::Val).is_empty());
        assert_eq!(layout.missing_dirs(Split::Train).len(), 2);
    }

    #[test]
    fn test_entries_sorted_filtered_with_status() {
        let (_dir, layout) = layout_with_split();
        let images = layout.images_dir(Split::Train);
        let labels = layout.labels_dir(Split::Train);
        for name in ["b.jpg", "a.PNG", "c.bmp", "notes.txt"] {
            std::fs::write(images.join(name), b"").unwrap();
        }
        std::fs::write(labels.join("a.txt"), "0 0.5 0.5 0.2 0.2\n").unwrap();
        std::fs::write(labels.join("b.txt"), "0 0.5 0.5 0.2\n").unwrap();

        let entries = layout.entries(Split::Train).unwrap();
        let summary: Vec<(&str, LabelStatus)> = entries
            .iter()
            .map(|e| (e.file_name.as_str(), e.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.PNG", LabelStatus::Valid),
                ("b.jpg", LabelStatus::Invalid),
                ("c.bmp", LabelStatus::Missing),
            ]
        );
    }

    #[test]
    fn test_entries_without_images_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        assert!(matches!(
            layout.entries(Split::Train),
            Err(FormatError::MissingDirectory { .. })
        ));
    }

    #[test]
    fn test_save_capture_names_and_collisions() {
        let (_dir, layout) = layout_with_split();
        let frame = RgbaImage::from_pixel(8, 6, image::Rgba([10, 20, 30, 255]));

        let first = layout.save_capture(Split::Train, &frame, &timestamp()).unwrap();
        let second = layout.save_capture(Split::Train, &frame, &timestamp()).unwrap();

        assert_eq!(
            first.file_name().unwrap().to_str().unwrap(),
            "capture_20240309140507.jpg"
        );
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "capture_20240309140507_1.jpg"
        );
        let decoded = image::open(&first).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_delete_entry_removes_image_and_label() {
        let (_dir, layout) = layout_with_split();
        std::fs::write(layout.image_path(Split::Train, "x.jpg"), b"").unwrap();
        std::fs::write(layout.label_path(Split::Train, "x.jpg"), "").unwrap();

        assert!(layout.delete_entry(Split::Train, "x.jpg").unwrap());
        assert!(!layout.image_path(Split::Train, "x.jpg").exists());
        assert!(!layout.label_path(Split::Train, "x.jpg").exists());
        assert!(!layout.delete_entry(Split::Train, "x.jpg").unwrap());
    }

    #[test]
    fn test_delete_entry_orphan_label() {
        let (_dir, layout) = layout_with_split();
        let label = layout.label_path(Split::Train, "gone.jpg");
        std::fs::write(&label, "0 0.5 0.5 0.1 0.1\n").unwrap();

        assert!(!layout.delete_entry(Split::Train, "gone.jpg").unwrap());
        assert!(!label.exists());
    }
}

//! YOLO label files: one `<class> <xc> <yc> <w> <h>` line per box, all
//! coordinates normalized to the image size.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::canvas::OverlayBox;
use crate::geometry::{NormalizedBox, to_image_space};

use super::error::FormatError;

/// Why a single label line was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelLineError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("class id '{0}' is not a non-negative integer")]
    InvalidClassId(String),

    #[error("coordinate '{0}' is not a number")]
    InvalidNumber(String),

    #[error("{field} = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },
}

/// One box of a label file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRecord {
    pub class_id: u32,
    pub bbox: NormalizedBox,
}

impl LabelRecord {
    pub fn new(class_id: u32, bbox: NormalizedBox) -> Self {
        Self { class_id, bbox }
    }

    /// Ground-truth overlay for an image of `width` x `height`. The class
    /// name is looked up in `names` when available.
    pub fn to_overlay(&self, width: u32, height: u32, names: &[String]) -> OverlayBox {
        let label = usize::try_from(self.class_id)
            .ok()
            .and_then(|idx| names.get(idx))
            .cloned();
        OverlayBox::ground_truth(to_image_space(&self.bbox, width, height), label)
    }
}

impl FromStr for LabelRecord {
    type Err = LabelLineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [cid, xc, yc, bw, bh] = fields[..] else {
            return Err(LabelLineError::FieldCount(fields.len()));
        };

        let class_id = cid
            .parse::<i64>()
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| LabelLineError::InvalidClassId(cid.to_string()))?;

        let coord = |field: &'static str, text: &str| -> Result<f64, LabelLineError> {
            let value: f64 = text
                .parse()
                .map_err(|_| LabelLineError::InvalidNumber(text.to_string()))?;
            if (0.0..=1.0).contains(&value) {
                Ok(value)
            } else {
                Err(LabelLineError::OutOfRange { field, value })
            }
        };

        Ok(Self {
            class_id,
            bbox: NormalizedBox::new(
                coord("xc", xc)?,
                coord("yc", yc)?,
                coord("w", bw)?,
                coord("h", bh)?,
            ),
        })
    }
}

impl fmt::Display for LabelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bbox;
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, b.xc, b.yc, b.bw, b.bh
        )
    }
}

/// Parsed contents of a label file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelFile {
    /// Lines that passed validation, in file order
    pub records: Vec<LabelRecord>,
    /// Rejected lines as (1-based line number, reason)
    pub invalid_lines: Vec<(usize, LabelLineError)>,
}

impl LabelFile {
    pub fn is_valid(&self) -> bool {
        self.invalid_lines.is_empty()
    }

    /// Parse label text. Invalid lines are collected, never partially applied.
    pub fn parse(content: &str) -> Self {
        let mut file = Self::default();
        for (idx, line) in content.lines().enumerate() {
            match line.parse::<LabelRecord>() {
                Ok(record) => file.records.push(record),
                Err(e) => file.invalid_lines.push((idx + 1, e)),
            }
        }
        file
    }
}

/// Read and validate a label file.
pub fn read_label_file(path: &Path) -> Result<LabelFile, FormatError> {
    let content = std::fs::read_to_string(path)?;
    let file = LabelFile::parse(&content);
    for (line, err) in &file.invalid_lines {
        log::debug!("{}:{line}: {err}", path.display());
    }
    Ok(file)
}

/// Validity of the label file that belongs to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelStatus {
    /// No label file
    Missing,
    /// Every line parses
    Valid,
    /// Unreadable, or at least one line is malformed
    Invalid,
}

impl fmt::Display for LabelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabelStatus::Missing => "missing",
            LabelStatus::Valid => "valid",
            LabelStatus::Invalid => "invalid",
        })
    }
}

/// Classify a label file. Read failures count as invalid.
pub fn label_status(path: &Path) -> LabelStatus {
    if !path.exists() {
        return LabelStatus::Missing;
    }
    match read_label_file(path) {
        Ok(file) if file.is_valid() => LabelStatus::Valid,
        Ok(_) => LabelStatus::Invalid,
        Err(e) => {
            log::warn!("Failed to read label {}: {e}", path.display());
            LabelStatus::Invalid
        }
    }
}

/// Append one record, creating the file and its directory if needed.
pub fn append_record(path: &Path, record: &LabelRecord) -> Result<(), FormatError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Files written by other tools may lack the final newline
    let needs_newline = match std::fs::read(path) {
        Ok(bytes) => bytes.last().is_some_and(|&b| b != b'\n'),
        Err(_) => false,
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_newline {
        writeln!(file)?;
    }
    writeln!(file, "{record}")?;
    log::info!("Appended '{record}' to {}", path.display());
    Ok(())
}

//! Dataset file formats.
//!
//! - **Label files**: one text file per image, one `<class> <xc> <yc> <w> <h>`
//!   line per box, coordinates normalized to `[0, 1]`
//! - **data.yaml**: the dataset's class taxonomy (`train`, `val`, `nc`, `names`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labelcam::format::{ClassTaxonomy, LabelStatus, label_status};
//!
//! let classes = ClassTaxonomy::load_or_create(&root.join("data.yaml"))?;
//! if label_status(&label_path) == LabelStatus::Invalid {
//!     log::warn!("fix {label_path:?}");
//! }
//! ```

mod data_yaml;
mod error;
mod label_file;

pub use data_yaml::ClassTaxonomy;
pub use error::FormatError;
pub use label_file::{
    LabelFile, LabelLineError, LabelRecord, LabelStatus, append_record, label_status,
    read_label_file,
};

#[cfg(test)]
mod tests;

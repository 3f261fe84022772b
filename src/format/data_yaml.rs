//! Class taxonomy stored in a YOLO `data.yaml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_CLASSES;

use super::error::FormatError;

/// Contents written when a dataset has no `data.yaml` yet.
const DEFAULT_DATA_YAML: &str = "train: images/train\nval: images/val\n\nnc: 0\nnames: []\n";

fn default_train() -> String {
    "images/train".to_string()
}

fn default_val() -> String {
    "images/val".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataYaml {
    #[serde(default = "default_train")]
    train: String,
    #[serde(default = "default_val")]
    val: String,
    #[serde(default)]
    nc: usize,
    #[serde(default)]
    names: DataYamlNames,
    /// Keys this tool does not manage (`path`, `test`, ...), kept on save
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

impl Default for DataYamlNames {
    fn default() -> Self {
        Self::Sequence(Vec::new())
    }
}

impl DataYamlNames {
    /// Index-ordered names. Gaps in a mapping become `class_<i>`.
    fn into_vec(self) -> Result<Vec<String>, FormatError> {
        match self {
            Self::Sequence(names) => Ok(names),
            Self::Mapping(mapping) => {
                let Some(&max_index) = mapping.keys().max() else {
                    return Ok(Vec::new());
                };
                if max_index >= MAX_CLASSES {
                    return Err(FormatError::invalid_format(format!(
                        "class id {max_index} in names exceeds the limit of {MAX_CLASSES} classes"
                    )));
                }
                let mut names = vec![String::new(); max_index + 1];
                for (index, name) in mapping {
                    names[index] = name;
                }
                for (index, name) in names.iter_mut().enumerate() {
                    if name.trim().is_empty() {
                        *name = format!("class_{index}");
                    }
                }
                Ok(names)
            }
        }
    }
}

/// Ordered class names of a dataset. The position of a name is its class id.
#[derive(Debug, Clone)]
pub struct ClassTaxonomy {
    path: PathBuf,
    names: Vec<String>,
    train: String,
    val: String,
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl ClassTaxonomy {
    /// Read a `data.yaml`.
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let content = std::fs::read_to_string(path)?;
        let parsed: DataYaml = serde_yaml::from_str(&content)?;
        let names = parsed.names.into_vec()?;
        if parsed.nc != names.len() {
            log::warn!(
                "{}: nc = {} but {} names listed, using the names",
                path.display(),
                parsed.nc,
                names.len()
            );
        }
        log::debug!("Loaded {} classes from {}", names.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            names,
            train: parsed.train,
            val: parsed.val,
            extra: parsed.extra,
        })
    }

    /// Write an empty taxonomy to `path` and return it.
    pub fn create_default(path: &Path) -> Result<Self, FormatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, DEFAULT_DATA_YAML)?;
        log::info!("Created {}", path.display());
        Self::load(path)
    }

    /// Load `path`, creating a default file first when it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, FormatError> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::create_default(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, class_id: u32) -> Option<&str> {
        let idx = usize::try_from(class_id).ok()?;
        self.names.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class id of `name`.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        let idx = self.names.iter().position(|n| n == name)?;
        u32::try_from(idx).ok()
    }

    /// Append a class. Surrounding whitespace and commas are stripped;
    /// empty and duplicate names are rejected. Returns the new class id.
    pub fn add(&mut self, name: &str) -> Result<u32, FormatError> {
        let cleaned: String = name.trim().chars().filter(|&c| c != ',').collect();
        let cleaned = cleaned.trim().to_string();
        if cleaned.is_empty() {
            return Err(FormatError::invalid_format("class name is empty"));
        }
        if self.names.contains(&cleaned) {
            return Err(FormatError::duplicate_class(cleaned));
        }

        let id = u32::try_from(self.names.len())
            .map_err(|_| FormatError::invalid_format("too many classes"))?;
        log::info!("Added class {id}: {cleaned}");
        self.names.push(cleaned);
        Ok(id)
    }

    /// Remove a class by name. Later classes shift down by one id.
    pub fn remove(&mut self, name: &str) -> Result<(), FormatError> {
        let name = name.trim();
        let idx = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| FormatError::unknown_class(name))?;
        self.names.remove(idx);
        log::info!("Removed class {idx}: {name}");
        Ok(())
    }

    /// Write the taxonomy back, with `nc` matching the name count.
    pub fn save(&self) -> Result<(), FormatError> {
        let doc = DataYaml {
            train: self.train.clone(),
            val: self.val.clone(),
            nc: self.names.len(),
            names: DataYamlNames::Sequence(self.names.clone()),
            extra: self.extra.clone(),
        };
        std::fs::write(&self.path, serde_yaml::to_string(&doc)?)?;
        log::debug!("Saved {} classes to {}", self.names.len(), self.path.display());
        Ok(())
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashSet, fs, num::NonZeroUsize, path::Path, thread};

/// Deployment settings shared by the batch tools.
///
/// Loaded from an optional YAML file; any key left out keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Categories a work may carry and still be kept by the filter.
    pub allowed_categories: Vec<String>,
    /// Bucket receiving line images.
    pub bucket: String,
    /// Key prefix prepended to every uploaded file name.
    pub prefix: String,
    /// Host used to build public object URLs (`https://<bucket>.<host>/<key>`).
    pub storage_host: String,
    /// Concurrent uploads; `None` means one per available CPU.
    pub workers: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_categories: vec!["ཚུགས་མ་འཁྱུག".to_string(), "འཁྱུག་ཡིག".to_string()],
            bucket: "monlam.ai.ocr".to_string(),
            prefix: "ume_line_images/".to_string(),
            storage_host: "storage.googleapis.com".to_string(),
            workers: None,
        }
    }
}

impl Settings {
    /// Read settings from `path` if given, otherwise return the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn allowed_set(&self) -> HashSet<String> {
        self.allowed_categories.iter().cloned().collect()
    }

    /// Worker count, falling back to the number of available CPUs.
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
    }
}

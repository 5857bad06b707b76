// src/catalog/mod.rs

pub mod filename;

pub use filename::{parse_workbook_name, WorkbookMeta};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One dataset the pipeline knows how to normalize: which workbook it lives
/// in, how its headers are shaped, and what the response levels are called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    /// Workbook path relative to the workbooks directory.
    pub workbook: PathBuf,
    /// Worksheet to normalize; `None` means every sheet in the workbook.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Canonical ordered response-level labels, one per column triple.
    pub sub_levels: Vec<String>,
    /// Index of the first data row; the exports use 2 or 3.
    #[serde(default = "default_header_offset")]
    pub header_data_row_offset: usize,
    /// Category label for sheets without compound group headers.
    #[serde(default)]
    pub default_category: Option<String>,
}

fn default_header_offset() -> usize {
    2
}

/// The full pipeline configuration: which pages to scan for new workbooks
/// and which datasets to normalize. Loaded from a file handed to the binary,
/// never from module-level constants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Pages scraped for `.xlsx` download links.
    #[serde(default)]
    pub download_pages: Vec<String>,
    pub datasets: Vec<DatasetSpec>,
}

impl Catalog {
    /// Load a catalog from YAML (`.yaml`/`.yml`) or JSON, by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let catalog: Catalog = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing YAML catalog {}", path.display()))?,
            "json" => serde_json::from_str(&raw)
                .with_context(|| format!("parsing JSON catalog {}", path.display()))?,
            other => bail!(
                "unsupported catalog extension {:?} for {}",
                other,
                path.display()
            ),
        };

        catalog.validate()?;
        info!(
            datasets = catalog.datasets.len(),
            pages = catalog.download_pages.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                bail!("duplicate dataset name {:?} in catalog", dataset.name);
            }
            if dataset.sub_levels.is_empty() {
                bail!("dataset {:?} has no sub_levels", dataset.name);
            }
        }
        Ok(())
    }
}

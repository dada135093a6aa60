use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions matched case-insensitively during discovery.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub category: FileCategory,
}

impl DiscoveredFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// All candidate files from one directory scan, partitioned by category.
/// Processing and cleanup both work off this set; the directory is never
/// re-scanned mid-run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveredSet {
    pub images: Vec<DiscoveredFile>,
    pub documents: Vec<DiscoveredFile>,
}

impl DiscoveredSet {
    pub fn total(&self) -> usize {
        self.images.len() + self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Images first, then documents, each in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredFile> {
        self.images.iter().chain(self.documents.iter())
    }
}

/// Single pass over `input_dir`: each regular file is classified at most once
/// by its lowercased extension; everything else is skipped silently.
pub fn discover(input_dir: &Path) -> Result<DiscoveredSet> {
    if !input_dir.is_dir() {
        bail!("input path is not a directory: {}", input_dir.display());
    }

    let mut set = DiscoveredSet::default();
    let mut stems: BTreeMap<String, PathBuf> = BTreeMap::new();

    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("reading directory: {}", input_dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| "reading directory entry")?;
        let path = entry.path();

        let file_type = entry.file_type().with_context(|| "stat directory entry")?;
        if !file_type.is_file() {
            continue;
        }

        let Some(category) = categorize(&path) else {
            debug!("skipping unrecognized file: {}", path.display());
            continue;
        };

        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            if let Some(prev) = stems.get(&stem) {
                warn!(
                    "{} and {} share base name '{}'; their outputs will merge",
                    prev.display(),
                    path.display(),
                    stem
                );
            } else {
                stems.insert(stem, path.clone());
            }
        }

        let file = DiscoveredFile { path, category };
        match category {
            FileCategory::Image => set.images.push(file),
            FileCategory::Document => set.documents.push(file),
        }
    }

    Ok(set)
}

fn categorize(path: &Path) -> Option<FileCategory> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileCategory::Image)
    } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileCategory::Document)
    } else {
        None
    }
}

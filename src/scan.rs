//! Input discovery.
//!
//! Walks the source root and produces the batch of [`InputFile`]s an export
//! session works on. Only metadata is read here: the relative path, the
//! modification time and the size, which is everything the incremental
//! policy needs to decide whether an input must be regenerated.
//!
//! ## Skipped entries
//!
//! - hidden files and directories (`.git/`, `.obsidian/`, `.DS_Store`)
//! - `config.toml` at the root
//! - the configured assets directory (shipped by the global asset bundle)
//! - paths under an `exclude` prefix
//! - the destination directory, when it lives inside the source root
//!
//! Inputs are returned sorted by path so batches are deterministic.

use crate::artifact::{millis_since_epoch, relative_key};
use crate::config::ExportConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// One document or attachment to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Slash-separated path relative to the source root.
    pub relative_path: String,
    /// Milliseconds since the Unix epoch.
    pub modified_time: u64,
    pub size: u64,
}

impl InputFile {
    pub fn new(relative_path: &str, modified_time: u64, size: u64) -> Self {
        Self {
            relative_path: crate::artifact::normalize_path(relative_path),
            modified_time,
            size,
        }
    }

    /// Read the metadata of `path`, which must live under `root`.
    pub fn from_path(root: &Path, path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        Ok(Self {
            relative_path: relative_key(relative),
            modified_time: metadata.modified().map(millis_since_epoch).unwrap_or(0),
            size: metadata.len(),
        })
    }

    /// Markdown documents are rendered; everything else is an attachment.
    pub fn is_markdown(&self) -> bool {
        Path::new(&self.relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"))
    }
}

/// Discover every exportable file under `root`.
///
/// `destination` is skipped when it is nested inside `root`.
pub fn scan(
    root: &Path,
    config: &ExportConfig,
    destination: Option<&Path>,
) -> Result<Vec<InputFile>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let skip_dir = destination.and_then(|d| nested_dir(root, d));

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| keep_entry(e, root, config, skip_dir.as_deref()));

    let mut inputs = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            inputs.push(InputFile::from_path(root, entry.path())?);
        }
    }
    inputs.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(inputs)
}

fn keep_entry(entry: &DirEntry, root: &Path, config: &ExportConfig, skip_dir: Option<&str>) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.file_name().to_string_lossy().starts_with('.') {
        return false;
    }
    let relative = relative_key(entry.path().strip_prefix(root).unwrap_or(entry.path()));
    if entry.depth() == 1 && relative == "config.toml" {
        return false;
    }
    if relative == config.assets_dir.trim_matches('/') || Some(relative.as_str()) == skip_dir {
        return false;
    }
    !config.is_excluded(&relative)
}

/// Relative key of `dir` if it lives strictly inside `root`.
fn nested_dir(root: &Path, dir: &Path) -> Option<String> {
    let root = root.canonicalize().ok()?;
    let dir = dir.canonicalize().ok()?;
    let relative = dir.strip_prefix(&root).ok()?;
    let key = relative_key(relative);
    (!key.is_empty()).then_some(key)
}

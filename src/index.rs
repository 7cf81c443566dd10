//! Export index for incremental builds.
//!
//! Re-rendering every document on each export is wasteful when a vault of
//! a few thousand notes changes one file at a time. The export index records
//! what the previous export produced so the next one can skip inputs that
//! haven't changed and avoid rewriting artifacts whose metadata matches.
//!
//! # Design
//!
//! The index is deliberately coarse: it stores modification times and
//! sizes, never content hashes. Reading and hashing every output would cost
//! about as much as regenerating it.
//!
//! It holds two tables:
//!
//! - **`entries`**: destination path → `{modified_time, source_size, source}`
//!   for every artifact of the last completed export. The staleness filter
//!   compares new artifacts against these.
//! - **`sources`**: input path → `{modified_time, size}` as observed when the
//!   input was last exported. [`ExportIndex::is_source_changed`] answers
//!   from this table.
//!
//! Each artifact entry remembers every input that produced it, including
//! inputs whose copy was dropped as a duplicate. When an input is skipped,
//! the entries it produced are carried into the next index, so a skipped
//! page, or an image it shares with an edited page, does not look deleted
//! on the following run.
//!
//! ## Eligibility
//!
//! Incremental mode is used only when a complete index was loaded, the
//! configuration allows it, and the configuration fingerprint stored in the
//! index matches the current one. Anything else (no file, unreadable JSON,
//! a format version bump or edited settings) falls back to a full export.
//!
//! ## Storage
//!
//! The index is a JSON file at `<destination>/.export-index.json`, next to
//! the site it describes, so it travels with the output directory.
//!
//! ## Lifecycle
//!
//! The index is read-only during a build. [`ExportIndex::rebuild`] returns
//! the next index as a new value; the orchestrator swaps it in only after a
//! completed, non-cancelled session, and the caller persists it with
//! [`ExportIndex::save`].

use crate::artifact::{Artifact, is_identity_path};
use crate::scan::InputFile;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the index file within the destination directory.
const INDEX_FILENAME: &str = ".export-index.json";

/// Version of the index format. Bump this to force a full export when the
/// format or the meaning of its fields changes.
const INDEX_VERSION: u32 = 2;

/// Metadata recorded for one artifact of the previous export.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    pub modified_time: u64,
    pub source_size: u64,
    /// Every input that produced this path, in session order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// Modification time and size of an input file when it was last exported.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceStamp {
    pub modified_time: u64,
    pub size: u64,
}

impl SourceStamp {
    pub fn of(file: &InputFile) -> Self {
        Self {
            modified_time: file.modified_time,
            size: file.size,
        }
    }
}

/// Session-level switches that decide whether incremental mode may be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalPolicy {
    /// `false` when configuration disables incremental exports.
    pub enabled: bool,
    /// Fingerprint of the settings that shape output.
    pub config_fingerprint: String,
}

/// Persisted record of the previous export.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ExportIndex {
    pub version: u32,
    pub config_fingerprint: String,
    pub entries: BTreeMap<String, IndexEntry>,
    pub sources: BTreeMap<String, SourceStamp>,
    /// Set when this index describes a completed export. Never serialized:
    /// a successfully parsed file is complete by definition.
    #[serde(skip)]
    complete: bool,
}

impl ExportIndex {
    /// An index that describes no previous export (first run, `--full`,
    /// or an unreadable file).
    pub fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            config_fingerprint: String::new(),
            entries: BTreeMap::new(),
            sources: BTreeMap::new(),
            complete: false,
        }
    }

    /// Load from the destination directory. Returns an empty index if the
    /// file doesn't exist or can't be used (corruption, version mismatch).
    pub fn load(destination: &Path) -> Self {
        let path = index_path(destination);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no previous export index");
                return Self::empty();
            }
        };
        let mut index: Self = match serde_json::from_str(&content) {
            Ok(i) => i,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "export index unreadable, running a full export");
                return Self::empty();
            }
        };
        if index.version != INDEX_VERSION {
            warn!(
                found = index.version,
                expected = INDEX_VERSION,
                "export index format changed, running a full export"
            );
            return Self::empty();
        }
        index.drop_foreign_keys();
        index.complete = true;
        index
    }

    /// Discard keys that are not relative identity paths. Removals are
    /// joined onto the destination, so an edited index must not be able to
    /// name files outside it.
    fn drop_foreign_keys(&mut self) {
        let before = self.entries.len() + self.sources.len();
        self.entries.retain(|path, _| is_identity_path(path));
        self.sources.retain(|path, _| is_identity_path(path));
        let dropped = before - self.entries.len() - self.sources.len();
        if dropped > 0 {
            warn!(dropped, "ignoring export index keys outside the destination");
        }
    }

    /// Save to the destination directory.
    pub fn save(&self, destination: &Path) -> io::Result<()> {
        std::fs::create_dir_all(destination)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(index_path(destination), json)
    }

    /// Whether this index describes a completed export.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True only if a previous complete index exists, configuration allows
    /// incremental mode, and the settings haven't changed since.
    pub fn global_incremental_eligible(&self, policy: &IncrementalPolicy) -> bool {
        self.complete && policy.enabled && self.config_fingerprint == policy.config_fingerprint
    }

    /// True if the input is unknown to the index or its modification time
    /// or size differs from what was recorded.
    pub fn is_source_changed(&self, file: &InputFile) -> bool {
        match self.sources.get(&file.relative_path) {
            Some(stamp) => *stamp != SourceStamp::of(file),
            None => true,
        }
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn entry_for(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Build the next index from the artifacts of a session, duplicates
    /// included.
    ///
    /// - one entry per artifact path; timestamp and size come from the first
    ///   occurrence, sources are merged across every occurrence
    /// - previous entries produced by a `skipped` input are carried over; if
    ///   an artifact of this session claimed the same path, the skipped
    ///   sources are added to its entry instead
    /// - source stamps are recorded for every `exported` and `skipped` input
    ///
    /// `self` is left untouched.
    pub fn rebuild(
        &self,
        artifacts: &[Artifact],
        exported: &[&InputFile],
        skipped: &[&InputFile],
        config_fingerprint: &str,
    ) -> ExportIndex {
        let mut entries: BTreeMap<String, IndexEntry> = BTreeMap::new();
        for artifact in artifacts {
            let entry = entries
                .entry(artifact.relative_destination_path().to_string())
                .or_insert_with(|| IndexEntry {
                    modified_time: artifact.modified_time(),
                    source_size: artifact.size(),
                    sources: Vec::new(),
                });
            if let Some(source) = artifact.source() {
                add_source(&mut entry.sources, source);
            }
        }

        let skipped_paths: HashSet<&str> =
            skipped.iter().map(|f| f.relative_path.as_str()).collect();
        for (path, entry) in &self.entries {
            let still_owned: Vec<&String> = entry
                .sources
                .iter()
                .filter(|s| skipped_paths.contains(s.as_str()))
                .collect();
            if still_owned.is_empty() {
                continue;
            }
            let next = entries.entry(path.clone()).or_insert_with(|| IndexEntry {
                modified_time: entry.modified_time,
                source_size: entry.source_size,
                sources: Vec::new(),
            });
            for source in still_owned {
                add_source(&mut next.sources, source);
            }
        }

        let sources = exported
            .iter()
            .chain(skipped)
            .map(|f| (f.relative_path.clone(), SourceStamp::of(f)))
            .collect();

        ExportIndex {
            version: INDEX_VERSION,
            config_fingerprint: config_fingerprint.to_string(),
            entries,
            sources,
            complete: true,
        }
    }

    /// Paths recorded here that no longer exist in `next`.
    pub fn removed_paths(&self, next: &ExportIndex) -> Vec<String> {
        self.entries
            .keys()
            .filter(|path| !next.entries.contains_key(*path))
            .cloned()
            .collect()
    }
}

/// Resolve the index file path for a destination directory.
pub fn index_path(destination: &Path) -> PathBuf {
    destination.join(INDEX_FILENAME)
}

fn add_source(sources: &mut Vec<String>, source: &str) {
    if !sources.iter().any(|s| s == source) {
        sources.push(source.to_string());
    }
}

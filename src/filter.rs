//! Deduplication and staleness filtering of accumulated artifacts.
//!
//! Pages, their attachments, the static asset bundle and the navigation
//! bundle are produced by independent collaborators, and they routinely
//! name the same destination (two notes embedding one image, a page and
//! the asset folder shipping the same icon). This stage collapses those
//! into one artifact per destination and, in incremental mode, drops the
//! artifacts whose metadata matches the previous export.
//!
//! ## Staleness rules
//!
//! Evaluated in order, first match wins:
//!
//! 1. **Pages** (`.html`) are always written. Page content depends on
//!    navigation, titles of linked notes and settings, none of which show
//!    up in the page's own timestamp.
//! 2. **Fonts** already present in the index are never rewritten.
//! 3. **Everything else** is written when the index has no entry for it,
//!    when its modification time is strictly newer than the recorded one,
//!    or when its size differs.
//!
//! The filter is a pure function: it reads the index and returns a new
//! list, it never mutates either.

use crate::artifact::{Artifact, ArtifactKind};
use crate::index::ExportIndex;
use std::collections::HashSet;
use tracing::debug;

/// Deduplicate `artifacts` and, unless `only_duplicates` is set or the
/// session isn't incremental, drop those unchanged since the export
/// described by `index`.
pub fn filter(
    artifacts: Vec<Artifact>,
    index: &ExportIndex,
    only_duplicates: bool,
    incremental: bool,
) -> Vec<Artifact> {
    let unique = remove_duplicates(artifacts);
    if only_duplicates || !incremental {
        return unique;
    }
    unique
        .into_iter()
        .filter(|artifact| {
            let keep = needs_write(artifact, index);
            if !keep {
                debug!(path = artifact.relative_destination_path(), "unchanged, not rewriting");
            }
            keep
        })
        .collect()
}

/// Keep the first artifact for each destination path, preserving the
/// order of first appearance.
pub fn remove_duplicates(artifacts: Vec<Artifact>) -> Vec<Artifact> {
    let mut seen = HashSet::new();
    artifacts
        .into_iter()
        .filter(|a| seen.insert(a.relative_destination_path().to_string()))
        .collect()
}

/// Decide whether an artifact must be written, given the previous export.
pub fn needs_write(artifact: &Artifact, index: &ExportIndex) -> bool {
    let path = artifact.relative_destination_path();
    match artifact.kind() {
        ArtifactKind::Page => true,
        ArtifactKind::Font if index.has_entry(path) => false,
        _ => match index.entry_for(path) {
            None => true,
            Some(entry) => {
                artifact.modified_time() > entry.modified_time
                    || artifact.size() != entry.source_size
            }
        },
    }
}

//! Persisting a write set to the destination directory.
//!
//! The orchestrator never touches the output directory; it hands back a
//! write set and a list of destinations that disappeared. This module
//! applies both.

use crate::artifact::{Artifact, is_identity_path};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write every artifact under `root`, creating parent directories as
/// needed. Returns the number of files written.
pub fn write_artifacts(artifacts: &[Artifact], root: &Path) -> Result<usize, WriteError> {
    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for artifact in artifacts {
        let path = root.join(artifact.relative_destination_path());
        if let Some(parent) = path.parent()
            && seen_dirs.insert(parent.to_path_buf())
        {
            fs::create_dir_all(parent).map_err(WriteError::at(parent))?;
        }
        fs::write(&path, artifact.content()).map_err(WriteError::at(&path))?;
        debug!(path = artifact.relative_destination_path(), bytes = artifact.size(), "wrote artifact");
    }
    Ok(artifacts.len())
}

/// Delete destinations left over from a previous export, then prune any
/// directories that became empty. Paths already gone are ignored, and so
/// are paths that would resolve outside `root`.
/// Returns the number of files deleted.
pub fn remove_paths(paths: &[String], root: &Path) -> Result<usize, WriteError> {
    let mut removed = 0;
    for relative in paths {
        if !is_identity_path(relative) {
            warn!(path = %relative, "refusing to remove a path outside the destination");
            continue;
        }
        let path = root.join(relative);
        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                debug!(path = %relative, "removed stale artifact");
                prune_empty_parents(&path, root);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(WriteError::Io { path, source: e }),
        }
    }
    Ok(removed)
}

/// Remove empty directories from `path`'s parent up to, not including, `root`.
fn prune_empty_parents(path: &Path, root: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

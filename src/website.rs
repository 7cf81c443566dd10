//! Build orchestration.
//!
//! A [`Website`] turns a batch of input files into the set of artifacts an
//! export has to write. It owns the export index of the previous run and
//! the collaborators that do the actual rendering:
//!
//! - a [`PageGenerator`], which converts one input into a page and the
//!   attachments it depends on,
//! - a [`GlobalAssets`] collaborator, which contributes artifacts that don't
//!   belong to any single input (stylesheets, scripts, navigation bundles),
//! - a [`CancellationSource`], polled before every unit of work.
//!
//! ## Session
//!
//! ```text
//! decide incremental mode (once)
//! for each input, in order:
//!     cancelled?            → stop, index untouched
//!     unchanged since last? → skip (incremental only)
//!     generate              → append page + dependencies
//! merge global assets
//! dedup (duplicates only)   → artifacts, dependency artifacts
//! stage next index          ← from the deduplicated artifacts
//! dedup + staleness filter  → write-set (compared with the previous index)
//! commit next index
//! ```
//!
//! Duplicate removal runs before the next index is staged so it gets
//! exactly one entry per path. Staleness filtering compares against the
//! index of the *previous* export; the staged index only replaces it once
//! the session has completed without cancellation.
//!
//! ## Failure model
//!
//! One input failing to render is not fatal: it is logged, contributes
//! nothing, and gets no source stamp, so the next export retries it.
//! Cancellation is a normal outcome reported through
//! [`BuildResult::cancelled`]. Only broken preconditions and a failing
//! global asset collaborator abort the build.

use crate::artifact::Artifact;
use crate::config::ExportConfig;
use crate::filter::{filter, remove_duplicates};
use crate::index::ExportIndex;
use crate::metadata::IconSource;
use crate::scan::InputFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("Document is not valid UTF-8: {0}")]
    NotUtf8(String),
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Nothing to export: the input batch is empty")]
    NoInputs,
    #[error("Destination is not a usable directory: {0}")]
    Destination(PathBuf),
    #[error("Global assets failed: {0}")]
    Assets(#[from] AssetError),
}

// ============================================================================
// Collaborator contracts
// ============================================================================

/// Output of one successful page generation.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub output: Artifact,
    pub dependencies: Vec<Artifact>,
}

/// Shared, read-only context handed to collaborators.
pub struct GenerationContext<'a> {
    pub source_root: &'a Path,
    pub destination_root: &'a Path,
    pub config: &'a ExportConfig,
    /// The whole batch, including inputs skipped this session.
    pub inputs: &'a [InputFile],
    pub icons: Option<&'a dyn IconSource>,
}

/// Converts one input file into a page and its dependencies.
///
/// `Ok(None)` means the input deliberately produces nothing (unpublished).
pub trait PageGenerator {
    fn generate(
        &self,
        file: &InputFile,
        ctx: &GenerationContext<'_>,
    ) -> Result<Option<GeneratedPage>, PageError>;
}

/// Contributes artifacts not tied to a single input.
pub trait GlobalAssets {
    fn collect_global_artifacts(
        &self,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<Artifact>, AssetError>;
}

/// Cooperative cancellation flag.
pub trait CancellationSource {
    fn is_cancelled(&self) -> bool;
}

/// Cloneable cancellation handle for embedding callers: keep a clone and
/// call [`CancelToken::cancel`] from any thread. The `webpage-export`
/// binary installs none, so a command-line export runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancellationSource for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the host environment can provide, decided by the caller at
/// session start. Only used for advisory warnings and icon lookups.
#[derive(Default)]
pub struct Capabilities {
    pub icon_source: Option<Box<dyn IconSource>>,
}

/// Advisory progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub label: String,
}

// ============================================================================
// Results
// ============================================================================

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub generated: usize,
    pub skipped: usize,
    /// Inputs that deliberately produced nothing.
    pub empty: usize,
    pub failed: usize,
    /// Distinct dependency artifacts after deduplication.
    pub dependencies: usize,
    /// Distinct artifacts before staleness filtering.
    pub collected: usize,
}

/// Outcome of [`Website::build`].
#[derive(Debug)]
pub struct BuildResult {
    /// Artifacts to write, deduplicated and filtered.
    pub write_set: Vec<Artifact>,
    pub cancelled: bool,
    /// Destination paths of the previous export that no longer exist.
    pub removed: Vec<String>,
    pub uses_incremental_mode: bool,
    pub stats: BuildStats,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Per-invocation state, discarded when `build` returns.
struct BuildSession<'a> {
    input_files: &'a [InputFile],
    artifacts: Vec<Artifact>,
    dependency_artifacts: Vec<Artifact>,
    progress: usize,
    uses_incremental_mode: bool,
    exported: Vec<&'a InputFile>,
    skipped: Vec<&'a InputFile>,
    stats: BuildStats,
}

impl<'a> BuildSession<'a> {
    fn new(input_files: &'a [InputFile], uses_incremental_mode: bool) -> Self {
        Self {
            input_files,
            artifacts: Vec::new(),
            dependency_artifacts: Vec::new(),
            progress: 0,
            uses_incremental_mode,
            exported: Vec::new(),
            skipped: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    fn accept(&mut self, page: GeneratedPage) {
        self.artifacts.push(page.output);
        self.artifacts.extend(page.dependencies.iter().cloned());
        self.dependency_artifacts.extend(page.dependencies);
    }

    fn merge_globals(&mut self, globals: Vec<Artifact>) {
        self.dependency_artifacts.extend(globals.iter().cloned());
        self.artifacts.extend(globals);
    }

    fn into_cancelled(self) -> BuildResult {
        BuildResult {
            write_set: remove_duplicates(self.artifacts),
            cancelled: true,
            removed: Vec::new(),
            uses_incremental_mode: self.uses_incremental_mode,
            stats: self.stats,
        }
    }
}

/// The build orchestrator.
pub struct Website<G, A> {
    source_root: PathBuf,
    config: ExportConfig,
    index: ExportIndex,
    generator: G,
    assets: A,
    capabilities: Capabilities,
    cancellation: Box<dyn CancellationSource>,
    progress: Option<Sender<ProgressEvent>>,
    force_full: bool,
}

impl<G: PageGenerator, A: GlobalAssets> Website<G, A> {
    pub fn new(
        source_root: impl Into<PathBuf>,
        config: ExportConfig,
        index: ExportIndex,
        generator: G,
        assets: A,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            config,
            index,
            generator,
            assets,
            capabilities: Capabilities::default(),
            cancellation: Box::new(CancelToken::new()),
            progress: None,
            force_full: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_cancellation(mut self, source: impl CancellationSource + 'static) -> Self {
        self.cancellation = Box::new(source);
        self
    }

    pub fn with_progress(mut self, tx: Sender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Ignore the previous export and regenerate everything.
    pub fn with_full_export(mut self, force_full: bool) -> Self {
        self.force_full = force_full;
        self
    }

    /// The export index: the previous export's until a build completes,
    /// then the one describing that build.
    pub fn index(&self) -> &ExportIndex {
        &self.index
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run one export session over `input_files`.
    pub fn build(
        &mut self,
        input_files: &[InputFile],
        destination_root: &Path,
    ) -> Result<BuildResult, BuildError> {
        if input_files.is_empty() {
            return Err(BuildError::NoInputs);
        }
        if destination_root.as_os_str().is_empty()
            || (destination_root.exists() && !destination_root.is_dir())
        {
            return Err(BuildError::Destination(destination_root.to_path_buf()));
        }

        let policy = self.config.incremental_policy();
        let incremental = !self.force_full && self.index.global_incremental_eligible(&policy);
        info!(
            inputs = input_files.len(),
            incremental,
            destination = %destination_root.display(),
            "starting export"
        );
        self.warn_missing_capabilities();

        let ctx = GenerationContext {
            source_root: &self.source_root,
            destination_root,
            config: &self.config,
            inputs: input_files,
            icons: self.capabilities.icon_source.as_deref(),
        };
        let mut session = BuildSession::new(input_files, incremental);
        let total = session.input_files.len();

        for file in input_files {
            if self.cancellation.is_cancelled() {
                info!(processed = session.progress, total, "export cancelled");
                return Ok(session.into_cancelled());
            }
            session.progress += 1;
            self.emit(ProgressEvent {
                current: session.progress,
                total,
                label: file.relative_path.clone(),
            });

            if incremental && !self.index.is_source_changed(file) {
                debug!(file = %file.relative_path, "unchanged, skipping");
                session.skipped.push(file);
                session.stats.skipped += 1;
                continue;
            }

            match self.generator.generate(file, &ctx) {
                Ok(Some(page)) => {
                    debug!(
                        file = %file.relative_path,
                        output = page.output.relative_destination_path(),
                        dependencies = page.dependencies.len(),
                        "generated"
                    );
                    session.accept(page);
                    session.exported.push(file);
                    session.stats.generated += 1;
                }
                Ok(None) => {
                    debug!(file = %file.relative_path, "produced no output");
                    session.exported.push(file);
                    session.stats.empty += 1;
                }
                Err(e) => {
                    warn!(file = %file.relative_path, error = %e, "failed to export, skipping");
                    session.stats.failed += 1;
                }
            }
        }

        if self.cancellation.is_cancelled() {
            info!(processed = session.progress, total, "export cancelled");
            return Ok(session.into_cancelled());
        }
        let globals = self.assets.collect_global_artifacts(&ctx)?;
        session.merge_globals(globals);

        // Staged before dedup so every producer of a shared path is recorded
        let next = self.index.rebuild(
            &session.artifacts,
            &session.exported,
            &session.skipped,
            &policy.config_fingerprint,
        );
        let artifacts = filter(session.artifacts, &self.index, true, incremental);
        let dependencies = filter(session.dependency_artifacts, &self.index, true, incremental);
        session.stats.collected = artifacts.len();
        session.stats.dependencies = dependencies.len();

        let write_set = filter(artifacts, &self.index, false, incremental);
        let removed = self.index.removed_paths(&next);
        self.index = next;

        info!(
            generated = session.stats.generated,
            skipped = session.stats.skipped,
            failed = session.stats.failed,
            writing = write_set.len(),
            removed = removed.len(),
            "export complete"
        );

        Ok(BuildResult {
            write_set,
            cancelled: false,
            removed,
            uses_incremental_mode: incremental,
            stats: session.stats,
        })
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            // Progress is advisory; a dropped receiver is not an error.
            let _ = tx.send(event);
        }
    }

    fn warn_missing_capabilities(&self) {
        if self.config.icons.enabled
            && !self.config.icons.overrides.is_empty()
            && self.capabilities.icon_source.is_none()
        {
            warn!("icon overrides are configured but no icon source is available; using defaults");
        }
    }
}

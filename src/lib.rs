//! # Webpage Export
//!
//! Incremental static website export for folders of markdown documents.
//! Markdown files become HTML pages, everything else is copied verbatim,
//! and a small set of global assets (stylesheet, script, navigation bundle,
//! fonts) is shared by every page.
//!
//! # Architecture: One Session, Four Steps
//!
//! ```text
//! 1. Scan      source/   →  Vec<InputFile>     (filesystem → sorted inputs)
//! 2. Build     inputs    →  BuildResult        (generate, collect, dedupe, filter)
//! 3. Write     write set →  output/            (only stale artifacts)
//! 4. Record    index     →  output/.export-index.json
//! ```
//!
//! The build step never touches the output directory. It decides, from the
//! previous export's index, which inputs must be regenerated and which of
//! the resulting artifacts actually need writing. The caller persists the
//! write set and the new index only when the session completed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the source directory into a sorted list of [`scan::InputFile`]s |
//! | [`website`] | The build orchestrator and the collaborator traits it drives |
//! | [`render`] | Default page generator: markdown → HTML with Maud, verbatim copies otherwise |
//! | [`assets`] | Default global assets: embedded CSS/JS, the assets directory, `file-tree.json` |
//! | [`filter`] | Deduplication and per-artifact staleness rules |
//! | [`index`] | The persisted record of the previous export |
//! | [`artifact`] | The unit of output: destination path, bytes, timestamp |
//! | [`metadata`] | Frontmatter parsing and title/icon resolver chains |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`write`] | Applies a write set and removals to the output directory |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Conservative Staleness
//!
//! An input is regenerated when its modification time or size differs from
//! what the index recorded, so a touched but unchanged file is rebuilt.
//! Pages are always written once generated. Fonts already in the index are
//! never rewritten. Every other artifact is written when it is new, newer,
//! or differently sized.
//!
//! ## Staged Index
//!
//! A build filters against the previous index and stages the next one. The
//! staged index replaces the held one only when the session completes, so a
//! cancelled or failed run leaves the next run exactly as informed as this
//! one was. Inputs that failed to generate are left out of the staged index
//! and are retried next time.
//!
//! ## Configuration Fingerprint
//!
//! The index stores a hash of every setting that shapes output. Changing the
//! site name or icon defaults makes the fingerprint differ, which forces a
//! full export without the user having to remember `--full`.

pub mod artifact;
pub mod assets;
pub mod config;
pub mod filter;
pub mod index;
pub mod metadata;
pub mod output;
pub mod render;
pub mod scan;
pub mod website;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Initialize tracing with the given verbosity
/// (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE).
///
/// `RUST_LOG` directives are honoured on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

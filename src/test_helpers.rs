//! Shared test utilities for the webpage-export test suite.
//!
//! Provides constructors for inputs and artifacts, a bulk extractor for
//! destination paths, and in-memory collaborators for exercising the build
//! orchestrator without touching the filesystem.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let generator = FakeGenerator::new().failing("b.md");
//! let mut site = Website::new("/src", config, ExportIndex::empty(), generator, FakeAssets::none());
//! let result = site.build(&[input("a.md", 1, 1), input("b.md", 2, 2)], dest).unwrap();
//! assert_eq!(destinations(&result.write_set), vec!["a.html", "a-files/dep.png"]);
//! ```

use crate::artifact::Artifact;
use crate::scan::InputFile;
use crate::website::{
    AssetError, CancelToken, GeneratedPage, GenerationContext, GlobalAssets, PageError,
    PageGenerator,
};
use std::cell::RefCell;
use std::rc::Rc;

// =========================================================================
// Constructors and extractors
// =========================================================================

pub fn input(path: &str, modified_time: u64, size: u64) -> InputFile {
    InputFile::new(path, modified_time, size)
}

pub fn artifact(path: &str, content: impl Into<Vec<u8>>, modified_time: u64) -> Artifact {
    Artifact::new(path, content, modified_time)
}

/// All destination paths in list order.
pub fn destinations(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts
        .iter()
        .map(|a| a.relative_destination_path())
        .collect()
}

// =========================================================================
// In-memory page generator
// =========================================================================

/// Page generator that fabricates output from input metadata.
///
/// For `notes/a.md` it emits:
/// - `notes/a.html`, timestamped with the input's modification time
/// - `notes/a-files/dep.png`, sized like the input, with a fixed timestamp
///
/// so a touched input changes its page but not its dependency, while a
/// resized input changes both.
#[derive(Default)]
pub struct FakeGenerator {
    failing: Vec<String>,
    empty: Vec<String>,
    shared: Option<String>,
    cancel_after: Option<(usize, CancelToken)>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of `path` returns an error.
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    /// Generation of `path` returns no page.
    pub fn empty(mut self, path: &str) -> Self {
        self.empty.push(path.to_string());
        self
    }

    /// Every page also depends on `destination`.
    pub fn sharing(mut self, destination: &str) -> Self {
        self.shared = Some(destination.to_string());
        self
    }

    /// Cancel `token` once `n` inputs have been generated.
    pub fn cancel_after(mut self, n: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Handle on the list of inputs passed to `generate`, in call order.
    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }
}

impl PageGenerator for FakeGenerator {
    fn generate(
        &self,
        file: &InputFile,
        _ctx: &GenerationContext<'_>,
    ) -> Result<Option<GeneratedPage>, PageError> {
        self.calls.borrow_mut().push(file.relative_path.clone());
        if let Some((n, token)) = &self.cancel_after
            && self.calls.borrow().len() >= *n
        {
            token.cancel();
        }
        if self.failing.contains(&file.relative_path) {
            return Err(PageError::NotUtf8(file.relative_path.clone()));
        }
        if self.empty.contains(&file.relative_path) {
            return Ok(None);
        }

        let stem = file.relative_path.trim_end_matches(".md");
        let output = Artifact::new(
            &format!("{stem}.html"),
            format!("page {} {}", file.relative_path, file.modified_time),
            file.modified_time,
        )
        .with_source(&file.relative_path);
        let mut dependencies = vec![
            Artifact::new(
                &format!("{stem}-files/dep.png"),
                "d".repeat(file.size as usize),
                1,
            )
            .with_source(&file.relative_path),
        ];
        if let Some(shared) = &self.shared {
            dependencies.push(Artifact::new(shared, "shared", 1).with_source(&file.relative_path));
        }
        Ok(Some(GeneratedPage {
            output,
            dependencies,
        }))
    }
}

// =========================================================================
// In-memory global assets
// =========================================================================

/// Global asset collaborator returning a fixed list.
pub struct FakeAssets {
    artifacts: Vec<Artifact>,
}

impl FakeAssets {
    pub fn none() -> Self {
        Self {
            artifacts: Vec::new(),
        }
    }

    /// A stylesheet and a font, both with fixed metadata.
    pub fn standard() -> Self {
        Self {
            artifacts: vec![
                Artifact::new("site-lib/site.css", "body {}", 0),
                Artifact::new("fonts/body.woff2", "font", 0),
            ],
        }
    }

    /// Only an asset at `destination`.
    pub fn with_shared(destination: &str) -> Self {
        Self {
            artifacts: vec![Artifact::new(destination, "global copy", 0)],
        }
    }
}

impl GlobalAssets for FakeAssets {
    fn collect_global_artifacts(
        &self,
        _ctx: &GenerationContext<'_>,
    ) -> Result<Vec<Artifact>, AssetError> {
        Ok(self.artifacts.clone())
    }
}

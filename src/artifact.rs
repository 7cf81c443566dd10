//! Build output units.
//!
//! Every file the exporter writes (rendered pages, copied attachments,
//! stylesheets, fonts, navigation bundles) is an [`Artifact`]: a
//! destination path relative to the output root, the bytes to write, and
//! the modification time of whatever produced it.
//!
//! The destination path is the artifact's identity. Two artifacts with the
//! same path are the same artifact, no matter which collaborator built
//! them, which is what lets the filter stage collapse duplicates without
//! comparing content.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Extension that marks an artifact as a rendered page.
pub const PAGE_EXTENSION: &str = "html";

/// Font container formats. Published fonts are never rewritten.
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Category used by the staleness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Page,
    Font,
    Other,
}

/// One unit of build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    relative_destination_path: String,
    content: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    modified_time: u64,
    /// Relative path of the input file that produced this artifact.
    /// `None` for global assets.
    source: Option<String>,
}

impl Artifact {
    pub fn new(destination: &str, content: impl Into<Vec<u8>>, modified_time: u64) -> Self {
        Self {
            relative_destination_path: normalize_path(destination),
            content: content.into(),
            modified_time,
            source: None,
        }
    }

    /// Attach the input file this artifact was produced from.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(normalize_path(source));
        self
    }

    pub fn relative_destination_path(&self) -> &str {
        &self.relative_destination_path
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn modified_time(&self) -> u64 {
        self.modified_time
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Last segment of the destination path.
    pub fn filename(&self) -> &str {
        self.relative_destination_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_destination_path)
    }

    pub fn kind(&self) -> ArtifactKind {
        let extension = self
            .filename()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some(PAGE_EXTENSION) => ArtifactKind::Page,
            Some(ext) if FONT_EXTENSIONS.contains(&ext) => ArtifactKind::Font,
            _ => ArtifactKind::Other,
        }
    }
}

/// Normalize a relative path to the slash-separated form used as identity.
///
/// - `\` becomes `/`
/// - leading `/`, empty segments and `.` segments are dropped
/// - `..` pops the previous segment (it can never climb above the root)
///
/// ```text
/// "./notes\\img/a.png"  →  "notes/img/a.png"
/// "/docs//intro.html"   →  "docs/intro.html"
/// "a/b/../c.css"        →  "a/c.css"
/// ```
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// True when `path` is already in identity form: non-empty, relative,
/// `/`-separated, with no `.` or `..` segments. Only such paths may be
/// joined onto the destination root.
pub fn is_identity_path(path: &str) -> bool {
    !path.is_empty() && normalize_path(path) == path
}

/// Convert a filesystem path relative to some root into identity form.
pub fn relative_key(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch clamp to zero.
pub fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // normalize_path()
    // =========================================================================

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize_path("notes\\img\\a.png"), "notes/img/a.png");
    }

    #[test]
    fn normalize_strips_leading_slash_and_dot_segments() {
        assert_eq!(normalize_path("/docs//./intro.html"), "docs/intro.html");
        assert_eq!(normalize_path("./a.css"), "a.css");
    }

    #[test]
    fn normalize_resolves_parent_segments() {
        assert_eq!(normalize_path("a/b/../c.css"), "a/c.css");
        assert_eq!(normalize_path("../../escape.txt"), "escape.txt");
    }

    #[test]
    fn identity_paths_reject_escapes_and_absolutes() {
        assert!(is_identity_path("notes/a.html"));
        assert!(!is_identity_path(""));
        assert!(!is_identity_path("../victim.txt"));
        assert!(!is_identity_path("/etc/passwd"));
        assert!(!is_identity_path("a/./b.html"));
        assert!(!is_identity_path("a\\b.html"));
    }

    // =========================================================================
    // Artifact
    // =========================================================================

    #[test]
    fn artifact_path_is_normalized_on_construction() {
        let a = Artifact::new("\\site\\index.html", "x", 1);
        assert_eq!(a.relative_destination_path(), "site/index.html");
    }

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(Artifact::new("a/b/c.woff2", "", 0).filename(), "c.woff2");
        assert_eq!(Artifact::new("top.css", "", 0).filename(), "top.css");
    }

    #[test]
    fn size_is_content_length() {
        assert_eq!(Artifact::new("a.txt", "hello", 0).size(), 5);
    }

    #[test]
    fn kind_detects_pages() {
        assert_eq!(Artifact::new("notes/a.html", "", 0).kind(), ArtifactKind::Page);
        assert_eq!(Artifact::new("A.HTML", "", 0).kind(), ArtifactKind::Page);
    }

    #[test]
    fn kind_detects_fonts() {
        for name in ["f.woff", "f.woff2", "f.ttf", "f.otf", "f.eot"] {
            assert_eq!(Artifact::new(name, "", 0).kind(), ArtifactKind::Font, "{name}");
        }
    }

    #[test]
    fn kind_other_for_everything_else() {
        assert_eq!(Artifact::new("a.css", "", 0).kind(), ArtifactKind::Other);
        assert_eq!(Artifact::new("LICENSE", "", 0).kind(), ArtifactKind::Other);
        assert_eq!(Artifact::new("html", "", 0).kind(), ArtifactKind::Other);
    }

    #[test]
    fn source_is_optional_and_normalized() {
        let a = Artifact::new("a.html", "", 0);
        assert_eq!(a.source(), None);
        let b = a.with_source("notes\\a.md");
        assert_eq!(b.source(), Some("notes/a.md"));
    }

    #[test]
    fn millis_before_epoch_clamps_to_zero() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(10);
        assert_eq!(millis_since_epoch(before), 0);
        let after = UNIX_EPOCH + std::time::Duration::from_millis(1500);
        assert_eq!(millis_since_epoch(after), 1500);
    }
}

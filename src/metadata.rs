//! Display metadata resolution.
//!
//! Each exported entry is shown in navigation with a title and, optionally,
//! an icon. Both can come from several places:
//!
//! - **Frontmatter**: the YAML block at the top of a markdown document.
//!   `title`, `aliases`, `icon` and `banner_icon` are recognized.
//! - **Icon source**: an injected [`IconSource`] capability, typically
//!   backed by `[icons.overrides]` in `config.toml`.
//! - **Filename**: `project-plan.md` becomes "project plan".
//! - **Category defaults**: configured icons for pages, attachments and
//!   folders.
//!
//! ## Resolution priority
//!
//! Each field is resolved independently. The first non-empty value wins:
//!
//! - **Title**: frontmatter `title` → first of `aliases` → filename
//! - **Icon**: frontmatter `icon` → `banner_icon` → icon source → category default
//!
//! Everything here is a pure function of its arguments. The build engine
//! only hands the icon source through; the page generator and the
//! navigation bundle do the resolving.

use crate::config::IconsConfig;
use std::collections::BTreeMap;
use std::path::Path;

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value (trimmed).
///
/// ```text
/// title: resolve(&[frontmatter_title, first_alias, filename_title])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Looks up an icon name for a source path.
pub trait IconSource {
    fn lookup(&self, path: &str) -> Option<String>;
}

/// Icon source backed by a fixed path → icon table.
#[derive(Debug, Clone, Default)]
pub struct StaticIconSource {
    icons: BTreeMap<String, String>,
}

impl StaticIconSource {
    pub fn new(icons: BTreeMap<String, String>) -> Self {
        Self { icons }
    }
}

impl IconSource for StaticIconSource {
    fn lookup(&self, path: &str) -> Option<String> {
        self.icons.get(path).cloned()
    }
}

/// Which default icon applies to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCategory {
    Page,
    Attachment,
    Folder,
}

/// Resolved title and icon of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMeta {
    pub title: String,
    pub icon: Option<String>,
}

// ============================================================================
// Frontmatter
// ============================================================================

/// Parsed YAML frontmatter. Empty when the document has none.
#[derive(Debug, Clone, Default)]
pub struct Frontmatter {
    fields: serde_yaml::Mapping,
}

impl Frontmatter {
    /// A string field.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.as_str()
    }

    /// A string field, or the first string of a list field.
    pub fn first_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key)? {
            serde_yaml::Value::Sequence(items) => items.iter().find_map(|v| v.as_str()),
            value => value.as_str(),
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key)?.as_bool()
    }
}

/// Split a markdown document into frontmatter and body.
///
/// Frontmatter is a YAML block delimited by `---` lines at the very start
/// of the document. Documents without one return an empty [`Frontmatter`]
/// and the full text. A block that isn't a YAML mapping (or is empty) is
/// treated as empty.
pub fn split_frontmatter(text: &str) -> Result<(Frontmatter, &str), serde_yaml::Error> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((Frontmatter::default(), text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let fields = match serde_yaml::from_str::<serde_yaml::Value>(yaml)? {
                serde_yaml::Value::Mapping(m) => m,
                _ => serde_yaml::Mapping::new(),
            };
            return Ok((Frontmatter { fields }, body));
        }
        offset += line.len();
    }
    // Unterminated block: not frontmatter
    Ok((Frontmatter::default(), text))
}

// ============================================================================
// Resolver chains
// ============================================================================

/// Derive a display title from a file path.
///
/// ```text
/// "notes/project-plan.md"  →  "project plan"
/// "img/Sunset_2024.png"    →  "Sunset 2024"
/// ```
pub fn title_from_filename(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    stem.replace(['-', '_'], " ")
}

/// Title chain: frontmatter `title` → first of `aliases` → filename.
pub fn resolve_title(path: &str, frontmatter: &Frontmatter) -> String {
    let from_filename = title_from_filename(path);
    resolve(&[
        frontmatter.str("title"),
        frontmatter.first_str("aliases"),
        Some(&from_filename),
    ])
    .unwrap_or(from_filename)
}

/// Icon chain: frontmatter `icon` → `banner_icon` → icon source → default.
///
/// Returns `None` when icons are disabled.
pub fn resolve_icon(
    path: &str,
    category: EntryCategory,
    frontmatter: &Frontmatter,
    icons: Option<&dyn IconSource>,
    config: &IconsConfig,
) -> Option<String> {
    if !config.enabled {
        return None;
    }
    let looked_up = icons.and_then(|source| source.lookup(path));
    let default = match category {
        EntryCategory::Page => &config.default_page,
        EntryCategory::Attachment => &config.default_attachment,
        EntryCategory::Folder => &config.default_folder,
    };
    resolve(&[
        frontmatter.str("icon"),
        frontmatter.str("banner_icon"),
        looked_up.as_deref(),
        Some(default),
    ])
}

/// Resolve both title and icon for one entry.
pub fn resolve_display(
    path: &str,
    category: EntryCategory,
    frontmatter: &Frontmatter,
    icons: Option<&dyn IconSource>,
    config: &IconsConfig,
) -> DisplayMeta {
    DisplayMeta {
        title: resolve_title(path, frontmatter),
        icon: resolve_icon(path, category, frontmatter, icons, config),
    }
}

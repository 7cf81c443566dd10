//! Default global asset collaborator.
//!
//! Contributes the artifacts that don't belong to any single input:
//!
//! - `site-lib/site.css` and `site-lib/site.js`, embedded at compile time
//! - every file in the configured assets directory (fonts, favicons),
//!   exported at its own relative path
//! - `site-lib/file-tree.json`, the navigation bundle: a folder tree of
//!   every exported entry with its resolved title and icon
//!
//! Embedded files carry a zero timestamp, so after the first export they
//! are only rewritten when their size changes (a new release shipping a
//! different stylesheet). The navigation bundle is stamped with the newest
//! input modification time, or with the current time when the exported
//! copy differs from it.

use crate::artifact::{Artifact, millis_since_epoch, relative_key};
use crate::metadata::{EntryCategory, Frontmatter, resolve_display, resolve_icon, split_frontmatter};
use crate::render::page_destination;
use crate::website::{AssetError, GenerationContext, GlobalAssets};
use serde::Serialize;
use std::fs;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

pub const STYLESHEET_PATH: &str = "site-lib/site.css";
pub const SCRIPT_PATH: &str = "site-lib/site.js";
pub const FILE_TREE_PATH: &str = "site-lib/file-tree.json";

const SITE_CSS: &str = include_str!("../static/site.css");
const SITE_JS: &str = include_str!("../static/site.js");

/// Stylesheet, script, user assets and navigation bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteAssets;

impl GlobalAssets for SiteAssets {
    fn collect_global_artifacts(
        &self,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<Artifact>, AssetError> {
        let mut artifacts = vec![
            Artifact::new(STYLESHEET_PATH, SITE_CSS, 0),
            Artifact::new(SCRIPT_PATH, SITE_JS, 0),
        ];
        artifacts.extend(collect_asset_dir(ctx)?);
        artifacts.push(file_tree_artifact(ctx)?);
        Ok(artifacts)
    }
}

/// Every regular, non-hidden file under the assets directory.
fn collect_asset_dir(ctx: &GenerationContext<'_>) -> Result<Vec<Artifact>, AssetError> {
    let dir = ctx.source_root.join(&ctx.config.assets_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut artifacts = Vec::new();
    let walker = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(ctx.source_root).unwrap_or(entry.path());
        let modified = entry.metadata()?.modified().map(millis_since_epoch).unwrap_or(0);
        artifacts.push(Artifact::new(
            &relative_key(relative),
            fs::read(entry.path())?,
            modified,
        ));
    }
    Ok(artifacts)
}

// ============================================================================
// Navigation bundle
// ============================================================================

/// Navigation bundle written to [`FILE_TREE_PATH`].
#[derive(Debug, Serialize)]
pub struct FileTree {
    pub site_name: String,
    pub entries: Vec<TreeNode>,
}

/// A folder (no `path`) or an exported entry.
#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Build the folder tree of every input that will be published.
pub fn build_file_tree(ctx: &GenerationContext<'_>) -> FileTree {
    let mut entries = Vec::new();
    for input in ctx.inputs {
        let (frontmatter, category, path) = if input.is_markdown() {
            let frontmatter = read_frontmatter(ctx, &input.relative_path);
            if frontmatter.bool("publish") == Some(false) {
                continue;
            }
            let path = page_destination(&input.relative_path);
            (frontmatter, EntryCategory::Page, path)
        } else {
            let path = input.relative_path.clone();
            (Frontmatter::default(), EntryCategory::Attachment, path)
        };
        let display = resolve_display(
            &input.relative_path,
            category,
            &frontmatter,
            ctx.icons,
            &ctx.config.icons,
        );
        let leaf = TreeNode {
            name: String::new(),
            title: display.title,
            path: Some(path),
            icon: display.icon,
            children: Vec::new(),
        };
        let segments: Vec<&str> = input.relative_path.split('/').collect();
        insert_node(&mut entries, &segments, "", leaf, ctx);
    }
    FileTree {
        site_name: ctx.config.site_name.clone(),
        entries,
    }
}

fn insert_node(
    nodes: &mut Vec<TreeNode>,
    segments: &[&str],
    prefix: &str,
    mut leaf: TreeNode,
    ctx: &GenerationContext<'_>,
) {
    match segments {
        [] => {}
        [name] => {
            leaf.name = name.to_string();
            nodes.push(leaf);
        }
        [folder, rest @ ..] => {
            let folder_path = if prefix.is_empty() {
                folder.to_string()
            } else {
                format!("{prefix}/{folder}")
            };
            let position = nodes
                .iter()
                .position(|n| n.path.is_none() && n.name == *folder);
            let index = match position {
                Some(i) => i,
                None => {
                    nodes.push(TreeNode {
                        name: folder.to_string(),
                        title: folder.to_string(),
                        path: None,
                        icon: resolve_icon(
                            &folder_path,
                            EntryCategory::Folder,
                            &Frontmatter::default(),
                            ctx.icons,
                            &ctx.config.icons,
                        ),
                        children: Vec::new(),
                    });
                    nodes.len() - 1
                }
            };
            insert_node(&mut nodes[index].children, rest, &folder_path, leaf, ctx);
        }
    }
}

/// Frontmatter of a markdown input; empty when unreadable or malformed.
fn read_frontmatter(ctx: &GenerationContext<'_>, relative_path: &str) -> Frontmatter {
    fs::read_to_string(ctx.source_root.join(relative_path))
        .ok()
        .and_then(|text| split_frontmatter(&text).ok().map(|(fm, _)| fm))
        .unwrap_or_default()
}

/// The bundle is stamped with the newest input modification time, unless
/// the copy already in the destination differs. A rename or deletion can
/// change the tree without any input getting newer, so a changed bundle is
/// stamped with the current time to make it stale.
fn file_tree_artifact(ctx: &GenerationContext<'_>) -> Result<Artifact, AssetError> {
    let tree = build_file_tree(ctx);
    let json = serde_json::to_vec_pretty(&tree)?;
    let newest = ctx.inputs.iter().map(|i| i.modified_time).max().unwrap_or(0);
    let stamp = match fs::read(ctx.destination_root.join(FILE_TREE_PATH)) {
        Ok(existing) if existing != json => {
            debug!(path = FILE_TREE_PATH, "navigation bundle changed");
            newest.max(millis_since_epoch(SystemTime::now()))
        }
        _ => newest,
    };
    Ok(Artifact::new(FILE_TREE_PATH, json, stamp))
}

//! Default page generator: markdown documents to HTML pages.
//!
//! Markdown inputs (`.md`) are rendered to `<same path>.html`; every other
//! input is an attachment and is exported verbatim at its own path.
//!
//! ## Rendering
//!
//! 1. The YAML frontmatter is split off. `publish: false` produces no page.
//! 2. The body goes through pulldown-cmark (tables, footnotes,
//!    strikethrough, task lists).
//! 3. Links to other notes (`other.md#section`) are rewritten to their
//!    exported pages (`other.html#section`).
//! 4. The result is wrapped in a [maud](https://maud.lambda.xyz/) document
//!    titled by the metadata title chain, linking the shared stylesheet,
//!    script and navigation bundle with paths relative to the page.
//!
//! ## Dependencies
//!
//! Local image and link targets that resolve to an existing file under
//! the source root become dependency artifacts, exported at their own
//! relative path so the page's URLs keep working unchanged. External URLs,
//! fragments, other notes and missing files are ignored.

use crate::artifact::{Artifact, millis_since_epoch, normalize_path, relative_key};
use crate::assets::{FILE_TREE_PATH, SCRIPT_PATH, STYLESHEET_PATH};
use crate::metadata::{DisplayMeta, EntryCategory, resolve_display, split_frontmatter};
use crate::scan::InputFile;
use crate::website::{GeneratedPage, GenerationContext, PageError, PageGenerator};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html as md_html};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Renders markdown inputs with pulldown-cmark and maud.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownPageGenerator;

impl PageGenerator for MarkdownPageGenerator {
    fn generate(
        &self,
        file: &InputFile,
        ctx: &GenerationContext<'_>,
    ) -> Result<Option<GeneratedPage>, PageError> {
        let bytes = fs::read(ctx.source_root.join(&file.relative_path))?;
        if !file.is_markdown() {
            let output = Artifact::new(&file.relative_path, bytes, file.modified_time)
                .with_source(&file.relative_path);
            return Ok(Some(GeneratedPage {
                output,
                dependencies: Vec::new(),
            }));
        }

        let text =
            String::from_utf8(bytes).map_err(|_| PageError::NotUtf8(file.relative_path.clone()))?;
        let (frontmatter, body) =
            split_frontmatter(&text).map_err(|source| PageError::Frontmatter {
                path: file.relative_path.clone(),
                source,
            })?;
        if frontmatter.bool("publish") == Some(false) {
            return Ok(None);
        }

        let display = resolve_display(
            &file.relative_path,
            EntryCategory::Page,
            &frontmatter,
            ctx.icons,
            &ctx.config.icons,
        );
        let destination = page_destination(&file.relative_path);

        let events: Vec<Event<'_>> = Parser::new_ext(body, markdown_options())
            .map(rewrite_note_link)
            .collect();
        let dependencies = collect_dependencies(&events, file, ctx.source_root);

        let mut content = String::new();
        md_html::push_html(&mut content, events.into_iter());
        let page = render_page(&display, &ctx.config.site_name, &destination, &content);

        let output = Artifact::new(&destination, page.into_string(), file.modified_time)
            .with_source(&file.relative_path);
        Ok(Some(GeneratedPage {
            output,
            dependencies,
        }))
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Destination of the page rendered from a markdown input.
///
/// ```text
/// "notes/Plan.md"  →  "notes/Plan.html"
/// ```
pub fn page_destination(relative_path: &str) -> String {
    relative_key(&Path::new(relative_path).with_extension("html"))
}

/// Prefix that leads from a page back to the site root.
///
/// ```text
/// "index.html"        →  ""
/// "notes/a/b.html"    →  "../../"
/// ```
fn root_prefix(destination: &str) -> String {
    "../".repeat(destination.matches('/').count())
}

// ============================================================================
// Link handling
// ============================================================================

/// Local part of a URL, or `None` for external, fragment-only and empty
/// targets. Query and fragment are stripped, `%20` decoded.
fn local_target(url: &str) -> Option<String> {
    if url.contains("://") || url.starts_with("mailto:") || url.starts_with("data:") {
        return None;
    }
    let path = url.split(['#', '?']).next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    Some(path.replace("%20", " "))
}

fn is_note(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".md")
}

fn rewrite_note_link(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if local_target(&dest_url).is_some_and(|p| is_note(&p)) => {
            let href = note_href(&dest_url);
            Event::Start(Tag::Link {
                link_type,
                dest_url: CowStr::from(href),
                title,
                id,
            })
        }
        other => other,
    }
}

/// `other.md#section` → `other.html#section`
fn note_href(url: &str) -> String {
    let (path, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let stem = &path[..path.len() - ".md".len()];
    format!("{stem}.html{fragment}")
}

/// Resolve a page-relative target to a source-root-relative path.
fn resolve_target(document: &str, target: &str) -> String {
    if target.starts_with('/') {
        return normalize_path(target);
    }
    match document.rsplit_once('/') {
        Some((dir, _)) => normalize_path(&format!("{dir}/{target}")),
        None => normalize_path(target),
    }
}

/// Local files referenced by images and links in a rendered document.
fn collect_dependencies(events: &[Event<'_>], file: &InputFile, source_root: &Path) -> Vec<Artifact> {
    let mut dependencies: Vec<Artifact> = Vec::new();
    for event in events {
        let url = match event {
            Event::Start(Tag::Image { dest_url, .. }) | Event::Start(Tag::Link { dest_url, .. }) => {
                dest_url
            }
            _ => continue,
        };
        let Some(target) = local_target(url) else {
            continue;
        };
        if is_note(&target) || target.ends_with(".html") {
            continue;
        }
        let resolved = resolve_target(&file.relative_path, &target);
        if resolved.is_empty()
            || dependencies
                .iter()
                .any(|d| d.relative_destination_path() == resolved)
        {
            continue;
        }
        match read_dependency(source_root, &resolved) {
            Ok(Some(artifact)) => dependencies.push(artifact.with_source(&file.relative_path)),
            Ok(None) => debug!(file = %file.relative_path, target = %resolved, "linked file not found"),
            Err(e) => debug!(file = %file.relative_path, target = %resolved, error = %e, "linked file unreadable"),
        }
    }
    dependencies
}

fn read_dependency(source_root: &Path, relative: &str) -> std::io::Result<Option<Artifact>> {
    let path = source_root.join(relative);
    if !path.is_file() {
        return Ok(None);
    }
    let metadata = fs::metadata(&path)?;
    let modified = metadata.modified().map(millis_since_epoch).unwrap_or(0);
    Ok(Some(Artifact::new(relative, fs::read(&path)?, modified)))
}

// ============================================================================
// HTML
// ============================================================================

fn render_page(display: &DisplayMeta, site_name: &str, destination: &str, body_html: &str) -> Markup {
    let root = root_prefix(destination);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (display.title) " - " (site_name) }
                link rel="stylesheet" href={ (root) (STYLESHEET_PATH) };
                script src={ (root) (SCRIPT_PATH) } defer {}
            }
            body data-root=(root) {
                nav.file-tree data-src={ (root) (FILE_TREE_PATH) } {}
                main.document {
                    header.document-header {
                        @if let Some(icon) = &display.icon {
                            span.document-icon data-icon=(icon) {}
                        }
                        h1 { (display.title) }
                    }
                    (PreEscaped(body_html))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) -> InputFile {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        InputFile::from_path(root, &path).unwrap()
    }

    fn generate(root: &Path, file: &InputFile) -> Result<Option<GeneratedPage>, PageError> {
        let config = ExportConfig::default();
        let inputs = vec![file.clone()];
        let ctx = GenerationContext {
            source_root: root,
            destination_root: root,
            config: &config,
            inputs: &inputs,
            icons: None,
        };
        MarkdownPageGenerator.generate(file, &ctx)
    }

    fn page_html(page: &GeneratedPage) -> String {
        String::from_utf8(page.output.content().to_vec()).unwrap()
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    #[test]
    fn page_destination_swaps_extension() {
        assert_eq!(page_destination("notes/Plan.md"), "notes/Plan.html");
        assert_eq!(page_destination("index.md"), "index.html");
    }

    #[test]
    fn root_prefix_climbs_per_directory() {
        assert_eq!(root_prefix("index.html"), "");
        assert_eq!(root_prefix("notes/a/b.html"), "../../");
    }

    #[test]
    fn local_target_filters_external_and_fragments() {
        assert_eq!(local_target("https://example.com/a.png"), None);
        assert_eq!(local_target("mailto:me@example.com"), None);
        assert_eq!(local_target("#heading"), None);
        assert_eq!(local_target("img/a%20b.png?v=2"), Some("img/a b.png".into()));
        assert_eq!(local_target("other.md#sec"), Some("other.md".into()));
    }

    #[test]
    fn note_href_keeps_fragment() {
        assert_eq!(note_href("other.md#sec"), "other.html#sec");
        assert_eq!(note_href("dir/other.md"), "dir/other.html");
    }

    #[test]
    fn resolve_target_relative_to_document() {
        assert_eq!(resolve_target("notes/a.md", "img/x.png"), "notes/img/x.png");
        assert_eq!(resolve_target("notes/a.md", "../x.png"), "x.png");
        assert_eq!(resolve_target("notes/a.md", "/shared/x.png"), "shared/x.png");
        assert_eq!(resolve_target("a.md", "x.png"), "x.png");
    }

    // =========================================================================
    // generate()
    // =========================================================================

    #[test]
    fn markdown_renders_to_html_page() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "notes/plan.md", b"# Heading\n\nSome *text*.\n");

        let page = generate(tmp.path(), &file).unwrap().unwrap();

        assert_eq!(page.output.relative_destination_path(), "notes/plan.html");
        assert_eq!(page.output.modified_time(), file.modified_time);
        assert_eq!(page.output.source(), Some("notes/plan.md"));
        let html = page_html(&page);
        assert!(html.contains("<em>text</em>"));
        assert!(html.contains("<title>plan - Notes</title>"));
        assert!(html.contains("href=\"../site-lib/site.css\""));
    }

    #[test]
    fn frontmatter_title_and_icon_used() {
        let tmp = TempDir::new().unwrap();
        let file = write(
            tmp.path(),
            "a.md",
            b"---\ntitle: Launch Plan\nicon: rocket\n---\nBody\n",
        );
        let html = page_html(&generate(tmp.path(), &file).unwrap().unwrap());
        assert!(html.contains("<title>Launch Plan - Notes</title>"));
        assert!(html.contains("data-icon=\"rocket\""));
        assert!(!html.contains("title: Launch Plan"));
    }

    #[test]
    fn unpublished_document_produces_nothing() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "secret.md", b"---\npublish: false\n---\nHidden\n");
        assert!(generate(tmp.path(), &file).unwrap().is_none());
    }

    #[test]
    fn note_links_are_rewritten() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "a.md", b"See [other](other.md#part).\n");
        let html = page_html(&generate(tmp.path(), &file).unwrap().unwrap());
        assert!(html.contains("href=\"other.html#part\""));
    }

    #[test]
    fn existing_local_images_become_dependencies() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "notes/img/pic.png", b"png bytes");
        write(tmp.path(), "notes/doc.pdf", b"pdf");
        let file = write(
            tmp.path(),
            "notes/a.md",
            b"![pic](img/pic.png)\n![again](img/pic.png)\n[doc](doc.pdf)\n![gone](missing.png)\n![web](https://x.org/y.png)\n",
        );

        let page = generate(tmp.path(), &file).unwrap().unwrap();
        let deps: Vec<&str> = page
            .dependencies
            .iter()
            .map(|d| d.relative_destination_path())
            .collect();
        assert_eq!(deps, vec!["notes/img/pic.png", "notes/doc.pdf"]);
        assert_eq!(page.dependencies[0].content(), b"png bytes");
        assert_eq!(page.dependencies[0].source(), Some("notes/a.md"));
        assert!(page.dependencies[0].modified_time() > 0);
    }

    #[test]
    fn attachments_are_exported_verbatim() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "img/pic.png", b"\x89PNG");
        let page = generate(tmp.path(), &file).unwrap().unwrap();
        assert_eq!(page.output.relative_destination_path(), "img/pic.png");
        assert_eq!(page.output.content(), b"\x89PNG");
        assert!(page.dependencies.is_empty());
    }

    #[test]
    fn invalid_frontmatter_is_error() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "a.md", b"---\ntitle: [oops\n---\n");
        assert!(matches!(
            generate(tmp.path(), &file),
            Err(PageError::Frontmatter { .. })
        ));
    }

    #[test]
    fn non_utf8_markdown_is_error() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "a.md", &[0xff, 0xfe, 0x00]);
        assert!(matches!(generate(tmp.path(), &file), Err(PageError::NotUtf8(_))));
    }

    #[test]
    fn missing_input_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let file = InputFile::new("gone.md", 1, 1);
        assert!(matches!(generate(tmp.path(), &file), Err(PageError::Io(_))));
    }
}

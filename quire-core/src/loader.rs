use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::dates::parse_date;
use crate::model::{Author, Category, MediaItem, Page, PageKind, SiteData};

pub const METADATA_FILE: &str = "metadata.json";
pub const PAGES_DIR: &str = "pages";
pub const POSTS_DIR: &str = "posts";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    MetadataIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed {path}: {source}")]
    MetadataJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single content file was rejected. Never fatal for the run.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing or unterminated frontmatter")]
    MissingFrontmatter,
    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Metadata {
    categories: Vec<Category>,
    media: Vec<MediaItem>,
    users: Vec<Author>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FrontMatter {
    #[serde(deserialize_with = "scalar_u64")]
    id: u64,
    #[serde(deserialize_with = "scalar_string")]
    title: String,
    #[serde(deserialize_with = "scalar_string")]
    slug: String,
    #[serde(deserialize_with = "scalar_string")]
    date: String,
    #[serde(deserialize_with = "scalar_string")]
    modified: String,
    #[serde(deserialize_with = "scalar_string")]
    status: String,
    #[serde(rename = "type", deserialize_with = "scalar_string")]
    kind: String,
    #[serde(deserialize_with = "scalar_string")]
    link: String,
    #[serde(deserialize_with = "scalar_u64")]
    author: u64,
    categories: Vec<u64>,
}

/// Frontmatter scalars may be written as strings, numbers or YAML dates.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml_ng::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml_ng::Value::String(s) => s,
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn scalar_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml_ng::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml_ng::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_yaml_ng::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Load one site: `content_root/source_name` holding `metadata.json`,
/// `pages/` and `posts/<category>/`. The source name is the site's domain.
pub fn load<P: AsRef<Path>>(content_root: P, source_name: &str) -> Result<SiteData, LoadError> {
    ContentLoader::new(content_root.as_ref().join(source_name), source_name).load()
}

pub struct ContentLoader {
    site_dir: PathBuf,
    domain: String,
}

impl ContentLoader {
    pub fn new<P: AsRef<Path>>(site_dir: P, domain: &str) -> Self {
        Self {
            site_dir: site_dir.as_ref().to_path_buf(),
            domain: domain.to_string(),
        }
    }

    pub fn load(&self) -> Result<SiteData, LoadError> {
        log::info!("Loading content from {}", self.site_dir.display());

        let metadata = self.load_metadata()?;
        let mut site = SiteData {
            domain: self.domain.clone(),
            categories: metadata.categories.into_iter().map(|c| (c.id, c)).collect(),
            media: metadata.media.into_iter().map(|m| (m.id, m)).collect(),
            authors: metadata.users.into_iter().map(|a| (a.id, a)).collect(),
            ..SiteData::default()
        };

        site.pages = self.load_dir(&self.site_dir.join(PAGES_DIR), PageKind::Page)?;
        site.posts = self.load_posts()?;
        site.sort_posts();

        log::info!(
            "Loaded {} pages, {} posts, {} categories, {} media items",
            site.pages.len(),
            site.posts.len(),
            site.categories.len(),
            site.media.len()
        );

        Ok(site)
    }

    fn load_metadata(&self) -> Result<Metadata, LoadError> {
        let path = self.site_dir.join(METADATA_FILE);
        let data = std::fs::read_to_string(&path).map_err(|source| LoadError::MetadataIo {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| LoadError::MetadataJson { path, source })
    }

    /// Every category subdirectory of `posts/`, scanned flat. A post exported
    /// into several category directories is kept once.
    fn load_posts(&self) -> Result<Vec<Page>, LoadError> {
        let posts_dir = self.site_dir.join(POSTS_DIR);
        let mut posts = Vec::new();
        let mut seen = HashSet::new();

        for category_dir in sorted_entries(&posts_dir)?
            .into_iter()
            .filter(|p| p.is_dir())
        {
            for post in self.load_dir(&category_dir, PageKind::Post)? {
                if post.id != 0 && !seen.insert(post.id) {
                    log::debug!("Post {} already loaded, skipping duplicate", post.id);
                    continue;
                }
                posts.push(post);
            }
        }

        Ok(posts)
    }

    fn load_dir(&self, dir: &Path, default_kind: PageKind) -> Result<Vec<Page>, LoadError> {
        let mut pages = Vec::new();

        for path in sorted_entries(dir)?
            .into_iter()
            .filter(|p| p.is_file() && is_markdown(p))
        {
            match parse_file(&path, default_kind) {
                Ok(page) if page.is_published() => pages.push(page),
                Ok(page) => log::debug!("Skipping unpublished {} ({})", path.display(), page.status),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(pages)
    }
}

/// Directory entries sorted by name. A missing directory is simply empty.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map(|ext| ext == "md").unwrap_or(false)
}

pub fn parse_file(path: &Path, default_kind: PageKind) -> Result<Page, FileError> {
    let source = std::fs::read_to_string(path)?;
    parse_document(&source, default_kind)
}

/// Parse a frontmatter + body document into a [`Page`].
pub fn parse_document(source: &str, default_kind: PageKind) -> Result<Page, FileError> {
    let source = source.replace("\r\n", "\n");
    let (yaml, body) = split_frontmatter(&source).ok_or(FileError::MissingFrontmatter)?;
    let fm: FrontMatter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml_ng::from_str(yaml)?
    };
    let (excerpt, content) = split_body(body);

    let kind = match fm.kind.as_str() {
        "post" => PageKind::Post,
        "page" => PageKind::Page,
        _ => default_kind,
    };

    Ok(Page {
        id: fm.id,
        title: fm.title,
        slug: fm.slug,
        date: parse_date(&fm.date),
        modified: parse_date(&fm.modified),
        status: fm.status,
        kind,
        link: Some(fm.link).filter(|l| !l.trim().is_empty()),
        author: fm.author,
        categories: fm.categories,
        excerpt,
        content,
        ..Page::default()
    })
}

fn split_frontmatter(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix("---\n")?;

    if let Some(body) = rest.strip_prefix("---") {
        return Some(("", body.strip_prefix('\n').unwrap_or(body)));
    }

    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = match after.find('\n') {
        Some(newline) => &after[newline + 1..],
        None => "",
    };
    Some((yaml, body))
}

/// Split a body into `(excerpt, content)` using the `## Excerpt` and
/// `## Content` headings. A leading `# Title` line is dropped.
fn split_body(body: &str) -> (String, String) {
    let mut lines: Vec<&str> = body.lines().collect();

    if let Some(first) = lines.iter().position(|l| !l.trim().is_empty())
        && lines[first].starts_with("# ")
    {
        lines.drain(..=first);
    }

    let excerpt_at = lines.iter().position(|l| l.trim() == "## Excerpt");
    let content_at = lines.iter().position(|l| l.trim() == "## Content");

    let join = |slice: &[&str]| slice.join("\n").trim().to_string();

    match (excerpt_at, content_at) {
        (None, None) => (String::new(), join(&lines)),
        (Some(e), None) => (join(&lines[e + 1..]), String::new()),
        (None, Some(c)) => (String::new(), join(&lines[c + 1..])),
        (Some(e), Some(c)) if e < c => (join(&lines[e + 1..c]), join(&lines[c + 1..])),
        (Some(e), Some(c)) => (join(&lines[e + 1..]), join(&lines[c + 1..e])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::fs;
    use tempfile::TempDir;

    const POST: &str = "---
id: 12
title: Hello World
slug: hello-world
date: 2024-01-15 10:00:00
status: publish
type: post
link: https://example.com/2024/01/15/hello-world/
author: 2
categories: [1, 5]
---
# Hello World

## Excerpt

Short version.

## Content

Long version with **bold**.
";

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn metadata() -> &'static str {
        r#"{
            "categories": [{"id": 1, "name": "Uncategorized", "slug": "uncategorized"},
                           {"id": 5, "name": "News", "slug": "news", "count": 1}],
            "media": [{"id": 9, "source_url": "https://example.com/a.jpg",
                       "media_details": {"width": "10", "height": "20", "file": "a.jpg"}}],
            "users": [{"id": 2, "name": "Ada", "slug": "ada"}]
        }"#
    }

    #[test]
    fn parses_frontmatter_and_sections() {
        let page = parse_document(POST, PageKind::Page).unwrap();
        assert_eq!(page.id, 12);
        assert_eq!(page.title, "Hello World");
        assert_eq!(page.kind, PageKind::Post);
        assert_eq!(page.date.year(), 2024);
        assert_eq!(page.categories, vec![1, 5]);
        assert_eq!(page.excerpt, "Short version.");
        assert_eq!(page.content, "Long version with **bold**.");
        assert!(page.link.is_some());
    }

    #[test]
    fn body_without_sections_is_all_content() {
        let doc = "---\ntitle: About\nstatus: publish\n---\n# About\n\nWe make things.\n";
        let page = parse_document(doc, PageKind::Page).unwrap();
        assert_eq!(page.kind, PageKind::Page);
        assert_eq!(page.excerpt, "");
        assert_eq!(page.content, "We make things.");
    }

    #[test]
    fn crlf_documents_parse() {
        let doc = "---\r\ntitle: X\r\nstatus: publish\r\n---\r\nBody\r\n";
        let page = parse_document(doc, PageKind::Page).unwrap();
        assert_eq!(page.title, "X");
        assert_eq!(page.content, "Body");
    }

    #[test]
    fn missing_frontmatter_is_an_error() {
        assert!(matches!(
            parse_document("no frontmatter here", PageKind::Page),
            Err(FileError::MissingFrontmatter)
        ));
        assert!(matches!(
            parse_document("---\ntitle: [unclosed\n---\n", PageKind::Page),
            Err(FileError::Yaml(_))
        ));
    }

    #[test]
    fn bad_dates_become_unknown() {
        let doc = "---\ntitle: X\ndate: someday\nstatus: publish\n---\n";
        let page = parse_document(doc, PageKind::Post).unwrap();
        assert!(crate::dates::is_unknown(&page.date));
    }

    #[test]
    fn missing_metadata_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("example.com")).unwrap();
        assert!(matches!(
            load(tmp.path(), "example.com"),
            Err(LoadError::MetadataIo { .. })
        ));
    }

    #[test]
    fn malformed_metadata_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("example.com/metadata.json"), "{not json");
        assert!(matches!(
            load(tmp.path(), "example.com"),
            Err(LoadError::MetadataJson { .. })
        ));
    }

    #[test]
    fn loads_site_skipping_bad_and_unpublished_files() {
        let tmp = TempDir::new().unwrap();
        let site_dir = tmp.path().join("example.com");
        write(&site_dir.join("metadata.json"), metadata());
        write(
            &site_dir.join("pages/about.md"),
            "---\ntitle: About\nslug: about\nstatus: publish\n---\nHi",
        );
        write(
            &site_dir.join("pages/draft.md"),
            "---\ntitle: Draft\nslug: draft\nstatus: draft\n---\nHi",
        );
        write(&site_dir.join("pages/broken.md"), "---\ntitle: [oops\n---\n");
        write(&site_dir.join("pages/notes.txt"), "ignored");
        write(&site_dir.join("posts/news/hello.md"), POST);
        write(&site_dir.join("posts/uncategorized/hello.md"), POST);
        write(
            &site_dir.join("posts/news/newer.md"),
            "---\nid: 13\ntitle: Newer\nslug: newer\ndate: 2024-02-01\nstatus: publish\n---\n",
        );

        let site = load(tmp.path(), "example.com").unwrap();
        assert_eq!(site.domain, "example.com");
        assert_eq!(site.pages.len(), 1);
        assert_eq!(site.pages[0].title, "About");
        let slugs: Vec<&str> = site.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newer", "hello-world"]);
        assert!(site.posts.iter().all(|p| p.is_post()));
        assert_eq!(site.categories.len(), 2);
        assert_eq!(site.media[&9].media_details.width, 10);
        assert_eq!(site.authors[&2].name, "Ada");
    }

    #[test]
    fn missing_content_directories_are_empty() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("example.com/metadata.json"), "{}");
        let site = load(tmp.path(), "example.com").unwrap();
        assert!(site.pages.is_empty());
        assert!(site.posts.is_empty());
    }
}

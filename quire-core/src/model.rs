use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::dates::unknown_date;

/// Category id reserved for "uncategorized". Never treated as a real category.
pub const UNCATEGORIZED: u64 = 1;

/// Only content with this status is kept.
pub const PUBLISH: &str = "publish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    #[default]
    Page,
    Post,
}

/// Addressing policy for posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlFormat {
    /// `/YYYY/MM/DD/slug/`
    #[default]
    Date,
    /// `/slug/`, or the path of the original link
    Slug,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub date: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub status: String,
    pub kind: PageKind,
    pub link: Option<String>,
    pub author: u64,
    pub categories: Vec<u64>,
    pub excerpt: String,
    pub content: String,
    pub url_format: UrlFormat,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            slug: String::new(),
            date: unknown_date(),
            modified: unknown_date(),
            status: PUBLISH.to_string(),
            kind: PageKind::Page,
            link: None,
            author: 0,
            categories: Vec::new(),
            excerpt: String::new(),
            content: String::new(),
            url_format: UrlFormat::Date,
        }
    }
}

impl Page {
    pub fn is_post(&self) -> bool {
        self.kind == PageKind::Post
    }

    pub fn is_published(&self) -> bool {
        self.status == PUBLISH
    }

    /// Absolute path of this page on the site, always starting and ending with `/`.
    pub fn url(&self) -> String {
        match self.kind {
            PageKind::Post => match self.url_format {
                UrlFormat::Slug => self
                    .link_path()
                    .unwrap_or_else(|| format!("/{}/", self.slug)),
                UrlFormat::Date => format!("/{}/{}/", self.date.format("%Y/%m/%d"), self.slug),
            },
            PageKind::Page => self
                .link_path()
                .unwrap_or_else(|| format!("/{}/", self.slug)),
        }
    }

    /// Directory of this page relative to the output root. Empty when the
    /// page would land on the site root.
    pub fn output_path(&self) -> PathBuf {
        contained_path(&self.url())
    }

    /// The file the page is written to, relative to the output root.
    pub fn output_file(&self) -> PathBuf {
        self.output_path().join("index.html")
    }

    pub fn canonical_url(&self, domain: &str) -> String {
        format!("https://{}{}", domain, self.url())
    }

    /// Pages whose link points at the site root would overwrite the homepage.
    pub fn collides_with_root(&self) -> bool {
        self.output_path().as_os_str().is_empty()
    }

    /// Normalized path component of `link`, if the link parses as a URL.
    pub fn link_path(&self) -> Option<String> {
        let link = self.link.as_deref()?.trim();
        if link.is_empty() {
            return None;
        }
        let url = Url::parse(link).ok()?;
        Some(normalize_path(url.path()))
    }

    /// Ids of the real categories this page belongs to.
    pub fn real_categories(&self) -> impl Iterator<Item = u64> + '_ {
        self.categories
            .iter()
            .copied()
            .filter(|id| *id != UNCATEGORIZED)
    }
}

/// Relative path made of the plain segments of `path`. Root, `.` and `..`
/// segments are dropped so the result stays inside the output directory.
fn contained_path(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .collect()
}

/// Make sure a path starts and ends with `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub count: u64,
    pub parent: u64,
}

impl Category {
    pub fn url(&self) -> String {
        format!("/category/{}/", self.slug)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from("category").join(contained_path(&self.slug))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub id: u64,
    pub slug: String,
    #[serde(deserialize_with = "rendered_or_plain")]
    pub title: String,
    pub media_type: String,
    pub mime_type: String,
    pub source_url: String,
    pub media_details: MediaDetails,
}

impl MediaItem {
    /// Base name of the media file, taken from the relative file path when
    /// known and from the source URL otherwise.
    pub fn filename(&self) -> Option<&str> {
        let from_file = self
            .media_details
            .file
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty());
        from_file.or_else(|| {
            self.source_url
                .split(['?', '#'])
                .next()
                .and_then(|url| url.rsplit('/').next())
                .filter(|name| !name.is_empty())
        })
    }

    /// Public path of the exported file: `/media/{id}_{filename}`.
    pub fn public_path(&self) -> Option<String> {
        self.filename()
            .map(|name| format!("/media/{}_{}", self.id, name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDetails {
    #[serde(deserialize_with = "number_or_string")]
    pub width: u64,
    #[serde(deserialize_with = "number_or_string")]
    pub height: u64,
    pub file: String,
}

/// Exports write dimensions either as JSON numbers or as numeric strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Titles come either as a plain string or as `{"rendered": "..."}`.
fn rendered_or_plain<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(map) => map
            .get("rendered")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

/// Everything one build run knows about a site.
#[derive(Debug, Clone, Default)]
pub struct SiteData {
    pub domain: String,
    pub pages: Vec<Page>,
    /// Newest first.
    pub posts: Vec<Page>,
    pub categories: BTreeMap<u64, Category>,
    pub media: BTreeMap<u64, MediaItem>,
    pub authors: BTreeMap<u64, Author>,
}

impl SiteData {
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// Set the addressing policy on every post before generation.
    pub fn apply_url_format(&mut self, format: UrlFormat) {
        for post in &mut self.posts {
            post.url_format = format;
        }
    }

    /// Stable newest-first ordering; equal dates keep load order.
    pub fn sort_posts(&mut self) {
        self.posts.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn all_content(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().chain(self.posts.iter())
    }

    /// Posts that reference the given category.
    pub fn posts_in_category(&self, id: u64) -> impl Iterator<Item = &Page> {
        self.posts
            .iter()
            .filter(move |post| post.categories.contains(&id))
    }

    /// Categories that deserve a listing page: known, not "uncategorized",
    /// and referenced by at least one post. Ordered by id.
    pub fn listed_categories(&self) -> Vec<&Category> {
        self.categories
            .values()
            .filter(|category| category.id != UNCATEGORIZED)
            .filter(|category| self.posts_in_category(category.id).next().is_some())
            .collect()
    }
}

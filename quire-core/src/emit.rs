//! Site metadata derived from the content model alone: `sitemap.xml`,
//! `robots.txt`, and the `_headers` / `_redirects` files static hosts read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dates;
use crate::model::{Page, SiteData};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const ROBOTS_FILE: &str = "robots.txt";
pub const HEADERS_FILE: &str = "_headers";
pub const REDIRECTS_FILE: &str = "_redirects";

/// How often a kind of document is expected to change, and how much it
/// matters relative to the rest of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Home,
    Page,
    Post,
    Category,
}

impl Freshness {
    pub fn changefreq(self) -> &'static str {
        match self {
            Freshness::Home => "daily",
            Freshness::Page | Freshness::Post => "monthly",
            Freshness::Category => "weekly",
        }
    }

    pub fn priority(self) -> &'static str {
        match self {
            Freshness::Home => "1.0",
            Freshness::Page => "0.8",
            Freshness::Post => "0.6",
            Freshness::Category => "0.5",
        }
    }
}

#[derive(Debug, Clone)]
struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
    freshness: Freshness,
}

#[derive(Debug, Clone, Default)]
pub struct Sitemap {
    urls: Vec<UrlEntry>,
}

impl Sitemap {
    pub fn from_site(site: &SiteData) -> Self {
        let base = site.base_url();
        let mut urls = Vec::new();

        urls.push(UrlEntry {
            loc: format!("{}/", base),
            lastmod: site.posts.first().and_then(|post| dates::ymd(&post.date)),
            freshness: Freshness::Home,
        });

        for page in site.pages.iter().filter(|page| !page.collides_with_root()) {
            urls.push(page_entry(site, page, Freshness::Page));
        }
        for post in site.posts.iter().filter(|post| !post.collides_with_root()) {
            urls.push(page_entry(site, post, Freshness::Post));
        }
        for category in site.listed_categories() {
            if category.slug.trim_matches('/').is_empty() {
                continue;
            }
            urls.push(UrlEntry {
                loc: format!("{}{}", base, category.url()),
                lastmod: site
                    .posts_in_category(category.id)
                    .next()
                    .and_then(|post| dates::ymd(&post.date)),
                freshness: Freshness::Category,
            });
        }

        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(256 + self.urls.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = entry.lastmod {
                xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
            }
            xml.push_str(&format!(
                "    <changefreq>{}</changefreq>\n",
                entry.freshness.changefreq()
            ));
            xml.push_str(&format!(
                "    <priority>{}</priority>\n",
                entry.freshness.priority()
            ));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

fn page_entry(site: &SiteData, page: &Page, freshness: Freshness) -> UrlEntry {
    let lastmod = dates::ymd(&page.modified).or_else(|| dates::ymd(&page.date));
    UrlEntry {
        loc: page.canonical_url(&site.domain),
        lastmod,
        freshness,
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn robots_txt(site: &SiteData) -> String {
    format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}/{}\n",
        site.base_url(),
        SITEMAP_FILE
    )
}

pub fn headers_file() -> String {
    [
        "/*",
        "  X-Frame-Options: SAMEORIGIN",
        "  X-Content-Type-Options: nosniff",
        "  Referrer-Policy: strict-origin-when-cross-origin",
        "",
        "/media/*",
        "  Cache-Control: public, max-age=31536000, immutable",
        "",
        "/assets/*",
        "  Cache-Control: public, max-age=604800",
        "",
    ]
    .join("\n")
}

/// Permanent redirects from each document's legacy link path to where it
/// lives now. The first document claiming a source path wins.
pub fn redirects_file(site: &SiteData) -> String {
    let mut rules: BTreeMap<String, String> = BTreeMap::new();

    for page in site.all_content() {
        if page.collides_with_root() {
            continue;
        }
        let Some(from) = page.link_path() else {
            continue;
        };
        let to = page.url();
        if from == "/" || from == to {
            continue;
        }
        rules.entry(from).or_insert(to);
    }

    rules
        .into_iter()
        .map(|(from, to)| format!("{from} {to} 301\n"))
        .collect()
}

/// Write every metadata file into `output_dir` and return their paths.
pub fn emit_all(site: &SiteData, output_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let sitemap = Sitemap::from_site(site);
    let entries = sitemap.len();

    let files = [
        (SITEMAP_FILE, sitemap.into_xml()),
        (ROBOTS_FILE, robots_txt(site)),
        (HEADERS_FILE, headers_file()),
        (REDIRECTS_FILE, redirects_file(site)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)?;
        written.push(path);
    }

    log::info!("Wrote sitemap with {} urls", entries);
    Ok(written)
}

//! Renders every document of a site through the theme's templates.
//!
//! One index, one document per page and post, and one listing per category
//! that actually has posts. Only a failing index or an unusable output
//! directory stops the run; any other document that fails is logged and
//! skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::dates;
use crate::model::{Category, Page, PageKind, SiteData};
use crate::template::{
    CATEGORY_TEMPLATE, INDEX_TEMPLATE, PAGE_TEMPLATE, POST_TEMPLATE, TemplateError, TemplateSet,
};
use crate::transform::ContentRenderer;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to render the homepage: {0}")]
    Index(#[source] TemplateError),
}

/// What an assembly run produced.
#[derive(Debug, Default, Clone)]
pub struct AssembleReport {
    /// Written documents, relative to the output directory.
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    pub domain: String,
    pub base_url: String,
    pub title: Option<String>,
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub url: String,
    pub canonical: String,
    /// Posts on this site that reference the category.
    pub count: usize,
}

/// A page or post as templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: u64,
    pub kind: PageKind,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub canonical: String,
    /// `YYYY-MM-DD`, empty when unknown.
    pub date: String,
    /// e.g. `January 15, 2024`, empty when unknown.
    pub date_long: String,
    pub modified: String,
    pub author: Option<AuthorSummary>,
    pub categories: Vec<CategorySummary>,
    /// Rendered HTML.
    pub excerpt: String,
    /// Rendered HTML.
    pub content: String,
}

#[derive(Serialize)]
struct DocumentContext<'a> {
    site: &'a SiteSummary,
    pages: &'a [PageSummary],
    posts: &'a [PageSummary],
    categories: &'a [CategorySummary],
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<&'a PageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a CategorySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_posts: Option<Vec<&'a PageSummary>>,
}

pub struct Assembler<'a> {
    templates: &'a TemplateSet,
    output_dir: PathBuf,
    site_config: SiteConfig,
}

impl<'a> Assembler<'a> {
    pub fn new<P: AsRef<Path>>(templates: &'a TemplateSet, output_dir: P) -> Self {
        Self {
            templates,
            output_dir: output_dir.as_ref().to_path_buf(),
            site_config: SiteConfig::default(),
        }
    }

    pub fn site_config(mut self, config: SiteConfig) -> Self {
        self.site_config = config;
        self
    }

    pub fn assemble(&self, renderer: &ContentRenderer) -> Result<AssembleReport, AssembleError> {
        let site = renderer.site();

        std::fs::create_dir_all(&self.output_dir).map_err(|source| AssembleError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let summary = SiteSummary {
            domain: site.domain.clone(),
            base_url: site.base_url(),
            title: self.site_config.title.clone(),
            tagline: self.site_config.tagline.clone(),
        };
        let categories: Vec<CategorySummary> = site
            .listed_categories()
            .into_iter()
            .map(|category| summarize_category(site, category))
            .collect();
        let by_id: HashMap<u64, &CategorySummary> = categories.iter().map(|c| (c.id, c)).collect();
        let pages: Vec<PageSummary> = site
            .pages
            .iter()
            .map(|page| summarize_page(site, page, &by_id, renderer))
            .collect();
        let posts: Vec<PageSummary> = site
            .posts
            .iter()
            .map(|post| summarize_page(site, post, &by_id, renderer))
            .collect();

        let base = DocumentContext {
            site: &summary,
            pages: &pages,
            posts: &posts,
            categories: &categories,
            page: None,
            category: None,
            category_posts: None,
        };

        let mut report = AssembleReport::default();

        let index = PathBuf::from("index.html");
        self.templates
            .render_to_file(INDEX_TEMPLATE, &base, &self.output_dir.join(&index))
            .map_err(AssembleError::Index)?;
        report.written.push(index);

        let documents = site
            .pages
            .iter()
            .zip(&pages)
            .map(|(page, summary)| (page, summary, PAGE_TEMPLATE))
            .chain(
                site.posts
                    .iter()
                    .zip(&posts)
                    .map(|(post, summary)| (post, summary, POST_TEMPLATE)),
            );

        for (page, page_summary, template) in documents {
            if page.collides_with_root() {
                log::warn!(
                    "Skipping {} {:?}: its link {:?} points at the site root",
                    template,
                    page.title,
                    page.link.as_deref().unwrap_or_default()
                );
                report.skipped += 1;
                continue;
            }

            let context = DocumentContext {
                page: Some(page_summary),
                ..context_base(&base)
            };
            self.write(template, &context, page.output_file(), &mut report);
        }

        for category_summary in &categories {
            let Some(category) = site.categories.get(&category_summary.id) else {
                continue;
            };
            if category.slug.trim_matches('/').is_empty() {
                log::warn!("Skipping category {} without a slug", category.id);
                report.skipped += 1;
                continue;
            }

            let listed = site
                .posts
                .iter()
                .zip(&posts)
                .filter(|(post, _)| post.categories.contains(&category.id))
                .map(|(_, summary)| summary)
                .collect();
            let context = DocumentContext {
                category: Some(category_summary),
                category_posts: Some(listed),
                ..context_base(&base)
            };
            self.write(
                CATEGORY_TEMPLATE,
                &context,
                category.output_path().join("index.html"),
                &mut report,
            );
        }

        log::info!(
            "Rendered {} documents ({} skipped)",
            report.written.len(),
            report.skipped
        );
        Ok(report)
    }

    fn write(
        &self,
        template: &str,
        context: &DocumentContext,
        relative: PathBuf,
        report: &mut AssembleReport,
    ) {
        match self
            .templates
            .render_to_file(template, context, &self.output_dir.join(&relative))
        {
            Ok(()) => {
                log::debug!("Wrote {}", relative.display());
                report.written.push(relative);
            }
            Err(e) => {
                log::warn!("Failed to render {}: {}", relative.display(), e);
                report.skipped += 1;
            }
        }
    }
}

fn context_base<'a>(context: &DocumentContext<'a>) -> DocumentContext<'a> {
    DocumentContext {
        site: context.site,
        pages: context.pages,
        posts: context.posts,
        categories: context.categories,
        page: None,
        category: None,
        category_posts: None,
    }
}

fn summarize_category(site: &SiteData, category: &Category) -> CategorySummary {
    CategorySummary {
        id: category.id,
        name: category.name.clone(),
        slug: category.slug.clone(),
        description: category.description.clone(),
        url: category.url(),
        canonical: format!("{}{}", site.base_url(), category.url()),
        count: site.posts_in_category(category.id).count(),
    }
}

fn summarize_page(
    site: &SiteData,
    page: &Page,
    categories: &HashMap<u64, &CategorySummary>,
    renderer: &ContentRenderer,
) -> PageSummary {
    PageSummary {
        id: page.id,
        kind: page.kind,
        title: page.title.clone(),
        slug: page.slug.clone(),
        url: page.url(),
        canonical: page.canonical_url(&site.domain),
        date: dates::ymd(&page.date).unwrap_or_default(),
        date_long: long_date(page),
        modified: dates::ymd(&page.modified).unwrap_or_default(),
        author: site.authors.get(&page.author).map(|author| AuthorSummary {
            name: author.name.clone(),
            slug: author.slug.clone(),
        }),
        categories: page
            .real_categories()
            .filter_map(|id| categories.get(&id).map(|c| (*c).clone()))
            .collect(),
        excerpt: renderer.render(&page.excerpt),
        content: renderer.render(&page.content),
    }
}

fn long_date(page: &Page) -> String {
    if dates::is_unknown(&page.date) {
        String::new()
    } else {
        page.date.format("%B %-d, %Y").to_string()
    }
}

/// Copy a directory tree into `to`, returning the number of files copied.
/// A missing source directory copies nothing.
pub fn copy_tree(from: &Path, to: &Path) -> std::io::Result<usize> {
    if !from.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    log::debug!(
        "Copied {} files from {} to {}",
        copied,
        from.display(),
        to.display()
    );
    Ok(copied)
}

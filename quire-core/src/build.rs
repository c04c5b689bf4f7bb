//! One full, sequential generation run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::assemble::{AssembleError, Assembler, copy_tree};
use crate::config::Config;
use crate::emit;
use crate::loader::{self, LoadError};
use crate::postprocess::{self, PostProcessOptions};
use crate::shortcode::{ShortcodeError, ShortcodeRegistry};
use crate::template::{TemplateError, TemplateFunctions, TemplateSet};
use crate::transform::ContentRenderer;

/// Name of the template filter that runs the text pipeline.
pub const SAFE_HTML_FILTER: &str = "safe_html";

pub const ASSETS_DIR: &str = "assets";
pub const MEDIA_DIR: &str = "media";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Shortcodes(#[from] ShortcodeError),
    #[error("Failed to load templates: {0}")]
    Templates(#[from] TemplateError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory holding one sub-directory per site.
    pub content_root: PathBuf,
    /// The site to build, also its domain.
    pub source_name: String,
    pub theme_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: Config,
}

impl BuildOptions {
    pub fn new<P: AsRef<Path>>(content_root: P, source_name: &str) -> Self {
        Self {
            content_root: content_root.as_ref().to_path_buf(),
            source_name: source_name.to_string(),
            theme_dir: PathBuf::from("./theme"),
            output_dir: PathBuf::from("./public"),
            config: Config::default(),
        }
    }

    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn site_dir(&self) -> PathBuf {
        self.content_root.join(&self.source_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub pages: usize,
    pub posts: usize,
    pub written: usize,
    pub skipped: usize,
    pub assets_copied: usize,
    pub post_processed: usize,
    pub elapsed: Duration,
}

/// Load, render and write a whole site.
///
/// Stops at the first fatal error: unreadable metadata, a broken template
/// set, a failing homepage or an output directory that can't be created.
/// Anything else is logged and the document in question is left out.
pub fn build_site(options: &BuildOptions) -> Result<BuildSummary, BuildError> {
    let started = Instant::now();
    let build = &options.config.build;

    let mut site = loader::load(&options.content_root, &options.source_name)?;
    site.apply_url_format(build.url_format);

    let site_dir = options.site_dir();
    let shortcodes = ShortcodeRegistry::load_from_dir(&site_dir)?;
    let renderer = ContentRenderer::new(Arc::new(site), Arc::new(shortcodes));

    let filter = renderer.clone();
    let functions =
        TemplateFunctions::new().with(SAFE_HTML_FILTER, move |raw: &str| filter.render(raw));
    let templates = TemplateSet::load(&options.theme_dir, build.engine, &functions)?;

    let report = Assembler::new(&templates, &options.output_dir)
        .site_config(options.config.site.clone())
        .assemble(&renderer)?;

    let mut assets_copied = copy_tree(
        &options.theme_dir.join(ASSETS_DIR),
        &options.output_dir.join(ASSETS_DIR),
    )?;
    assets_copied += copy_tree(
        &site_dir.join(MEDIA_DIR),
        &options.output_dir.join(MEDIA_DIR),
    )?;

    let site = renderer.site();
    emit::emit_all(site, &options.output_dir)?;

    let post_options = PostProcessOptions::from_settings(build, &site.domain);
    let post_processed = postprocess::process_dir(&options.output_dir, &post_options)?;

    let summary = BuildSummary {
        pages: site.pages.len(),
        posts: site.posts.len(),
        written: report.written.len(),
        skipped: report.skipped,
        assets_copied,
        post_processed,
        elapsed: started.elapsed(),
    };
    log::info!(
        "Built {} in {:.2?}: {} documents written, {} skipped",
        site.domain,
        summary.elapsed,
        summary.written,
        summary.skipped
    );
    Ok(summary)
}

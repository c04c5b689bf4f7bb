//! Whole-file rewriters that run over the output tree once everything is
//! written. Every processor is idempotent, running it again changes nothing.

pub mod links;
pub mod minify;
pub mod prettify;

use std::path::Path;

use walkdir::WalkDir;

pub use links::{LinkRelativizer, relativize_links};
pub use minify::{minify_css, minify_html, minify_js};
pub use prettify::prettify_html;

use crate::config::BuildSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Html,
    Css,
    Js,
}

impl FileKind {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(FileKind::Html),
            "css" => Some(FileKind::Css),
            "js" | "mjs" => Some(FileKind::Js),
            _ => None,
        }
    }
}

/// `*.min.js` and `*.min.css` are left as shipped, apart from link rewriting.
fn is_preminified(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with(".min.js") || name.ends_with(".min.css")
}

/// Which processors to run.
#[derive(Debug, Clone, Default)]
pub struct PostProcessOptions {
    pub minify: bool,
    pub prettify: bool,
    /// Rewrite absolute links to this domain as root-relative.
    pub relative_domain: Option<String>,
}

impl PostProcessOptions {
    pub fn from_settings(settings: &BuildSettings, domain: &str) -> Self {
        Self {
            minify: settings.minify,
            prettify: settings.prettify,
            relative_domain: settings.relative_links.then(|| domain.to_string()),
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.minify && !self.prettify && self.relative_domain.is_none()
    }
}

/// Apply the selected processors to every HTML, CSS and JS file under
/// `dir`. Files are only rewritten when their content changes. Returns the
/// number of files rewritten.
pub fn process_dir(dir: &Path, options: &PostProcessOptions) -> std::io::Result<usize> {
    if options.is_noop() {
        return Ok(0);
    }
    if options.minify && options.prettify {
        log::debug!("Both minify and prettify requested, minifying");
    }

    let relativizer = match options.relative_domain.as_deref() {
        Some(domain) if !domain.trim().is_empty() => match LinkRelativizer::new(domain) {
            Ok(relativizer) => Some(relativizer),
            Err(e) => {
                log::warn!("Skipping link rewriting for {:?}: {}", domain, e);
                None
            }
        },
        _ => None,
    };

    let mut rewritten = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(kind) = FileKind::of(path) else {
            continue;
        };
        let preminified = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_preminified);

        let original = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let processed = process(&original, kind, preminified, options, relativizer.as_ref());
        if processed != original {
            std::fs::write(path, processed)?;
            log::debug!("Post-processed {}", path.display());
            rewritten += 1;
        }
    }

    log::info!("Post-processed {} files", rewritten);
    Ok(rewritten)
}

fn process(
    text: &str,
    kind: FileKind,
    preminified: bool,
    options: &PostProcessOptions,
    relativizer: Option<&LinkRelativizer>,
) -> String {
    let mut text = match (kind, relativizer) {
        (FileKind::Html | FileKind::Css, Some(relativizer)) => relativizer.apply(text),
        _ => text.to_string(),
    };

    if preminified {
        return text;
    }

    if options.minify {
        text = match kind {
            FileKind::Html => minify_html(&text),
            FileKind::Css => minify_css(&text),
            FileKind::Js => minify_js(&text),
        };
    } else if options.prettify && kind == FileKind::Html {
        text = prettify_html(&text);
    }
    text
}

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const PAGE_TEMPLATE: &str = "page.html";
pub const POST_TEMPLATE: &str = "post.html";
pub const CATEGORY_TEMPLATE: &str = "category.html";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template error: {}", error_chain(.0))]
    Tera(#[from] tera::Error),
    #[error("Template error: {0}")]
    MiniJinja(#[from] minijinja::Error),
    #[error("Template data error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No index.html template in {0}")]
    MissingIndex(PathBuf),
    #[error("Template '{0}' not found")]
    NotFound(String),
}

/// Tera keeps the useful part of its errors in the source chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Which engine renders the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Tera,
    Minijinja,
}

impl EngineKind {
    pub fn create(self) -> Box<dyn TemplateEngine> {
        match self {
            EngineKind::Tera => Box::new(TeraEngine::new()),
            EngineKind::Minijinja => Box::new(MiniJinjaEngine::new()),
        }
    }
}

pub type TemplateFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Named string filters made available to templates. Their output is
/// treated as safe HTML.
#[derive(Clone, Default)]
pub struct TemplateFunctions {
    functions: BTreeMap<String, TemplateFn>,
}

impl TemplateFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateFn)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }
}

/// A template source: its `/`-separated name and text.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub name: String,
    pub source: String,
}

/// Uniform contract over template engines. Everything the site assembler
/// needs is parsing a set of templates once and executing one by name.
pub trait TemplateEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parse all templates at once, so templates may extend or include
    /// each other regardless of load order.
    fn parse(
        &mut self,
        sources: Vec<TemplateSource>,
        functions: &TemplateFunctions,
    ) -> Result<(), TemplateError>;

    fn execute(
        &self,
        name: &str,
        data: &serde_json::Value,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError>;

    fn has_template(&self, name: &str) -> bool;
}

struct SafeFilter(TemplateFn);

impl tera::Filter for SafeFilter {
    fn filter(
        &self,
        value: &tera::Value,
        _args: &HashMap<String, tera::Value>,
    ) -> tera::Result<tera::Value> {
        let input = match value {
            tera::Value::String(s) => s.clone(),
            tera::Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(tera::Value::String((self.0)(&input)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

pub struct TeraEngine {
    tera: Tera,
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TeraEngine {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }
}

impl TemplateEngine for TeraEngine {
    fn name(&self) -> &'static str {
        "tera"
    }

    fn parse(
        &mut self,
        sources: Vec<TemplateSource>,
        functions: &TemplateFunctions,
    ) -> Result<(), TemplateError> {
        for (name, function) in functions.iter() {
            self.tera.register_filter(name, SafeFilter(function.clone()));
        }
        self.tera
            .add_raw_templates(sources.into_iter().map(|t| (t.name, t.source)))?;
        Ok(())
    }

    fn execute(
        &self,
        name: &str,
        data: &serde_json::Value,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        if !self.has_template(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let context = Context::from_value(data.clone())?;
        self.tera.render_to(name, &context, writer)?;
        Ok(())
    }

    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

pub struct MiniJinjaEngine {
    env: minijinja::Environment<'static>,
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        Self {
            env: minijinja::Environment::new(),
        }
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn name(&self) -> &'static str {
        "minijinja"
    }

    fn parse(
        &mut self,
        sources: Vec<TemplateSource>,
        functions: &TemplateFunctions,
    ) -> Result<(), TemplateError> {
        for (name, function) in functions.iter() {
            let function = function.clone();
            self.env.add_filter(name.to_string(), move |value: String| {
                minijinja::Value::from_safe_string(function(&value))
            });
        }
        for template in sources {
            self.env.add_template_owned(template.name, template.source)?;
        }
        Ok(())
    }

    fn execute(
        &self,
        name: &str,
        data: &serde_json::Value,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            minijinja::ErrorKind::TemplateNotFound => TemplateError::NotFound(name.to_string()),
            _ => TemplateError::MiniJinja(e),
        })?;
        let rendered = template.render(data)?;
        writer.write_all(rendered.as_bytes())?;
        Ok(())
    }

    fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

/// The theme's parsed templates, ready to render documents.
pub struct TemplateSet {
    engine: Box<dyn TemplateEngine>,
}

impl TemplateSet {
    pub fn new(engine: Box<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Parse every `*.html` file below `theme_dir`. The theme must provide
    /// an `index.html`; any template failing to parse fails the whole set.
    pub fn load<P: AsRef<Path>>(
        theme_dir: P,
        kind: EngineKind,
        functions: &TemplateFunctions,
    ) -> Result<Self, TemplateError> {
        let theme_dir = theme_dir.as_ref();
        let sources = read_templates(theme_dir)?;
        if !sources.iter().any(|t| t.name == INDEX_TEMPLATE) {
            return Err(TemplateError::MissingIndex(theme_dir.to_path_buf()));
        }

        let mut engine = kind.create();
        log::info!(
            "Parsing {} templates from {} with {}",
            sources.len(),
            theme_dir.display(),
            engine.name()
        );
        engine.parse(sources, functions)?;
        Ok(Self { engine })
    }

    pub fn from_sources<I, N, S>(
        kind: EngineKind,
        sources: I,
        functions: &TemplateFunctions,
    ) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let sources = sources
            .into_iter()
            .map(|(name, source)| TemplateSource {
                name: name.into(),
                source: source.into(),
            })
            .collect();
        let mut engine = kind.create();
        engine.parse(sources, functions)?;
        Ok(Self { engine })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.engine.has_template(name)
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, TemplateError> {
        let data = serde_json::to_value(data)?;
        let mut out = Vec::new();
        self.engine.execute(name, &data, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Render a template and write it to `output_path`, creating parent
    /// directories as needed.
    pub fn render_to_file<T: Serialize>(
        &self,
        name: &str,
        data: &T,
        output_path: &Path,
    ) -> Result<(), TemplateError> {
        let rendered = self.render(name, data)?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(output_path, rendered)?;
        Ok(())
    }
}

fn read_templates(theme_dir: &Path) -> Result<Vec<TemplateSource>, TemplateError> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(theme_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop in theme directory"))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }

        let Ok(relative) = path.strip_prefix(theme_dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        sources.push(TemplateSource {
            name,
            source: std::fs::read_to_string(path)?,
        });
    }

    Ok(sources)
}

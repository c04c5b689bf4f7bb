use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

pub const SHORTCODES_FILE: &str = "shortcodes.yaml";

#[derive(Error, Debug)]
pub enum ShortcodeError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

#[derive(Error, Debug)]
enum TemplateFailure {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Tera(#[from] tera::Error),
}

/// How a shortcode is rendered when it has no template of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShortcodeKind {
    Banner,
    Link,
    Image,
    #[default]
    Text,
    Custom(String),
}

impl From<String> for ShortcodeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "banner" => Self::Banner,
            "link" => Self::Link,
            "image" => Self::Image,
            "" | "text" => Self::Text,
            _ => Self::Custom(value),
        }
    }
}

impl From<ShortcodeKind> for String {
    fn from(value: ShortcodeKind) -> Self {
        match value {
            ShortcodeKind::Banner => "banner".into(),
            ShortcodeKind::Link => "link".into(),
            ShortcodeKind::Image => "image".into(),
            ShortcodeKind::Text => "text".into(),
            ShortcodeKind::Custom(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ShortcodeKind,
    /// Template file, relative to the directory of `shortcodes.yaml`.
    pub template: Option<PathBuf>,
    pub title: String,
    pub text: String,
    pub url: String,
    pub logo: String,
    pub legal: String,
    pub data: BTreeMap<String, String>,
}

/// Named shortcodes available to the text pipeline. Read-only during a build.
#[derive(Debug, Clone, Default)]
pub struct ShortcodeRegistry {
    shortcodes: HashMap<String, Shortcode>,
    template_root: PathBuf,
}

impl ShortcodeRegistry {
    pub fn new<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = Shortcode>,
    {
        Self {
            shortcodes: definitions
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            template_root: PathBuf::new(),
        }
    }

    pub fn with_template_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.template_root = root.as_ref().to_path_buf();
        self
    }

    /// Read a YAML list of shortcode definitions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ShortcodeError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ShortcodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definitions: Vec<Shortcode> =
            serde_yaml_ng::from_str(&data).map_err(|source| ShortcodeError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;

        log::info!("Loaded {} shortcodes from {}", definitions.len(), path.display());
        let root = path.parent().unwrap_or(Path::new("."));
        Ok(Self::new(definitions).with_template_root(root))
    }

    /// Like [`load`](Self::load), but an absent file means no shortcodes.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ShortcodeError> {
        let path = dir.as_ref().join(SHORTCODES_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn get(&self, name: &str) -> Option<&Shortcode> {
        self.shortcodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.shortcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcodes.is_empty()
    }

    /// HTML for the named shortcode, or `None` if it is not registered.
    pub fn render(&self, name: &str) -> Option<String> {
        let shortcode = self.get(name)?;

        if let Some(template) = &shortcode.template {
            match self.render_template(shortcode, template) {
                Ok(html) => return Some(html),
                Err(e) => log::warn!(
                    "Shortcode '{}' template {} failed, using built-in renderer: {}",
                    name,
                    template.display(),
                    e
                ),
            }
        }

        Some(render_builtin(shortcode))
    }

    /// Template output is trusted as-is.
    fn render_template(&self, shortcode: &Shortcode, template: &Path) -> Result<String, TemplateFailure> {
        let source = std::fs::read_to_string(self.template_root.join(template))?;

        let mut context = Context::new();
        for (key, value) in &shortcode.data {
            context.insert(key.as_str(), value);
        }
        context.insert("name", &shortcode.name);
        context.insert("type", &String::from(shortcode.kind.clone()));
        context.insert("title", &shortcode.title);
        context.insert("text", &shortcode.text);
        context.insert("url", &shortcode.url);
        context.insert("logo", &shortcode.logo);
        context.insert("legal", &shortcode.legal);
        context.insert("data", &shortcode.data);

        Ok(Tera::one_off(&source, &context, false)?)
    }
}

pub fn render_builtin(shortcode: &Shortcode) -> String {
    match shortcode.kind {
        ShortcodeKind::Banner => render_banner(shortcode),
        ShortcodeKind::Link => render_link(shortcode),
        ShortcodeKind::Image => render_image(shortcode),
        ShortcodeKind::Text | ShortcodeKind::Custom(_) => render_plain(shortcode),
    }
}

fn render_banner(s: &Shortcode) -> String {
    let mut html = String::from("<div class=\"shortcode-banner\">");

    if !s.logo.is_empty() {
        html.push_str(&format!(
            "<img class=\"shortcode-banner-logo\" src=\"{}\" alt=\"{}\">",
            encode_double_quoted_attribute(&s.logo),
            encode_double_quoted_attribute(&s.title)
        ));
    }
    if !s.title.is_empty() {
        html.push_str(&format!("<h3>{}</h3>", encode_text(&s.title)));
    }
    if !s.text.is_empty() {
        html.push_str(&format!("<p>{}</p>", encode_text(&s.text)));
    }
    if !s.url.is_empty() {
        let label = s.data.get("button").map(String::as_str).unwrap_or("Learn more");
        html.push_str(&format!(
            "<a class=\"shortcode-banner-button\" href=\"{}\">{}</a>",
            s.url,
            encode_text(label)
        ));
    }
    if !s.legal.is_empty() {
        html.push_str(&format!("<small>{}</small>", encode_text(&s.legal)));
    }

    html.push_str("</div>");
    html
}

fn render_link(s: &Shortcode) -> String {
    let label = if s.text.is_empty() { &s.title } else { &s.text };
    format!(
        "<a class=\"shortcode-link\" href=\"{}\">{}</a>",
        encode_double_quoted_attribute(&s.url),
        encode_text(label)
    )
}

fn render_image(s: &Shortcode) -> String {
    let img = format!(
        "<img class=\"shortcode-image\" src=\"{}\" alt=\"{}\">",
        encode_double_quoted_attribute(&s.url),
        encode_double_quoted_attribute(&s.title)
    );
    match s.data.get("href") {
        Some(href) => format!("<a href=\"{}\">{}</a>", encode_double_quoted_attribute(href), img),
        None => img,
    }
}

fn render_plain(s: &Shortcode) -> String {
    let label = [&s.text, &s.title, &s.url]
        .into_iter()
        .find(|v| !v.is_empty());

    match (s.url.is_empty(), label) {
        (false, Some(label)) => format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&s.url),
            encode_text(label)
        ),
        (true, Some(label)) => encode_text(label).into_owned(),
        (_, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn promo() -> Shortcode {
        Shortcode {
            name: "promo".into(),
            kind: ShortcodeKind::Banner,
            title: "Save <50%>".into(),
            text: "Fish & chips".into(),
            url: "https://shop.example.com/?a=1&b=2".into(),
            legal: "T&C apply".into(),
            ..Shortcode::default()
        }
    }

    #[test]
    fn banner_escapes_text_but_not_href() {
        let html = render_builtin(&promo());
        assert!(html.starts_with("<div class=\"shortcode-banner\">"));
        assert!(html.contains("<h3>Save &lt;50%&gt;</h3>"));
        assert!(html.contains("<p>Fish &amp; chips</p>"));
        assert!(html.contains("<small>T&amp;C apply</small>"));
        assert!(html.contains("href=\"https://shop.example.com/?a=1&b=2\""));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn link_prefers_text_over_title() {
        let s = Shortcode {
            kind: ShortcodeKind::Link,
            title: "Title".into(),
            text: "Click <here>".into(),
            url: "/x/".into(),
            ..Shortcode::default()
        };
        assert_eq!(
            render_builtin(&s),
            "<a class=\"shortcode-link\" href=\"/x/\">Click &lt;here&gt;</a>"
        );
    }

    #[test]
    fn image_wraps_in_link_when_href_given() {
        let mut s = Shortcode {
            kind: ShortcodeKind::Image,
            title: "A \"cat\"".into(),
            url: "/media/cat.jpg".into(),
            ..Shortcode::default()
        };
        assert!(render_builtin(&s).starts_with("<img class=\"shortcode-image\""));
        assert!(render_builtin(&s).contains("alt=\"A &quot;cat&quot;\""));

        s.data.insert("href".into(), "/cats/".into());
        assert!(render_builtin(&s).starts_with("<a href=\"/cats/\"><img"));
    }

    #[test]
    fn custom_kind_falls_back_to_link_text_or_nothing() {
        let mut s = Shortcode {
            kind: ShortcodeKind::Custom("widget".into()),
            text: "Hello".into(),
            ..Shortcode::default()
        };
        assert_eq!(render_builtin(&s), "Hello");
        s.url = "https://example.com/".into();
        assert_eq!(render_builtin(&s), "<a href=\"https://example.com/\">Hello</a>");
        assert_eq!(render_builtin(&Shortcode::default()), "");
    }

    #[test]
    fn unknown_names_render_nothing() {
        let registry = ShortcodeRegistry::new([promo()]);
        assert!(registry.render("promo").is_some());
        assert!(registry.render("nope").is_none());
    }

    #[test]
    fn loads_yaml_and_renders_templates() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SHORTCODES_FILE),
            "- name: promo\n  type: banner\n  title: Deal\n  url: /deal/\n\
             - name: cta\n  type: widget\n  template: cta.html\n  text: Buy\n  data:\n    color: red\n\
             - name: broken\n  type: link\n  template: missing.html\n  text: Fallback\n  url: /f/\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("cta.html"),
            "<button class=\"{{ color }}\">{{ text }}</button>",
        )
        .unwrap();

        let registry = ShortcodeRegistry::load_from_dir(tmp.path()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("cta").unwrap().kind, ShortcodeKind::Custom("widget".into()));
        assert_eq!(
            registry.render("cta").unwrap(),
            "<button class=\"red\">Buy</button>"
        );
        assert_eq!(
            registry.render("broken").unwrap(),
            "<a class=\"shortcode-link\" href=\"/f/\">Fallback</a>"
        );
    }

    #[test]
    fn absent_file_is_an_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let registry = ShortcodeRegistry::load_from_dir(tmp.path()).unwrap();
        assert!(registry.is_empty());
    }
}

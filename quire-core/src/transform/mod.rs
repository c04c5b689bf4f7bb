//! The text pipeline that turns a raw Markdown body into embeddable HTML.
//!
//! Each stage is a plain `&str -> String` function. They run in a fixed
//! order, later stages rely on what earlier ones produce:
//!
//! 1. [`substitute_shortcodes`] expands `{{name}}` tokens
//! 2. [`cleanup_markdown`] removes exporter artifacts
//! 3. [`autolink_list_items`] links list items named after known pages
//! 4. [`markdown_to_html`] converts to HTML
//! 5. [`normalize_media_paths`] rewrites media references in the HTML

pub mod autolink;
pub mod cleanup;
pub mod markdown;
pub mod media;
pub mod shortcodes;

use std::sync::Arc;

pub use autolink::{TitleIndex, autolink_list_items};
pub use cleanup::cleanup_markdown;
pub use markdown::markdown_to_html;
pub use media::normalize_media_paths;
pub use shortcodes::substitute_shortcodes;

use crate::model::SiteData;
use crate::shortcode::ShortcodeRegistry;

/// Runs the whole pipeline against one site's data and shortcodes.
#[derive(Clone)]
pub struct ContentRenderer {
    site: Arc<SiteData>,
    shortcodes: Arc<ShortcodeRegistry>,
    titles: Arc<TitleIndex>,
}

impl ContentRenderer {
    pub fn new(site: Arc<SiteData>, shortcodes: Arc<ShortcodeRegistry>) -> Self {
        let titles = Arc::new(TitleIndex::from_site(&site));
        Self {
            site,
            shortcodes,
            titles,
        }
    }

    pub fn site(&self) -> &SiteData {
        &self.site
    }

    pub fn render(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let text = substitute_shortcodes(raw, &self.shortcodes);
        let text = cleanup_markdown(&text);
        let text = autolink_list_items(&text, &self.titles);

        let html = match markdown_to_html(&text) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Markdown conversion failed, using raw text: {}", e);
                text
            }
        };

        normalize_media_paths(&html, &self.site.media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaDetails, MediaItem, Page};
    use crate::shortcode::{Shortcode, ShortcodeKind};

    fn renderer() -> ContentRenderer {
        let mut site = SiteData {
            domain: "example.com".into(),
            pages: vec![Page {
                title: "Contact".into(),
                slug: "contact".into(),
                ..Page::default()
            }],
            ..SiteData::default()
        };
        site.media.insert(
            3,
            MediaItem {
                id: 3,
                media_details: MediaDetails {
                    file: "2019/01/logo.png".into(),
                    ..MediaDetails::default()
                },
                ..MediaItem::default()
            },
        );
        let shortcodes = ShortcodeRegistry::new([Shortcode {
            name: "promo".into(),
            kind: ShortcodeKind::Banner,
            title: "Sale".into(),
            url: "/sale/".into(),
            ..Shortcode::default()
        }]);
        ContentRenderer::new(Arc::new(site), Arc::new(shortcodes))
    }

    #[test]
    fn bold_in_html_right_after_a_paragraph() {
        let html =
            renderer().render("Intro line\n<div class=\"note\">**Important** stuff</div>\n");
        assert!(html.contains("<p>Intro line</p>"));
        assert!(html.contains("<div class=\"note\"><strong>Important</strong> stuff</div>"));
        assert!(!html.contains("**"));
    }

    #[test]
    fn runs_all_stages_in_order() {
        let raw = "Intro\n\n**\n\n{{promo}}\n\n- Contact\n- Elsewhere\n\n\
                   <img class=\"wp-image-3\" src=\"http://old.example.com/up/logo-150x150.png\">\n";
        let html = renderer().render(raw);

        assert!(html.contains("<p>Intro</p>"));
        assert!(!html.contains("**"));
        assert!(html.contains("<div class=\"shortcode-banner\"><h3>Sale</h3>"));
        assert!(html.contains("<li><a href=\"/contact/\">Contact</a></li>"));
        assert!(html.contains("<li>Elsewhere</li>"));
        assert!(html.contains("src=\"/media/3_logo.png\""));
    }

    #[test]
    fn empty_body_renders_nothing() {
        assert_eq!(renderer().render("  \n"), "");
    }

    #[test]
    fn unknown_shortcodes_survive_conversion() {
        let html = renderer().render("Hello {{nope}}");
        assert_eq!(html, "<p>Hello {{nope}}</p>\n");
    }
}

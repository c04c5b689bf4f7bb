use std::collections::HashMap;
use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::{Captures, Regex};

use crate::model::SiteData;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*[-*][ \t]+)(.+?)[ \t]*$").unwrap());

/// Page and post titles mapped to their URLs. The first title registered
/// wins, pages before posts.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    urls: HashMap<String, String>,
}

impl TitleIndex {
    pub fn from_site(site: &SiteData) -> Self {
        let mut urls = HashMap::new();
        for page in site.all_content() {
            let title = page.title.trim();
            if title.is_empty() {
                continue;
            }
            let url = page.url();
            urls.entry(title.to_string()).or_insert_with(|| url.clone());
            urls.entry(decode_html_entities(title).into_owned())
                .or_insert(url);
        }
        Self { urls }
    }

    /// Exact lookup, trying the text as-is and then entity-decoded.
    pub fn lookup(&self, text: &str) -> Option<&str> {
        let text = text.trim();
        self.urls
            .get(text)
            .or_else(|| self.urls.get(decode_html_entities(text).as_ref()))
            .map(String::as_str)
    }
}

/// Turn list items whose text is exactly a known title into Markdown links.
pub fn autolink_list_items(input: &str, titles: &TitleIndex) -> String {
    if titles.urls.is_empty() {
        return input.to_string();
    }

    LIST_ITEM
        .replace_all(input, |caps: &Captures| {
            let text = &caps[2];
            match titles.lookup(text) {
                Some(url) => format!("{}[{}]({})", &caps[1], text.trim(), url),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

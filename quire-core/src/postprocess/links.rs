use regex::{Captures, Regex};

/// Rewrites absolute references to one domain as root-relative paths.
pub struct LinkRelativizer {
    attributes: Regex,
    css_urls: Regex,
}

impl LinkRelativizer {
    pub fn new(domain: &str) -> Result<Self, regex::Error> {
        let domain = regex::escape(domain.trim().trim_end_matches('/'));

        let attributes = Regex::new(&format!(
            r#"\b(href|src|action)=(["'])(?:https?:)?//(?i:{domain})([/?#][^"']*)?(["'])"#
        ))?;
        let css_urls = Regex::new(&format!(
            r#"url\((\s*["']?)(?:https?:)?//(?i:{domain})([/?#][^"')\s]*)?(["']?\s*)\)"#
        ))?;

        Ok(Self {
            attributes,
            css_urls,
        })
    }

    pub fn apply(&self, input: &str) -> String {
        let out = self.attributes.replace_all(input, |caps: &Captures| {
            format!(
                "{}={}{}{}",
                &caps[1],
                &caps[2],
                root_relative(caps.get(3).map_or("", |m| m.as_str())),
                &caps[4]
            )
        });
        self.css_urls
            .replace_all(&out, |caps: &Captures| {
                format!(
                    "url({}{}{})",
                    &caps[1],
                    root_relative(caps.get(2).map_or("", |m| m.as_str())),
                    &caps[3]
                )
            })
            .into_owned()
    }
}

fn root_relative(rest: &str) -> String {
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    }
}

/// One-off form of [`LinkRelativizer`]. An empty domain leaves the input
/// untouched.
pub fn relativize_links(input: &str, domain: &str) -> String {
    if domain.trim().is_empty() {
        return input.to_string();
    }
    match LinkRelativizer::new(domain) {
        Ok(relativizer) => relativizer.apply(input),
        Err(e) => {
            log::warn!("Not rewriting links for {:?}: {}", domain, e);
            input.to_string()
        }
    }
}

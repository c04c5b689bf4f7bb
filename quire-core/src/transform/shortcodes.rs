use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::shortcode::ShortcodeRegistry;

static SHORTCODE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap());

/// Replace `{{name}}` tokens with the rendered shortcode. Names the registry
/// doesn't know stay in the text untouched.
pub fn substitute_shortcodes(input: &str, registry: &ShortcodeRegistry) -> String {
    if registry.is_empty() || !input.contains("{{") {
        return input.to_string();
    }

    SHORTCODE_TOKEN
        .replace_all(input, |caps: &Captures| {
            registry
                .render(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

use std::sync::LazyLock;

use regex::Regex;

/// A line holding nothing but a single `**` marker, left behind by exporters.
static ORPHAN_BOLD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*\*\*[ \t]*$").unwrap());

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap());

/// Opening of a code fence: three or more backticks or tildes.
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap());

/// HTML that may start a block straight after a paragraph line.
static INTERRUPTING_HTML: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^ {0,3}(?:",
        r"<(?:script|pre|style|textarea)(?:[\s>]|$)",
        r"|<!--|<\?|<![A-Za-z]|<!\[CDATA\[",
        r"|</?(?:address|article|aside|base|basefont|blockquote|body|caption|center|col",
        r"|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer",
        r"|form|frame|frameset|h[1-6]|head|header|hr|html|iframe|legend|li|link|main",
        r"|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary",
        r"|table|tbody|td|tfoot|th|thead|title|tr|track|ul)(?:[\s>]|/>|$)",
        r")"
    ))
    .unwrap()
});

/// Fix up Markdown artifacts before conversion.
///
/// Orphaned `**` lines are dropped. Bold markup inside raw HTML blocks is
/// turned into `<strong>` here, since the Markdown converter leaves HTML
/// blocks alone. Fenced code is copied through untouched.
pub fn cleanup_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_html_block = false;
    let mut previous_blank = true;
    let mut fence: Option<&str> = None;

    for line in input.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some(marker) = fence {
            if closes_fence(content, marker) {
                fence = None;
                previous_blank = false;
            }
            out.push_str(line);
            continue;
        }

        if ORPHAN_BOLD_LINE.is_match(content) {
            continue;
        }

        let blank = content.trim().is_empty();
        if blank {
            in_html_block = false;
        } else if !in_html_block {
            if let Some(marker) = FENCE.captures(content).and_then(|c| c.get(1)) {
                fence = Some(marker.as_str());
                out.push_str(line);
                previous_blank = false;
                continue;
            }
            in_html_block = if previous_blank {
                starts_html_block(content)
            } else {
                INTERRUPTING_HTML.is_match(content)
            };
        }

        if in_html_block && line.contains("**") {
            out.push_str(&BOLD.replace_all(line, "<strong>$1</strong>"));
        } else {
            out.push_str(line);
        }

        previous_blank = blank;
    }

    out
}

/// CommonMark starts an HTML block on a line beginning with `<` indented by
/// fewer than four spaces.
fn starts_html_block(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    indent < 4 && line.trim_start().starts_with('<')
}

/// A closing fence uses the opening character at least as many times and
/// nothing else.
fn closes_fence(line: &str, marker: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let trimmed = line.trim();
    let Some(ch) = marker.chars().next() else {
        return false;
    };
    indent < 4 && trimmed.len() >= marker.len() && trimmed.chars().all(|c| c == ch)
}

use std::sync::LazyLock;

use regex::{Captures, Regex};

static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--(.*?)-->").unwrap());
static KEPT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--quire-keep:(\d+)-->").unwrap());
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());
static CSS_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([:;{},])\s*").unwrap());

static JS_LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*//.*$").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());

/// Conditional comments are how old IE targeting works, they have to
/// survive minification byte for byte.
fn is_conditional(comment_body: &str) -> bool {
    comment_body.starts_with("[if") || comment_body.starts_with("<![endif]")
}

pub fn minify_html(input: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    let html = HTML_COMMENT.replace_all(input, |caps: &Captures| {
        if is_conditional(&caps[1]) {
            kept.push(caps[0].to_string());
            format!("<!--quire-keep:{}-->", kept.len() - 1)
        } else {
            String::new()
        }
    });

    let html = BETWEEN_TAGS.replace_all(&html, "><");
    let html = WHITESPACE_RUN.replace_all(&html, " ");
    let html = html.trim();

    if kept.is_empty() {
        return html.to_string();
    }
    KEPT_COMMENT
        .replace_all(html, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| kept.get(index))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

pub fn minify_css(input: &str) -> String {
    let css = BLOCK_COMMENT.replace_all(input, "");
    let css = NEWLINES.replace_all(&css, "");
    let css = CSS_PUNCTUATION.replace_all(&css, "$1");
    css.trim().to_string()
}

/// Line based and not a parser: `//` or `/* */` inside string literals gets
/// stripped as well.
pub fn minify_js(input: &str) -> String {
    let js = BLOCK_COMMENT.replace_all(input, "");
    let js = JS_LINE_COMMENT.replace_all(&js, "");
    let js = BLANK_LINES.replace_all(&js, "\n");
    js.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_comments_and_whitespace_go() {
        let input = "<html>\n  <head>\n    <!-- build 42 -->\n    <title>Hi   there</title>\n  </head>\n</html>\n";
        assert_eq!(
            minify_html(input),
            "<html><head><title>Hi there</title></head></html>"
        );
    }

    #[test]
    fn conditional_comments_are_kept_verbatim() {
        let cc = "<!--[if lt IE 9]>\n  <script src=\"html5shiv.js\"></script>\n<![endif]-->";
        let input = format!("<head>\n  {cc}\n  <!-- drop me -->\n  <meta charset=\"utf-8\">\n</head>");
        let out = minify_html(&input);
        assert_eq!(out, format!("<head>{cc}<meta charset=\"utf-8\"></head>"));
        assert_eq!(minify_html(&out), out);
    }

    #[test]
    fn downlevel_revealed_comments_survive() {
        let input = "<!--[if !IE]><!--><p>modern</p><!--<![endif]-->";
        assert_eq!(minify_html(input), input);
    }

    #[test]
    fn single_newlines_inside_text_stay() {
        assert_eq!(minify_html("<p>a\nb</p>"), "<p>a\nb</p>");
    }

    #[test]
    fn html_minify_is_idempotent() {
        let input = "  <div>\n\n <span> x  </span>\t<!-- c --></div>  ";
        let once = minify_html(input);
        assert_eq!(once, "<div><span> x </span></div>");
        assert_eq!(minify_html(&once), once);
    }

    #[test]
    fn css() {
        let input = "/* header */\nbody {\n  color : red ;\n  margin: 0 auto;\n}\n\na , b { x: y }\n";
        let once = minify_css(input);
        assert_eq!(once, "body{color:red;margin:0 auto;}a,b{x:y}");
        assert_eq!(minify_css(&once), once);
    }

    #[test]
    fn js() {
        let input = "// setup\nvar a = 1;\n\n\n  // note\n/* block\n comment */\nfunction f() {\n  return a; // trailing stays\n}\n";
        let once = minify_js(input);
        assert_eq!(
            once,
            "var a = 1;\nfunction f() {\n  return a; // trailing stays\n}"
        );
        assert_eq!(minify_js(&once), once);
    }

    #[test]
    fn js_string_literals_are_not_protected() {
        let out = minify_js("var u = \"http://x\";\nvar c = \"/* not a comment */\";");
        assert_eq!(out, "var u = \"http://x\";\nvar c = \"\";");
    }
}

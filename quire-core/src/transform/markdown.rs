use pulldown_cmark::{Options, Parser, html};

/// CommonMark plus tables and strikethrough. Raw HTML is passed through,
/// legacy content depends on it.
pub fn markdown_to_html(input: &str) -> Result<String, std::fmt::Error> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(input, options);
    let mut out = String::with_capacity(input.len() * 3 / 2);
    html::write_html_fmt(&mut out, parser)?;
    Ok(out)
}

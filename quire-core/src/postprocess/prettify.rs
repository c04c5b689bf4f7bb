/// Normalize line endings, drop blank lines and trailing whitespace, and end
/// with exactly one newline. Blank lines inside `<pre>` go too.
pub fn prettify_html(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(normalized.len());
    for line in normalized.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

use crate::block::Block;

/// Line ending used by `source`: `"\r\n"` when its first line ends that way,
/// `"\n"` otherwise.
pub fn detect_line_ending(source: &str) -> &'static str {
    match source.find('\n') {
        Some(i) if source[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Write blocks back out as Markdown with `\n` line endings.
pub fn render_markdown<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    render_markdown_with(blocks, "\n")
}

/// Write blocks back out as Markdown.
///
/// Each block's source text is reused verbatim; blocks are separated by a
/// single blank line and the output ends with `line_ending` unless it is empty.
pub fn render_markdown_with<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    line_ending: &str,
) -> String {
    let mut out = String::new();
    for block in blocks {
        if !out.is_empty() {
            out.push_str(line_ending);
            out.push_str(line_ending);
        }
        out.push_str(&block.text);
    }
    if !out.is_empty() {
        out.push_str(line_ending);
    }
    out
}

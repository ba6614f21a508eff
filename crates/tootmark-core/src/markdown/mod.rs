//! Renderer for the constrained Markdown dialect used in local statuses.
//!
//! Rendering works over a flat array of [`Line`] records. Each pass walks
//! the array with an index cursor and replaces the lines it recognizes with
//! [`Line::Html`] records; later passes only look at the remaining
//! [`Line::Raw`] ones. The passes run in this order:
//!
//! 1. fenced and indented code blocks,
//! 2. blockquotes, one `>` level per iteration,
//! 3. headings, horizontal rules, lists and plain text lines.
//!
//! All user text ends up entity-encoded, so every `<` in the output belongs
//! to an element produced here. Renderer-produced links and images carry
//! the [`LINK_MARKER`](crate::link_codec::LINK_MARKER) attribute.

mod block;
mod inline;
mod list;
mod quote;

pub use inline::render_inline;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Line {
    /// Source text not yet claimed by any construct.
    Raw(String),
    /// Finished markup; may itself contain newlines.
    Html(String),
}

impl Line {
    pub(crate) fn raw(&self) -> Option<&str> {
        match self {
            Line::Raw(text) => Some(text),
            Line::Html(_) => None,
        }
    }
}

/// Renders `text` to HTML. Never fails: constructs that do not parse are
/// kept as (escaped) literal text.
pub fn render(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<Line> = normalized
        .split('\n')
        .map(|line| Line::Raw(line.to_string()))
        .collect();

    let lines = block::fold_code_blocks(lines);
    let lines = quote::collapse_quotes(lines);
    let lines = block::render_blocks(lines);

    let mut out = String::with_capacity(normalized.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        match line {
            Line::Html(html) => out.push_str(html),
            Line::Raw(text) => out.push_str(&render_inline(text)),
        }
    }
    tracing::trace!(input_len = text.len(), output_len = out.len(), "rendered markdown");
    out
}

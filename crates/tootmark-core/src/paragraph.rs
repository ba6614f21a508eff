//! Paragraph formatting for rendered status HTML.

use crate::tag_scan::{Vocabulary, outermost_tags};

const BLOCK_TAGS: Vocabulary = Vocabulary {
    paired: &[
        "ul",
        "ol",
        "blockquote",
        "pre",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
    ],
    void: &["hr"],
};

/// Wraps text runs between block elements in `<p>` (split on blank lines)
/// and turns single newlines into `<br />`. All newlines outside `<pre>`
/// are dropped from the result.
pub fn simple_format(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut out = String::with_capacity(html.len() + 16);
    let mut last = 0usize;
    for block in outermost_tags(&chars, BLOCK_TAGS) {
        push_paragraphs(&mut out, &collect(&chars[last..block.span.start]));
        let element = collect(&chars[block.span.start..block.span.end]);
        match block.name {
            "pre" => out.push_str(&element),
            "blockquote" => out.push_str(&format_blockquote(&element)),
            _ => out.push_str(&element.replace('\n', "")),
        }
        last = block.span.end;
    }
    push_paragraphs(&mut out, &collect(&chars[last..]));
    out
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn format_blockquote(element: &str) -> String {
    let open_end = element.find('>').map_or(0, |pos| pos + 1);
    let close_start = element.rfind("</").unwrap_or(element.len());
    if open_end > close_start {
        return element.replace('\n', "");
    }
    format!(
        "{}{}{}",
        &element[..open_end],
        simple_format(&element[open_end..close_start]),
        &element[close_start..]
    )
}

fn push_paragraphs(out: &mut String, text: &str) {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraph: Vec<&str> = Vec::new();
    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            push_paragraph(out, &paragraph);
            paragraph.clear();
        } else {
            paragraph.push(line);
        }
    }
    push_paragraph(out, &paragraph);
}

fn push_paragraph(out: &mut String, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    out.push_str("<p>");
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 && !lines[idx - 1].ends_with("<br />") {
            out.push_str("<br />");
        }
        out.push_str(line);
    }
    out.push_str("</p>");
}

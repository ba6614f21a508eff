use super::Line;
use super::inline::render_inline;
use super::list::{ListLine, parse_list_line, render_list};
use crate::escape::escape_html;

/// Replaces fenced and indented code blocks with `<pre><code>` records.
/// An unterminated fence stays raw text.
pub(super) fn fold_code_blocks(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if let Some((html, next)) = parse_fenced_code(&lines, i) {
            out.push(Line::Html(html));
            i = next;
            continue;
        }
        let after_blank = out
            .last()
            .is_none_or(|line: &Line| line.raw().is_some_and(|text| text.trim().is_empty()));
        let list_item = lines[i].raw().is_some_and(|text| parse_list_line(text).is_some());
        if after_blank
            && !list_item
            && let Some((html, next)) = parse_indented_code(&lines, i)
        {
            out.push(Line::Html(html));
            i = next;
            continue;
        }
        out.push(lines[i].clone());
        i += 1;
    }
    out
}

fn parse_fenced_code(lines: &[Line], start: usize) -> Option<(String, usize)> {
    let (indent_len, fence_len, fence_char, info) = parse_fence_open(lines[start].raw()?)?;
    let mut body: Vec<&str> = Vec::new();
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        let text = line.raw()?;
        if is_fence_close(text, fence_len, fence_char) {
            return Some((code_block_html(&body.join("\n"), info), start + offset + 2));
        }
        body.push(strip_leading_spaces(text, indent_len));
    }
    None
}

fn parse_indented_code(lines: &[Line], start: usize) -> Option<(String, usize)> {
    let first = lines[start].raw()?;
    if first.trim().is_empty() || strip_code_indent(first).is_none() {
        return None;
    }
    let mut body: Vec<&str> = Vec::new();
    let mut pending_blank = 0usize;
    let mut i = start;
    while i < lines.len() {
        let Some(text) = lines[i].raw() else {
            break;
        };
        if text.trim().is_empty() {
            pending_blank += 1;
            i += 1;
            continue;
        }
        let Some(content) = strip_code_indent(text) else {
            break;
        };
        body.extend(std::iter::repeat_n("", pending_blank));
        pending_blank = 0;
        body.push(content);
        i += 1;
    }
    // Trailing blank lines belong to the surrounding text.
    Some((code_block_html(&body.join("\n"), None), i - pending_blank))
}

fn code_block_html(body: &str, lang: Option<String>) -> String {
    let class = lang
        .map(|value| format!(" class=\"language-{}\"", value))
        .unwrap_or_default();
    format!("<pre><code{}>{}</code></pre>", class, escape_html(body))
}

/// Renders headings, horizontal rules, lists and plain text lines.
pub(super) fn render_blocks(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let Some(text) = lines[i].raw() else {
            out.push(lines[i].clone());
            i += 1;
            continue;
        };

        if is_text_line(text)
            && let Some(level) = lines
                .get(i + 1)
                .and_then(Line::raw)
                .and_then(setext_underline_level)
        {
            out.push(Line::Html(heading_html(level, text.trim())));
            i += 2;
            continue;
        }

        if is_thematic_break_line(text) {
            out.push(Line::Html("<hr />".to_string()));
            i += 1;
            continue;
        }

        if let Some((level, content_start, content_end)) = parse_atx_heading(text) {
            out.push(Line::Html(heading_html(
                level,
                &text[content_start..content_end],
            )));
            i += 1;
            continue;
        }

        if parse_list_line(text).is_some() {
            let (items, next) = collect_list_run(&lines, i);
            out.push(Line::Html(render_list(&items)));
            i = next;
            continue;
        }

        let has_newline = i + 1 < lines.len();
        out.push(Line::Html(text_line_html(text, has_newline)));
        i += 1;
    }
    out
}

fn collect_list_run(lines: &[Line], start: usize) -> (Vec<ListLine>, usize) {
    let mut items = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let Some(text) = lines[i].raw() else {
            break;
        };
        if is_thematic_break_line(text) {
            break;
        }
        let Some(mut item) = parse_list_line(text) else {
            break;
        };
        let (content, hard_break) = split_hard_break(&item.content, i + 1 < lines.len());
        if hard_break {
            item.content = content.to_string();
            item.hard_break = true;
        }
        items.push(item);
        i += 1;
    }
    (items, i)
}

fn heading_html(level: u8, content: &str) -> String {
    format!("<h{level}>{}</h{level}>", render_inline(content))
}

fn text_line_html(text: &str, has_newline: bool) -> String {
    match split_hard_break(text, has_newline) {
        (body, true) => format!("{}<br />", render_inline(body)),
        (body, false) => render_inline(body),
    }
}

/// Strips a trailing double space (half or full width) that is followed by
/// a newline, reporting whether a `<br />` is due.
fn split_hard_break(text: &str, has_newline: bool) -> (&str, bool) {
    if has_newline {
        for suffix in ["  ", "\u{3000}\u{3000}"] {
            if let Some(body) = text.strip_suffix(suffix) {
                return (body, true);
            }
        }
    }
    (text, false)
}

fn is_text_line(text: &str) -> bool {
    !text.trim().is_empty()
        && !is_thematic_break_line(text)
        && parse_atx_heading(text).is_none()
        && parse_list_line(text).is_none()
}

fn strip_indent_up_to(text: &str, max_cols: usize) -> Option<&str> {
    let mut cols = 0;
    for (pos, byte) in text.bytes().enumerate() {
        cols = match byte {
            b' ' => cols + 1,
            b'\t' => cols + 4 - (cols % 4),
            _ => return Some(&text[pos..]),
        };
        if cols > max_cols {
            return None;
        }
    }
    Some("")
}

/// Strips four columns of indentation (or one tab) from a code line.
fn strip_code_indent(text: &str) -> Option<&str> {
    if let Some(rest) = text.strip_prefix('\t') {
        return Some(rest);
    }
    text.strip_prefix("    ")
}

fn strip_leading_spaces(text: &str, max: usize) -> &str {
    let skip = text.bytes().take(max).take_while(|b| *b == b' ').count();
    &text[skip..]
}

fn parse_fence_open(text: &str) -> Option<(usize, usize, u8, Option<String>)> {
    let trimmed = strip_indent_up_to(text, 3)?;
    let indent_len = text.len() - trimmed.len();
    let fence_char = if trimmed.starts_with("```") {
        b'`'
    } else if trimmed.starts_with("~~~") {
        b'~'
    } else {
        return None;
    };
    let fence_len = trimmed.bytes().take_while(|b| *b == fence_char).count();
    let info = trimmed[fence_len..].trim_matches(|ch| ch == ' ' || ch == '\t');
    if info.contains('`') {
        return None;
    }
    let lang = info.split_whitespace().next().and_then(|word| {
        word.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'#' | b'.' | b'-'))
            .then(|| word.to_string())
    });
    Some((indent_len, fence_len, fence_char, lang))
}

fn is_fence_close(text: &str, fence_len: usize, fence_char: u8) -> bool {
    let Some(rest) = strip_indent_up_to(text, 3) else {
        return false;
    };
    let count = rest.bytes().take_while(|b| *b == fence_char).count();
    count >= fence_len && rest[count..].bytes().all(|b| b == b' ' || b == b'\t')
}

fn setext_underline_level(text: &str) -> Option<u8> {
    let trimmed = strip_indent_up_to(text, 3)?.trim_end_matches([' ', '\t']);
    let ch = *trimmed.as_bytes().first()?;
    if ch != b'=' && ch != b'-' {
        return None;
    }
    if !trimmed.bytes().all(|b| b == ch) {
        return None;
    }
    Some(if ch == b'=' { 1 } else { 2 })
}

fn parse_atx_heading(text: &str) -> Option<(u8, usize, usize)> {
    let trimmed = strip_indent_up_to(text, 3)?;
    let indent_len = text.len() - trimmed.len();
    let bytes = trimmed.as_bytes();
    let level = bytes.iter().take_while(|b| **b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    if level < bytes.len() && !is_space_or_tab(bytes[level]) {
        return None;
    }
    let mut content_start = level;
    while content_start < bytes.len() && is_space_or_tab(bytes[content_start]) {
        content_start += 1;
    }
    let mut content_end = bytes.len();
    while content_end > content_start && is_space_or_tab(bytes[content_end - 1]) {
        content_end -= 1;
    }
    // Optional closing sequence: `## Title ##`.
    let mut hash_start = content_end;
    while hash_start > content_start && bytes[hash_start - 1] == b'#' {
        hash_start -= 1;
    }
    if hash_start < content_end
        && (hash_start == content_start || is_space_or_tab(bytes[hash_start - 1]))
    {
        content_end = hash_start;
        while content_end > content_start && is_space_or_tab(bytes[content_end - 1]) {
            content_end -= 1;
        }
    }
    Some((
        level as u8,
        indent_len + content_start,
        indent_len + content_end,
    ))
}

fn is_thematic_break_line(text: &str) -> bool {
    let Some(trimmed) = strip_indent_up_to(text, 3) else {
        return false;
    };
    let mut marker: Option<u8> = None;
    let mut count = 0;
    for b in trimmed.bytes() {
        if is_space_or_tab(b) {
            continue;
        }
        match marker {
            None if matches!(b, b'-' | b'*' | b'_') => marker = Some(b),
            Some(m) if m == b => {}
            _ => return false,
        }
        count += 1;
    }
    count >= 3
}

fn is_space_or_tab(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

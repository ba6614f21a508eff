use crate::escape::{escape_attr, push_escaped};
use crate::link_codec::LINK_MARKER;

/// Delimiter runs recognized for inline styling, longest first.
const DELIMITERS: [(&str, &str); 8] = [
    ("**", "strong"),
    ("__", "strong"),
    ("~~", "s"),
    ("++", "u"),
    ("==", "mark"),
    ("*", "em"),
    ("_", "em"),
    ("^", "sup"),
];

const LINK_REL: &str = "nofollow noopener noreferrer";

/// Renders the inline constructs of a single line. Text outside the
/// recognized constructs is HTML-escaped.
pub fn render_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    render_chars(&chars, &mut out);
    out
}

fn render_chars(chars: &[char], out: &mut String) {
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];

        if ch == '\\' && chars.get(i + 1).is_some_and(|next| next.is_ascii_punctuation()) {
            push_escaped(out, &chars[i + 1..i + 2]);
            i += 2;
            continue;
        }

        if ch == '`' {
            match parse_code_span(chars, i) {
                Some((html, next)) => {
                    out.push_str(&html);
                    i = next;
                }
                None => {
                    let run = count_run(chars, i, '`');
                    push_escaped(out, &chars[i..i + run]);
                    i += run;
                }
            }
            continue;
        }

        if ch == '!'
            && chars.get(i + 1) == Some(&'[')
            && let Some((html, next)) = parse_link(chars, i + 1, true)
        {
            out.push_str(&html);
            i = next;
            continue;
        }

        if ch == '['
            && let Some((html, next)) = parse_link(chars, i, false)
        {
            out.push_str(&html);
            i = next;
            continue;
        }

        if let Some(end) = bare_url_end(chars, i) {
            push_escaped(out, &chars[i..end]);
            i = end;
            continue;
        }

        if let Some((html, next)) = parse_delimited(chars, i) {
            out.push_str(&html);
            i = next;
            continue;
        }

        push_escaped(out, &chars[i..i + 1]);
        i += 1;
    }
}

fn count_run(chars: &[char], start: usize, needle: char) -> usize {
    chars[start..].iter().take_while(|ch| **ch == needle).count()
}

/// A code span closes at the next backtick run of the same length.
fn parse_code_span(chars: &[char], start: usize) -> Option<(String, usize)> {
    let run = count_run(chars, start, '`');
    let mut i = start + run;
    while i < chars.len() {
        if chars[i] != '`' {
            i += 1;
            continue;
        }
        let close = count_run(chars, i, '`');
        if close == run {
            let mut body = &chars[start + run..i];
            if body.len() >= 2
                && body[0] == ' '
                && body[body.len() - 1] == ' '
                && body.iter().any(|ch| *ch != ' ')
            {
                body = &body[1..body.len() - 1];
            }
            let mut html = String::from("<code>");
            push_escaped(&mut html, body);
            html.push_str("</code>");
            return Some((html, i + close));
        }
        i += close;
    }
    None
}

/// Parses `[text](url "title")` at `start` (the `[`). Images include the
/// preceding `!`. Only http(s) targets are accepted.
fn parse_link(chars: &[char], start: usize, image: bool) -> Option<(String, usize)> {
    let label_end = find_bracket_end(chars, start + 1)?;
    if chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let mut i = label_end + 2;
    let url_start = i;
    while i < chars.len() && chars[i] != ')' && !chars[i].is_whitespace() {
        i += 1;
    }
    let url: String = chars[url_start..i].iter().collect();
    if !is_http_url(&url) {
        return None;
    }
    while i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    let mut title = None;
    if chars.get(i) == Some(&'"') {
        let title_end = i + 1 + chars[i + 1..].iter().position(|ch| *ch == '"')?;
        title = Some(chars[i + 1..title_end].iter().collect::<String>());
        i = title_end + 1;
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
    }
    if chars.get(i) != Some(&')') {
        return None;
    }

    let label: String = unescape_label(&chars[start + 1..label_end]);
    let html = if image {
        format!(
            "<img src=\"{}\" alt=\"{}\" title=\"{}\" {} />",
            escape_attr(&url),
            escape_attr(&label),
            escape_attr(title.as_deref().unwrap_or(&label)),
            LINK_MARKER
        )
    } else {
        let title_attr = title
            .map(|value| format!(" title=\"{}\"", escape_attr(&value)))
            .unwrap_or_default();
        let mut text = String::new();
        push_escaped(&mut text, &label.chars().collect::<Vec<_>>());
        format!(
            "<a href=\"{}\"{} {} target=\"_blank\" rel=\"{}\">{}</a>",
            escape_attr(&url),
            title_attr,
            LINK_MARKER,
            LINK_REL,
            text
        )
    };
    Some((html, i + 1))
}

fn find_bracket_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (offset, &ch) in chars[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' if depth == 0 => return Some(start + offset),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn unescape_label(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && chars.get(i + 1).is_some_and(|ch| ch.is_ascii_punctuation()) {
            i += 1;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

/// Bare `http(s)://` URLs are copied through so `_` and `*` inside them are
/// never read as delimiters. Returns the end of the URL.
fn bare_url_end(chars: &[char], start: usize) -> Option<usize> {
    if !matches!(chars[start], 'h' | 'H') {
        return None;
    }
    if start > 0 && chars[start - 1].is_alphanumeric() {
        return None;
    }
    let scheme_len = ["http://", "https://"].iter().find_map(|scheme| {
        let len = scheme.chars().count();
        let head: String = chars.get(start..start + len)?.iter().collect();
        head.eq_ignore_ascii_case(scheme).then_some(len)
    })?;
    let mut end = start + scheme_len;
    while end < chars.len() && !chars[end].is_whitespace() {
        end += 1;
    }
    // Closing punctuation belongs to the surrounding text.
    while end > start + scheme_len
        && matches!(chars[end - 1], '.' | ',' | ':' | ';' | '!' | '?' | '*' | '~' | '=' | '^' | ')')
    {
        end -= 1;
    }
    (end > start + scheme_len).then_some(end)
}

fn parse_delimited(chars: &[char], start: usize) -> Option<(String, usize)> {
    for (delimiter, tag) in DELIMITERS {
        let delim: Vec<char> = delimiter.chars().collect();
        if !chars[start..].starts_with(&delim) || !is_opener(chars, start, &delim) {
            continue;
        }
        if let Some(close) = find_closer(chars, start + delim.len(), &delim) {
            let mut html = format!("<{}>", tag);
            render_chars(&chars[start + delim.len()..close], &mut html);
            html.push_str(&format!("</{}>", tag));
            return Some((html, close + delim.len()));
        }
    }
    None
}

fn is_opener(chars: &[char], start: usize, delim: &[char]) -> bool {
    let marker = delim[0];
    let Some(&next) = chars.get(start + delim.len()) else {
        return false;
    };
    if next.is_whitespace() || (delim.len() == 1 && next == marker) {
        return false;
    }
    if marker == '_' && start > 0 && chars[start - 1].is_alphanumeric() {
        return false;
    }
    true
}

fn find_closer(chars: &[char], content_start: usize, delim: &[char]) -> Option<usize> {
    let marker = delim[0];
    let len = delim.len();
    let mut j = content_start + 1;
    while j + len <= chars.len() {
        if chars[j..j + len] == *delim {
            let prev = chars[j - 1];
            let after = chars.get(j + len).copied();
            let closes = !prev.is_whitespace()
                && prev != '\\'
                && after != Some(marker)
                && (len > 1 || prev != marker)
                && !(marker == '_' && after.is_some_and(char::is_alphanumeric));
            if closes {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::render_inline;

    #[test]
    fn emphasis_family() {
        assert_eq!(render_inline("*em* _em_"), "<em>em</em> <em>em</em>");
        assert_eq!(
            render_inline("**bold** __bold__"),
            "<strong>bold</strong> <strong>bold</strong>"
        );
        assert_eq!(
            render_inline("~~gone~~ ++under++ ==hi== x^2^"),
            "<s>gone</s> <u>under</u> <mark>hi</mark> x<sup>2</sup>"
        );
    }

    #[test]
    fn nested_emphasis() {
        assert_eq!(
            render_inline("**bold *and em***"),
            "<strong>bold <em>and em</em></strong>"
        );
    }

    #[test]
    fn delimiters_need_flanking_text() {
        assert_eq!(render_inline("a * b * c"), "a * b * c");
        assert_eq!(render_inline("2 ** 3"), "2 ** 3");
        assert_eq!(render_inline("**"), "**");
        assert_eq!(render_inline("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn code_span_is_escaped_and_not_styled() {
        assert_eq!(
            render_inline("use `a *b* <c>` here"),
            "use <code>a *b* &lt;c&gt;</code> here"
        );
        assert_eq!(render_inline("``a ` b``"), "<code>a ` b</code>");
        assert_eq!(render_inline("`open"), "`open");
    }

    #[test]
    fn links_and_images_carry_marker() {
        assert_eq!(
            render_inline("[docs](https://example.com/a?b=1&c=2)"),
            "<a href=\"https://example.com/a?b=1&amp;c=2\" data-md-link target=\"_blank\" rel=\"nofollow noopener noreferrer\">docs</a>"
        );
        assert_eq!(
            render_inline("![a <cat>](https://example.com/cat.png)"),
            "<img src=\"https://example.com/cat.png\" alt=\"a &lt;cat&gt;\" title=\"a &lt;cat&gt;\" data-md-link />"
        );
    }

    #[test]
    fn non_http_links_stay_literal() {
        assert_eq!(
            render_inline("[x](javascript:alert(1))"),
            "[x](javascript:alert(1))"
        );
    }

    #[test]
    fn bare_urls_are_not_styled() {
        assert_eq!(
            render_inline("see https://example.com/a_b_c*d*"),
            "see https://example.com/a_b_c*d*"
        );
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(render_inline(r"\*not em\*"), "*not em*");
        assert_eq!(render_inline(r"\<b>"), "&lt;b&gt;");
    }
}

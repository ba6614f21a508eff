//! Entity extraction: URLs, hashtags, mentions and already-rendered
//! Markdown spans, reported as character ranges.

use crate::escape::unescape_html;
use crate::span::Span;
use crate::tag_scan::{Vocabulary, outermost_tags, parse_tag};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Url { url: String },
    Hashtag { tag: String },
    Mention { acct: String },
    /// Renderer output that is copied through verbatim.
    Markdown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub span: Span,
}

impl Entity {
    pub fn new(kind: EntityKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self.kind, EntityKind::Markdown)
    }
}

/// What the scanned text is: raw user text, or HTML whose text runs are
/// already entity-encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextKind {
    Plain,
    Html,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExtractOptions {
    /// Also link bare domains such as `example.com/path`.
    pub extract_url_without_protocol: bool,
}

const MARKDOWN_TAGS: Vocabulary = Vocabulary {
    paired: &[
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "em",
        "strong",
        "s",
        "sup",
        "u",
        "mark",
        "code",
        "a",
        "ul",
        "ol",
        "blockquote",
        "pre",
    ],
    void: &["img", "hr", "br"],
};

const BARE_DOMAIN_TLDS: &[&str] = &[
    "com", "net", "org", "edu", "gov", "info", "io", "dev", "app", "jp", "uk", "de", "fr", "us",
    "ca", "au", "social", "online", "xyz", "me", "tv", "co",
];

/// One pass-through entity per outermost renderer-produced element.
pub fn extract_markdown_spans(html: &str) -> Vec<Entity> {
    let chars: Vec<char> = html.chars().collect();
    outermost_tags(&chars, MARKDOWN_TAGS)
        .into_iter()
        .map(|found| Entity::new(EntityKind::Markdown, found.span))
        .collect()
}

/// URLs, hashtags and mentions with overlaps removed (earliest start wins).
pub fn extract_entities(text: &str, kind: TextKind, options: ExtractOptions) -> Vec<Entity> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if kind == TextKind::Html && ch == '<' {
            i = parse_tag(&chars, i).map_or(i + 1, |tag| tag.end);
            continue;
        }
        let found = match ch {
            '#' | '＃' => scan_hashtag(&chars, i, kind),
            '@' | '＠' => scan_mention(&chars, i),
            _ => scan_url(&chars, i, kind, options),
        };
        match found {
            Some(entity) => {
                i = entity.span.end;
                out.push(entity);
            }
            None => i += 1,
        }
    }
    remove_overlapping(out)
}

/// Markdown spans of `html` plus the tokens that fall outside all of them.
pub fn extract_with_markdown(html: &str, options: ExtractOptions) -> Vec<Entity> {
    let mut entities = extract_markdown_spans(html);
    let tokens = extract_entities(html, TextKind::Html, options);
    let kept: Vec<Entity> = tokens
        .into_iter()
        .filter(|token| !entities.iter().any(|span| span.span.overlaps(&token.span)))
        .collect();
    entities.extend(kept);
    entities
}

pub fn remove_overlapping(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by_key(|entity| entity.span.start);
    let mut kept: Vec<Entity> = Vec::with_capacity(entities.len());
    for entity in entities {
        match kept.last() {
            Some(last) if last.span.overlaps(&entity.span) => {
                tracing::trace!(?entity, "dropping overlapping entity");
            }
            _ => kept.push(entity),
        }
    }
    kept
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn scan_hashtag(chars: &[char], start: usize, kind: TextKind) -> Option<Entity> {
    if let Some(&prev) = start.checked_sub(1).and_then(|idx| chars.get(idx))
        && (is_word(prev) || matches!(prev, '/' | ')' | '&'))
    {
        return None;
    }
    // In rendered HTML a literal `&` arrives as `&amp;`.
    if kind == TextKind::Html && chars[..start].ends_with(&['&', 'a', 'm', 'p', ';']) {
        return None;
    }
    let mut end = start + 1;
    while end < chars.len() && (is_word(chars[end]) || matches!(chars[end], '·' | '・')) {
        end += 1;
    }
    while end > start + 1 && matches!(chars[end - 1], '·' | '・') {
        end -= 1;
    }
    let tag = &chars[start + 1..end];
    if !tag.iter().any(|ch| ch.is_alphabetic()) {
        return None;
    }
    Some(Entity::new(
        EntityKind::Hashtag {
            tag: tag.iter().collect(),
        },
        Span::new(start, end).ok()?,
    ))
}

fn scan_mention(chars: &[char], start: usize) -> Option<Entity> {
    if let Some(&prev) = start.checked_sub(1).and_then(|idx| chars.get(idx))
        && (is_word(prev) || matches!(prev, '/' | '@' | '.'))
    {
        return None;
    }
    let mut end = start + 1;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if end == start + 1 {
        return None;
    }
    if matches!(chars.get(end), Some('@')) {
        let domain_start = end + 1;
        let mut domain_end = domain_start;
        while domain_end < chars.len()
            && (chars[domain_end].is_alphanumeric() || matches!(chars[domain_end], '.' | '-'))
        {
            domain_end += 1;
        }
        while domain_end > domain_start && matches!(chars[domain_end - 1], '.' | '-') {
            domain_end -= 1;
        }
        if domain_end > domain_start {
            end = domain_end;
        }
    }
    Some(Entity::new(
        EntityKind::Mention {
            acct: chars[start + 1..end].iter().collect(),
        },
        Span::new(start, end).ok()?,
    ))
}

fn scan_url(
    chars: &[char],
    start: usize,
    kind: TextKind,
    options: ExtractOptions,
) -> Option<Entity> {
    if let Some(&prev) = start.checked_sub(1).and_then(|idx| chars.get(idx))
        && (prev.is_alphanumeric() || matches!(prev, '@' | '/' | '#' | '$' | '.' | '-' | '_'))
    {
        return None;
    }
    let host_start = if starts_with_ignore_case(chars, start, "https://") {
        start + 8
    } else if starts_with_ignore_case(chars, start, "http://") {
        start + 7
    } else if options.extract_url_without_protocol && chars[start].is_ascii_alphanumeric() {
        start
    } else {
        return None;
    };

    let mut host_end = host_start;
    while host_end < chars.len() && is_host_char(chars[host_end]) {
        host_end += 1;
    }
    while host_end > host_start && matches!(chars[host_end - 1], '.' | '-') {
        host_end -= 1;
    }
    if host_end == host_start {
        return None;
    }
    if host_start == start && !is_bare_domain(&chars[host_start..host_end]) {
        return None;
    }

    let mut end = host_end;
    while end < chars.len() && is_url_char(chars, end, kind) {
        end += 1;
    }
    let end = trim_url_punct(chars, start, end, kind);
    if end <= host_start {
        return None;
    }
    let raw: String = chars[start..end].iter().collect();
    let url = match kind {
        TextKind::Plain => raw,
        TextKind::Html => unescape_html(&raw),
    };
    Some(Entity::new(EntityKind::Url { url }, Span::new(start, end).ok()?))
}

fn starts_with_ignore_case(chars: &[char], start: usize, prefix: &str) -> bool {
    let mut idx = start;
    for expected in prefix.chars() {
        match chars.get(idx) {
            Some(ch) if ch.to_ascii_lowercase() == expected => idx += 1,
            _ => return false,
        }
    }
    true
}

fn is_host_char(ch: char) -> bool {
    (ch.is_alphanumeric() && !is_cjk(ch)) || matches!(ch, '.' | '-' | '_')
}

fn is_bare_domain(host: &[char]) -> bool {
    let host: String = host.iter().collect::<String>().to_lowercase();
    if host.starts_with("www.") && host.len() > 4 {
        return host[4..].contains('.');
    }
    match host.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && BARE_DOMAIN_TLDS.contains(&tld),
        None => false,
    }
}

fn is_cjk(ch: char) -> bool {
    matches!(ch, '\u{3000}'..='\u{9fff}' | '\u{ff00}'..='\u{ffef}' | '\u{ac00}'..='\u{d7af}')
}

fn is_url_char(chars: &[char], idx: usize, kind: TextKind) -> bool {
    let ch = chars[idx];
    if ch.is_whitespace() || matches!(ch, '<' | '>' | '"' | '\'') || is_cjk(ch) {
        return false;
    }
    if kind == TextKind::Html && ch == '&' {
        // Escaped markup characters end a URL; an escaped ampersand does not.
        return !["&lt;", "&gt;", "&quot;"]
            .iter()
            .any(|entity| starts_with_ignore_case(chars, idx, entity));
    }
    ch.is_ascii_graphic() || ch.is_alphanumeric()
}

fn trim_url_punct(chars: &[char], start: usize, mut end: usize, kind: TextKind) -> usize {
    loop {
        let before = end;
        // A trailing `&` is punctuation too; keep its encoded form whole.
        if kind == TextKind::Html && chars[start..end].ends_with(&['&', 'a', 'm', 'p', ';']) {
            end -= 5;
            continue;
        }
        while end > start && matches!(chars[end - 1], '.' | ',' | ';' | ':' | '!' | '?' | '*') {
            end -= 1;
        }
        for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
            end = trim_unbalanced(chars, start, end, open, close);
        }
        if end == before {
            return end;
        }
    }
}

fn trim_unbalanced(chars: &[char], start: usize, mut end: usize, open: char, close: char) -> usize {
    let opens = chars[start..end].iter().filter(|ch| **ch == open).count();
    let mut closes = chars[start..end].iter().filter(|ch| **ch == close).count();
    while end > start && chars[end - 1] == close && closes > opens {
        end -= 1;
        closes -= 1;
    }
    end
}

//! Percent-encoding of renderer-produced link targets.
//!
//! Markdown links and images are emitted with a `data-md-link` marker. While
//! the pipeline runs, their `href`/`src` values are held percent-encoded so
//! later passes (entity extraction, shortcodes, BBCode) see nothing but
//! inert `%XX` text inside them; [`decode`] restores the original URL and
//! drops the marker.

use crate::escape::{escape_attr, unescape_html};

pub const LINK_MARKER: &str = "data-md-link";

const URL_ATTRS: [&str; 2] = ["href", "src"];

/// Percent-encodes `url` as a query component: everything but
/// `A-Z a-z 0-9 - _ . ~` is written as `%XX` over its UTF-8 bytes.
pub fn encode_url(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for &byte in url.as_bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Reverses [`encode_url`]. Malformed escapes are kept literally.
pub fn decode_url(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(value) => value,
        Err(err) => String::from_utf8_lossy(&err.into_bytes()).to_string(),
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Percent-encodes the URL attributes of every marked tag in `html`.
pub fn encode(html: &str) -> String {
    rewrite_marked_tags(html, |tag| {
        map_url_attrs(tag, |value| encode_url(&unescape_html(value)))
    })
}

/// Restores the URL attributes of every marked tag and removes the marker.
/// Text without marked tags is returned unchanged.
pub fn decode(html: &str) -> String {
    rewrite_marked_tags(html, |tag| {
        let decoded = map_url_attrs(tag, |value| escape_attr(&decode_url(value)));
        remove_marker(&decoded)
    })
}

fn rewrite_marked_tags<F>(html: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('>') else {
            rest = tail;
            break;
        };
        let tag = &tail[..=close];
        if has_marker(tag) {
            out.push_str(&rewrite(tag));
        } else {
            out.push_str(tag);
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

fn has_marker(tag: &str) -> bool {
    marker_position(tag).is_some()
}

/// Offset of the marker attribute in `tag`. Text inside quoted attribute
/// values is skipped.
fn marker_position(tag: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    for (at, ch) in tag.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if prev.is_some_and(char::is_whitespace) && tag[at..].starts_with(LINK_MARKER) => {
                let after = tag[at + LINK_MARKER.len()..].chars().next();
                if matches!(after, Some(' ' | '/' | '>' | '=')) {
                    return Some(at);
                }
            }
            None => {}
        }
        prev = Some(ch);
    }
    None
}

fn remove_marker(tag: &str) -> String {
    match marker_position(tag) {
        // The marker is always written without a value.
        Some(at) => format!("{}{}", tag[..at - 1].trim_end(), &tag[at + LINK_MARKER.len()..]),
        None => tag.to_string(),
    }
}

fn map_url_attrs<F>(tag: &str, mut map: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(tag.len());
    let mut rest = tag;
    loop {
        let next = URL_ATTRS
            .iter()
            .filter_map(|name| find_attr(rest, name).map(|pos| (pos, *name)))
            .min_by_key(|(pos, _)| *pos);
        let Some((pos, name)) = next else {
            break;
        };
        let value_start = pos + name.len() + 2;
        let Some(value_len) = rest[value_start..].find('"') else {
            break;
        };
        out.push_str(&rest[..value_start]);
        out.push_str(&map(&rest[value_start..value_start + value_len]));
        rest = &rest[value_start + value_len..];
    }
    out.push_str(rest);
    out
}

/// Finds ` name="` in `tag`, returning the offset of `name`.
fn find_attr(tag: &str, name: &str) -> Option<usize> {
    let needle = format!("{}=\"", name);
    let mut from = 0;
    while let Some(found) = tag[from..].find(&needle) {
        let at = from + found;
        if tag[..at].chars().next_back().is_some_and(char::is_whitespace) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_url, encode, encode_url};

    #[test]
    fn url_round_trip() {
        for url in [
            "https://example.com/a b?q=1&r=[x]",
            "https://日本.example/パス?x=%41",
            "",
            "%%%zz%4",
        ] {
            assert_eq!(decode_url(&encode_url(url)), url);
        }
        assert_eq!(encode_url("a b"), "a%20b");
    }

    #[test]
    fn encodes_and_decodes_marked_attributes() {
        let html = "<a href=\"https://x.test/?a=1&amp;b=2\" data-md-link>t</a>";
        let encoded = encode(html);
        assert_eq!(
            encoded,
            "<a href=\"https%3A%2F%2Fx.test%2F%3Fa%3D1%26b%3D2\" data-md-link>t</a>"
        );
        assert_eq!(
            decode(&encoded),
            "<a href=\"https://x.test/?a=1&amp;b=2\">t</a>"
        );
    }

    #[test]
    fn unmarked_tags_are_untouched() {
        let html = "<a href=\"https%3A%2F%2Fx\">x</a> <img src=\"a%20b\" />";
        assert_eq!(encode(html), html);
        assert_eq!(decode(html), html);
        assert_eq!(decode(&decode(html)), html);
    }

    #[test]
    fn decodes_image_sources() {
        let html = "<img src=\"a%20b\" alt=\"x\" data-md-link />";
        assert_eq!(decode(html), "<img src=\"a b\" alt=\"x\" />");
    }

    #[test]
    fn marker_text_inside_attribute_values_is_kept() {
        let html = "<img src=\"https%3A%2F%2Fx.test%2Fi.png\" alt=\"a data-md-link b\" title=\"t data-md-link u\" data-md-link />";
        assert_eq!(
            decode(html),
            "<img src=\"https://x.test/i.png\" alt=\"a data-md-link b\" title=\"t data-md-link u\" />"
        );

        let unmarked = "<img src=\"a%20b\" alt=\"x data-md-link y\" />";
        assert_eq!(encode(unmarked), unmarked);
        assert_eq!(decode(unmarked), unmarked);
    }
}

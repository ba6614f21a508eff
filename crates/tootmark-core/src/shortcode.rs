//! Custom emoji `:shortcode:` substitution over already-rendered HTML.

use std::collections::HashMap;

use crate::escape::escape_attr;
use crate::model::CustomEmoji;

const INVISIBLE_OPEN: &str = "<span class=\"invisible\">";

/// Shortcode to absolute image URL, built once per render call.
#[derive(Clone, Debug, Default)]
pub struct EmojiMap {
    urls: HashMap<String, String>,
}

impl EmojiMap {
    /// Later records win when a shortcode repeats.
    pub fn new(emojis: &[CustomEmoji], animate: bool) -> Self {
        let urls = emojis
            .iter()
            .map(|emoji| {
                let url = if animate { &emoji.url } else { &emoji.static_url };
                (emoji.shortcode.clone(), url.clone())
            })
            .collect();
        Self { urls }
    }

    pub fn get(&self, shortcode: &str) -> Option<&str> {
        self.urls.get(shortcode).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl FromIterator<(String, String)> for EmojiMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

/// Replaces `:shortcode:` tokens found outside tags and outside
/// `<span class="invisible">` regions.
///
/// A single left-to-right pass copies `html` into a new buffer. A failed
/// lookup reuses its closing colon as the next opener, so `:a:b:` still
/// finds `:b:`.
pub fn encode_custom_emojis(html: &str, emojis: &EmojiMap) -> String {
    if emojis.is_empty() {
        return html.to_string();
    }

    let chars: Vec<char> = html.chars().collect();
    let mut out = String::with_capacity(html.len());
    let mut flushed = 0usize;
    let mut tag_open: Option<usize> = None;
    let mut shortname_start: Option<usize> = None;
    let mut invisible_depth = 0usize;

    for (i, &ch) in chars.iter().enumerate() {
        if invisible_depth == 0
            && ch == ':'
            && let Some(start) = shortname_start
        {
            let shortcode: String = chars[start + 1..i].iter().collect();
            if let Some(url) = emojis.get(&shortcode) {
                out.extend(&chars[flushed..start]);
                out.push_str(&emoji_html(&shortcode, url));
                flushed = i + 1;
                shortname_start = None;
            } else {
                shortname_start = Some(i);
            }
            continue;
        }

        if let Some(open) = tag_open
            && ch == '>'
        {
            let tag: String = chars[open..=i].iter().collect();
            tag_open = None;
            if invisible_depth > 0 {
                invisible_depth = apply_nesting(invisible_depth, &tag);
            } else if tag == INVISIBLE_OPEN {
                invisible_depth = 1;
            }
        } else if ch == '<' {
            tag_open = Some(i);
            shortname_start = None;
        } else if tag_open.is_none() && ch == ':' {
            shortname_start = Some(i);
        }
    }

    out.extend(&chars[flushed..]);
    out
}

fn apply_nesting(depth: usize, tag: &str) -> usize {
    if tag.starts_with("</") {
        depth.saturating_sub(1)
    } else if tag.ends_with("/>") {
        depth
    } else {
        depth + 1
    }
}

fn emoji_html(shortcode: &str, url: &str) -> String {
    let code = escape_attr(shortcode);
    format!(
        "<img draggable=\"false\" class=\"emojione\" alt=\":{code}:\" title=\":{code}:\" src=\"{}\" />",
        escape_attr(url)
    )
}

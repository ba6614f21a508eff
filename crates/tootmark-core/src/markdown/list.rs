use once_cell::sync::Lazy;
use regex::Regex;

use super::inline::render_inline;

static LIST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t\u{3000}]*)([*+-]|[0-9]+[^0-9\s])[ \t\u{3000}]+(\S.*)$").expect("list line regex")
});

/// One list item line: its indentation, marker family and content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ListLine {
    pub indent: usize,
    pub ordered: bool,
    pub content: String,
    /// Content ended in a double space before a newline.
    pub hard_break: bool,
}

pub(super) fn parse_list_line(text: &str) -> Option<ListLine> {
    let caps = LIST_LINE.captures(text)?;
    let indent = caps.get(1)?.as_str().chars().count();
    let marker = caps.get(2)?.as_str();
    let content = caps.get(3)?.as_str().to_string();
    Some(ListLine {
        indent,
        ordered: marker.starts_with(|ch: char| ch.is_ascii_digit()),
        content,
        hard_break: false,
    })
}

/// Renders a contiguous run of list lines, nesting by indentation.
pub(super) fn render_list(items: &[ListLine]) -> String {
    let Some(level) = items.iter().map(|item| item.indent).min() else {
        return String::new();
    };
    build_list(items, 0, level).0
}

/// Builds the list for `level` starting at `start`. Returns the markup and
/// the index of the first item not consumed.
fn build_list(items: &[ListLine], start: usize, level: usize) -> (String, usize) {
    // The first marker seen at this level fixes ul/ol for the whole run.
    let ordered = items[start..]
        .iter()
        .take_while(|item| item.indent >= level)
        .find(|item| item.indent == level)
        .is_some_and(|item| item.ordered);
    let tag = if ordered { "ol" } else { "ul" };

    let mut entries: Vec<String> = Vec::new();
    let mut i = start;
    while i < items.len() {
        let item = &items[i];
        if item.indent < level {
            break;
        }
        if item.indent > level {
            let (nested, next) = build_list(items, i, item.indent);
            match entries.last_mut() {
                Some(entry) => {
                    entry.push('\n');
                    entry.push_str(&nested);
                    entry.push('\n');
                }
                None => entries.push(format!("\n{}\n", nested)),
            }
            i = next;
            continue;
        }
        let mut entry = render_inline(&item.content);
        if item.hard_break {
            entry.push_str("<br />");
        }
        entries.push(entry);
        i += 1;
    }

    let mut html = format!("<{}>\n", tag);
    for entry in &entries {
        html.push_str("<li>");
        html.push_str(entry);
        html.push_str("</li>\n");
    }
    html.push_str(&format!("</{}>", tag));
    (html, i)
}

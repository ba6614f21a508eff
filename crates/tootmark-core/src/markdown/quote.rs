use once_cell::sync::Lazy;
use regex::Regex;

use super::Line;

static QUOTE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^> ?(.*)$").expect("quote line regex"));

/// Wraps every maximal run of `>` lines in a blockquote, stripping one
/// marker per pass, until no quote line remains. Each pass removes one
/// level of nesting, so the loop is bounded by the deepest marker count.
pub(super) fn collapse_quotes(mut lines: Vec<Line>) -> Vec<Line> {
    while lines.iter().any(is_quote_line) {
        lines = collapse_one_level(lines);
    }
    lines
}

fn collapse_one_level(lines: Vec<Line>) -> Vec<Line> {
    let mut out = Vec::with_capacity(lines.len() + 2);
    let mut in_quote = false;
    for line in lines {
        let stripped = line
            .raw()
            .and_then(|text| QUOTE_LINE.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|content| content.as_str().to_string());
        match stripped {
            Some(content) => {
                if !in_quote {
                    out.push(Line::Html("<blockquote>".to_string()));
                    in_quote = true;
                }
                out.push(Line::Raw(content));
            }
            None => {
                if in_quote {
                    out.push(Line::Html("</blockquote>".to_string()));
                    in_quote = false;
                }
                out.push(line);
            }
        }
    }
    if in_quote {
        out.push(Line::Html("</blockquote>".to_string()));
    }
    out
}

fn is_quote_line(line: &Line) -> bool {
    line.raw().is_some_and(|text| QUOTE_LINE.is_match(text))
}

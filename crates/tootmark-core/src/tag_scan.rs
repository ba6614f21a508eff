//! Depth-counting scanner that finds the outermost occurrence of known tags.

use crate::span::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TagMatch {
    pub span: Span,
    pub name: &'static str,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Vocabulary {
    pub paired: &'static [&'static str],
    pub void: &'static [&'static str],
}

#[derive(Debug)]
pub(crate) struct RawTag {
    pub name: String,
    pub closing: bool,
    pub self_closing: bool,
    /// Index one past the closing `>`.
    pub end: usize,
}

/// Returns one match per outermost element whose name is in `vocabulary`.
/// Openers without a matching closer are skipped.
pub(crate) fn outermost_tags(chars: &[char], vocabulary: Vocabulary) -> Vec<TagMatch> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '<' {
            i += 1;
            continue;
        }
        let Some(tag) = parse_tag(chars, i) else {
            i += 1;
            continue;
        };
        if tag.closing {
            i = tag.end;
            continue;
        }
        if let Some(name) = lookup(vocabulary.void, &tag.name) {
            out.push(TagMatch {
                span: Span {
                    start: i,
                    end: tag.end,
                },
                name,
            });
            i = tag.end;
            continue;
        }
        match lookup(vocabulary.paired, &tag.name) {
            Some(name) if !tag.self_closing => {
                if let Some(close_end) = find_matching_close(chars, tag.end, name) {
                    out.push(TagMatch {
                        span: Span {
                            start: i,
                            end: close_end,
                        },
                        name,
                    });
                    i = close_end;
                } else {
                    i = tag.end;
                }
            }
            _ => i = tag.end,
        }
    }
    out
}

fn find_matching_close(chars: &[char], from: usize, name: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut j = from;
    while j < chars.len() {
        if chars[j] != '<' {
            j += 1;
            continue;
        }
        let Some(tag) = parse_tag(chars, j) else {
            j += 1;
            continue;
        };
        if tag.name == name {
            if tag.closing {
                depth -= 1;
                if depth == 0 {
                    return Some(tag.end);
                }
            } else if !tag.self_closing {
                depth += 1;
            }
        }
        j = tag.end;
    }
    None
}

fn lookup(names: &'static [&'static str], name: &str) -> Option<&'static str> {
    names.iter().copied().find(|candidate| *candidate == name)
}

/// Parses the tag starting at `chars[start] == '<'`.
pub(crate) fn parse_tag(chars: &[char], start: usize) -> Option<RawTag> {
    let mut j = start + 1;
    let closing = chars.get(j) == Some(&'/');
    if closing {
        j += 1;
    }
    let name_start = j;
    while j < chars.len() && chars[j].is_ascii_alphanumeric() {
        j += 1;
    }
    if j == name_start || !chars[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name: String = chars[name_start..j]
        .iter()
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    match chars.get(j) {
        Some(ch) if ch.is_whitespace() || *ch == '>' || *ch == '/' => {}
        _ => return None,
    }
    let mut quote: Option<char> = None;
    while j < chars.len() {
        let ch = chars[j];
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '<' => return None,
            None if ch == '>' => {
                let self_closing = j > start && chars[j - 1] == '/';
                return Some(RawTag {
                    name,
                    closing,
                    self_closing,
                    end: j + 1,
                });
            }
            None => {}
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{Vocabulary, outermost_tags};

    const VOCAB: Vocabulary = Vocabulary {
        paired: &["em", "ul", "a"],
        void: &["hr", "br"],
    };

    fn spans(html: &str) -> Vec<(usize, usize, &'static str)> {
        let chars: Vec<char> = html.chars().collect();
        outermost_tags(&chars, VOCAB)
            .into_iter()
            .map(|m| (m.span.start, m.span.end, m.name))
            .collect()
    }

    #[test]
    fn nested_same_tag_resolves_to_outermost() {
        let html = "<ul><li>a<ul><li>b</li></ul></li></ul> tail";
        assert_eq!(spans(html), vec![(0, 38, "ul")]);
    }

    #[test]
    fn inner_tags_are_not_reported_separately() {
        let html = "x <em>a <a href=\"u\">b</a></em> <hr />";
        assert_eq!(spans(html), vec![(2, 30, "em"), (31, 37, "hr")]);
    }

    #[test]
    fn unbalanced_opener_is_skipped() {
        assert_eq!(spans("<em>open <em>x</em>"), vec![(9, 19, "em")]);
    }

    #[test]
    fn offsets_are_characters() {
        assert_eq!(spans("日本<em>語</em>"), vec![(2, 12, "em")]);
    }
}

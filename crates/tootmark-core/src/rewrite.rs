//! Rebuilds text around entity spans.

use crate::entity::Entity;
use crate::escape::push_escaped;

/// How the text between entities is emitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlainRuns {
    /// Raw user text: entity-encode it.
    Escape,
    /// Already-encoded HTML: copy it through.
    Verbatim,
}

/// Replaces each entity span of `text` with `render(entity, original_slice)`.
///
/// Entities are visited in start order (stable on ties). An entity starting
/// before the end of the previously emitted one is dropped.
pub fn rewrite<F>(text: &str, entities: &[Entity], plain: PlainRuns, mut render: F) -> String
where
    F: FnMut(&Entity, &str) -> String,
{
    let chars: Vec<char> = text.chars().collect();
    let mut ordered: Vec<&Entity> = entities.iter().collect();
    ordered.sort_by_key(|entity| entity.span.start);

    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    for entity in ordered {
        let span = entity.span;
        if span.start < last || span.end > chars.len() || span.is_empty() {
            tracing::trace!(?entity, "skipping entity outside the rewritable range");
            continue;
        }
        push_plain(&mut out, &chars[last..span.start], plain);
        let original: String = chars[span.start..span.end].iter().collect();
        out.push_str(&render(entity, &original));
        last = span.end;
    }
    push_plain(&mut out, &chars[last..], plain);
    out
}

fn push_plain(out: &mut String, chars: &[char], plain: PlainRuns) {
    match plain {
        PlainRuns::Escape => push_escaped(out, chars),
        PlainRuns::Verbatim => out.extend(chars),
    }
}

#[cfg(test)]
mod tests {
    use super::{PlainRuns, rewrite};
    use crate::entity::{Entity, EntityKind};
    use crate::span::Span;

    fn entity(kind: EntityKind, start: usize, end: usize) -> Entity {
        Entity::new(kind, Span { start, end })
    }

    #[test]
    fn substitutes_spans_and_escapes_the_rest() {
        let text = "a<b http://x.test/a&b c #tag d>";
        let entities = vec![
            entity(
                EntityKind::Hashtag {
                    tag: "tag".to_string(),
                },
                24,
                28,
            ),
            entity(
                EntityKind::Url {
                    url: "http://x.test/a&b".to_string(),
                },
                4,
                21,
            ),
        ];
        let html = rewrite(text, &entities, PlainRuns::Escape, |entity, _| match &entity.kind {
            EntityKind::Url { .. } => "[URL]".to_string(),
            EntityKind::Hashtag { tag } => format!("[#{}]", tag),
            _ => String::new(),
        });
        assert_eq!(html, "a&lt;b [URL] c [#tag] d&gt;");
    }

    #[test]
    fn verbatim_runs_are_not_reencoded() {
        let text = "&amp; <em>x</em>";
        let entities = vec![entity(EntityKind::Markdown, 6, 16)];
        let html = rewrite(text, &entities, PlainRuns::Verbatim, |_, original| {
            original.to_string()
        });
        assert_eq!(html, text);
    }

    #[test]
    fn overlapping_entities_are_dropped() {
        let entities = vec![
            entity(EntityKind::Markdown, 0, 4),
            entity(EntityKind::Markdown, 2, 6),
        ];
        let html = rewrite("abcdefg", &entities, PlainRuns::Escape, |_, original| {
            original.to_uppercase()
        });
        assert_eq!(html, "ABCDefg");
    }
}

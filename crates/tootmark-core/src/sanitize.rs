//! Allow-list HTML sanitizing for content that did not originate locally.

use std::collections::{HashMap, HashSet};

use ammonia::Builder;

use crate::error::FormatError;

/// Cleans untrusted HTML according to a [`SanitizePolicy`].
pub trait Sanitizer {
    fn sanitize(&self, html: &str, policy: &SanitizePolicy) -> Result<String, FormatError>;
}

/// What survives sanitizing. Classes are filtered per tag through
/// `allowed_classes`; `rel` is forced on links through `link_rel`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SanitizePolicy {
    pub tags: HashSet<String>,
    pub tag_attributes: HashMap<String, HashSet<String>>,
    pub allowed_classes: HashMap<String, HashSet<String>>,
    pub url_schemes: HashSet<String>,
    pub link_rel: Option<String>,
}

fn owned_set(values: &[&str]) -> HashSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl SanitizePolicy {
    /// Paragraphs, line breaks, mention/hashtag spans and links.
    pub fn strict() -> Self {
        let classes = owned_set(&[
            "h-card", "mention", "hashtag", "u-url", "ellipsis", "invisible",
        ]);
        Self {
            tags: owned_set(&["p", "br", "span", "a"]),
            tag_attributes: HashMap::from([("a".to_string(), owned_set(&["href"]))]),
            allowed_classes: HashMap::from([
                ("span".to_string(), classes.clone()),
                ("a".to_string(), classes),
            ]),
            url_schemes: owned_set(&[
                "http", "https", "dat", "dweb", "ipfs", "ipns", "ssb", "gopher", "xmpp", "magnet",
            ]),
            link_rel: Some("nofollow noopener noreferrer".to_string()),
        }
    }

    /// Rejects combinations the cleaner cannot honour: `class` listed as a
    /// plain attribute next to `allowed_classes`, or `rel` next to `link_rel`.
    fn validate(&self) -> Result<(), FormatError> {
        for (tag, attributes) in &self.tag_attributes {
            if attributes.contains("class") && self.allowed_classes.contains_key(tag) {
                return Err(FormatError::Sanitize(format!(
                    "<{tag}> lists `class` both as attribute and as class allow-list"
                )));
            }
            if attributes.contains("rel") && self.link_rel.is_some() {
                return Err(FormatError::Sanitize(format!(
                    "<{tag}> allows `rel` while a link rel is forced"
                )));
            }
        }
        Ok(())
    }
}

/// [`Sanitizer`] backed by `ammonia`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str, policy: &SanitizePolicy) -> Result<String, FormatError> {
        policy.validate()?;

        let tags: HashSet<&str> = policy.tags.iter().map(String::as_str).collect();
        let tag_attributes: HashMap<&str, HashSet<&str>> = policy
            .tag_attributes
            .iter()
            .map(|(tag, attrs)| (tag.as_str(), attrs.iter().map(String::as_str).collect()))
            .collect();
        let allowed_classes: HashMap<&str, HashSet<&str>> = policy
            .allowed_classes
            .iter()
            .map(|(tag, classes)| (tag.as_str(), classes.iter().map(String::as_str).collect()))
            .collect();
        let url_schemes: HashSet<&str> = policy.url_schemes.iter().map(String::as_str).collect();

        let cleaned = Builder::new()
            .tags(tags)
            .generic_attributes(HashSet::new())
            .tag_attributes(tag_attributes)
            .allowed_classes(allowed_classes)
            .url_schemes(url_schemes)
            .link_rel(policy.link_rel.as_deref())
            .clean(html)
            .to_string();
        tracing::debug!(input_len = html.len(), output_len = cleaned.len(), "sanitized html");
        Ok(cleaned)
    }
}

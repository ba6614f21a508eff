use serde::Deserialize;

/// Instance settings the formatter needs to build links.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatterConfig {
    /// Origin used for hashtag links, without a trailing slash.
    pub base_url: String,
    /// Mentions of `user@local_domain` match local accounts.
    pub local_domain: String,
    /// Visible characters of an autolinked URL after its scheme.
    pub url_display_limit: usize,
    /// Link bare domains such as `example.com` too.
    pub extract_url_without_protocol: bool,
    /// Use animated emoji images instead of the static variants.
    pub animate_emoji: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            local_domain: "localhost".to_string(),
            url_display_limit: 30,
            extract_url_without_protocol: false,
            animate_emoji: false,
        }
    }
}

impl FormatterConfig {
    pub(crate) fn tag_url(&self, encoded_tag: &str) -> String {
        format!("{}/tags/{}", self.base_url.trim_end_matches('/'), encoded_tag)
    }
}

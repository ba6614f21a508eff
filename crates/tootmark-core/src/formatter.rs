//! Status, bio and display-name formatting.
//!
//! A [`Formatter`] is immutable after construction and can be shared across
//! threads; every call builds its own scratch state.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::bbcode::{BbcodeEngine, TagTableEngine};
use crate::config::FormatterConfig;
use crate::entity::{
    Entity, EntityKind, ExtractOptions, TextKind, extract_entities, extract_with_markdown,
};
use crate::escape::{escape_attr, escape_html, strip_tags, unescape_html};
use crate::link_codec::{self, encode_url};
use crate::markdown;
use crate::model::{Account, AccountRef, AccountResolver, CustomEmoji, LinkableAccounts, Status};
use crate::paragraph::simple_format;
use crate::rewrite::{PlainRuns, rewrite};
use crate::sanitize::{AmmoniaSanitizer, SanitizePolicy, Sanitizer};
use crate::shortcode::{EmojiMap, encode_custom_emojis};

const LINK_REL: &str = "nofollow noopener noreferrer";

static URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(www\.)?").expect("url prefix regex"));

static PLAINTEXT_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<br />|<br>|</p>)+").expect("plaintext break regex"));

/// Per-call switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Replace `:shortcode:` tokens with custom emoji images.
    pub custom_emojify: bool,
}

impl FormatOptions {
    pub fn emojified() -> Self {
        Self {
            custom_emojify: true,
        }
    }
}

pub struct Formatter {
    config: FormatterConfig,
    strict: SanitizePolicy,
    sanitizer: Box<dyn Sanitizer + Send + Sync>,
    bbcode: Box<dyn BbcodeEngine + Send + Sync>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatterConfig::default())
    }
}

impl Formatter {
    /// Uses the ammonia sanitizer and the builtin BBCode tag table.
    pub fn new(config: FormatterConfig) -> Self {
        Self::with_collaborators(config, AmmoniaSanitizer, TagTableEngine::default())
    }

    pub fn with_collaborators<S, B>(config: FormatterConfig, sanitizer: S, bbcode: B) -> Self
    where
        S: Sanitizer + Send + Sync + 'static,
        B: BbcodeEngine + Send + Sync + 'static,
    {
        Self {
            config,
            strict: SanitizePolicy::strict(),
            sanitizer: Box::new(sanitizer),
            bbcode: Box::new(bbcode),
        }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Renders a status body. Reblogs render the reblogged status prefixed
    /// with `RT @acct`.
    pub fn format(&self, status: &Status, options: &FormatOptions) -> String {
        let reblogged_acct = status.reblog.as_ref().map(|reblog| reblog.account.acct());
        let status = status.proper();

        if status.text.trim().is_empty() {
            return String::new();
        }

        if !status.local {
            let html = self.reformat(&status.text);
            return self.maybe_emojify(html, &status.emojis, options);
        }

        let mut linkable = status.mentions.clone();
        linkable.push(status.account.clone());
        let resolver = LinkableAccounts::new(&linkable, &self.config.local_domain);

        let mut html = markdown::render(&status.text);
        if let Some(acct) = reblogged_acct {
            html = format!("RT @{} {}", escape_html(&acct), html);
        }
        let html = link_codec::encode(&html);
        let entities = extract_with_markdown(&html, self.extract_options());
        debug!(entities = entities.len(), "extracted entities from rendered markdown");
        let html = self.link_entities(&html, &entities, PlainRuns::Verbatim, &resolver);
        let html = self.maybe_emojify(html, &status.emojis, options);
        let html = simple_format(&html);
        let html = self.apply_bbcode(html);
        link_codec::decode(&html)
    }

    /// Sanitizes foreign HTML with the strict policy. If the sanitizer
    /// fails, the input is shown as escaped text.
    pub fn reformat(&self, html: &str) -> String {
        self.sanitize(html, &self.strict)
    }

    /// Text of a status with markup removed.
    pub fn plaintext(&self, status: &Status) -> String {
        if status.local {
            return status.text.clone();
        }
        let text = PLAINTEXT_BREAK.replace_all(&status.text, "$0\n");
        unescape_html(&strip_tags(&text))
    }

    /// Renders an account bio.
    pub fn simplified_format(
        &self,
        account: &Account,
        options: &FormatOptions,
        resolver: &dyn AccountResolver,
    ) -> String {
        if !account.is_local() {
            return self.reformat(&account.note);
        }
        let html = self.linkify(&account.note, resolver);
        let html = self.maybe_emojify(html, &account.emojis, options);
        self.apply_bbcode(html)
    }

    /// Content warning text; custom emoji are always expanded.
    pub fn format_spoiler(&self, status: &Status) -> String {
        let html = escape_html(&status.spoiler_text);
        self.emojify(&html, &status.emojis)
    }

    pub fn format_display_name(&self, account: &Account, options: &FormatOptions) -> String {
        let html = escape_html(&account.display_name);
        self.maybe_emojify(html, &account.emojis, options)
    }

    /// Links URLs, hashtags and mentions in raw text and wraps paragraphs.
    pub fn linkify(&self, text: &str, resolver: &dyn AccountResolver) -> String {
        let entities = extract_entities(text, TextKind::Plain, self.extract_options());
        let html = self.link_entities(text, &entities, PlainRuns::Escape, resolver);
        simple_format(&html)
    }

    pub fn sanitize(&self, html: &str, policy: &SanitizePolicy) -> String {
        match self.sanitizer.sanitize(html, policy) {
            Ok(clean) => clean,
            Err(err) => {
                warn!(%err, "sanitizer failed; escaping input instead");
                escape_html(html)
            }
        }
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            extract_url_without_protocol: self.config.extract_url_without_protocol,
        }
    }

    fn link_entities(
        &self,
        text: &str,
        entities: &[Entity],
        plain: PlainRuns,
        resolver: &dyn AccountResolver,
    ) -> String {
        rewrite(text, entities, plain, |entity, original| match &entity.kind {
            EntityKind::Markdown => original.to_string(),
            EntityKind::Url { url } => self.link_to_url(url),
            EntityKind::Hashtag { tag } => self.hashtag_html(tag),
            EntityKind::Mention { acct } => match resolver.resolve(acct) {
                Some(account) => mention_html(&account),
                None => format!("@{}", escape_html(acct)),
            },
        })
    }

    fn link_to_url(&self, url: &str) -> String {
        let href = if URL_PREFIX.is_match(url) {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        if let Err(err) = Url::parse(&href) {
            debug!(%err, url, "leaving unparsable url as text");
            return escape_html(url);
        }
        format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"{}\">{}</a>",
            escape_attr(&href),
            LINK_REL,
            self.link_label(url)
        )
    }

    /// Hides the scheme and anything past the display limit in invisible
    /// spans, keeping the full URL selectable.
    fn link_label(&self, url: &str) -> String {
        let prefix_len = URL_PREFIX.find(url).map_or(0, |found| found.end());
        let (prefix, rest) = url.split_at(prefix_len);
        let limit = self.config.url_display_limit;
        let cut = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        let (shown, suffix) = rest.split_at(cut);
        let class = if suffix.is_empty() { "" } else { "ellipsis" };
        format!(
            "<span class=\"invisible\">{}</span><span class=\"{}\">{}</span><span class=\"invisible\">{}</span>",
            escape_html(prefix),
            class,
            escape_html(shown),
            escape_html(suffix)
        )
    }

    fn hashtag_html(&self, tag: &str) -> String {
        let href = self.config.tag_url(&encode_url(&tag.to_lowercase()));
        format!(
            "<a href=\"{}\" class=\"mention hashtag\" rel=\"tag\">#<span>{}</span></a>",
            escape_attr(&href),
            escape_html(tag)
        )
    }

    fn emojify(&self, html: &str, emojis: &[CustomEmoji]) -> String {
        let map = EmojiMap::new(emojis, self.config.animate_emoji);
        encode_custom_emojis(html, &map)
    }

    fn maybe_emojify(&self, html: String, emojis: &[CustomEmoji], options: &FormatOptions) -> String {
        if options.custom_emojify {
            self.emojify(&html, emojis)
        } else {
            html
        }
    }

    fn apply_bbcode(&self, html: String) -> String {
        match self.bbcode.render(&html) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(%err, "bbcode rendering failed; keeping unformatted html");
                html
            }
        }
    }
}

fn mention_html(account: &AccountRef) -> String {
    format!(
        "<span class=\"h-card\"><a href=\"{}\" class=\"u-url mention\">@<span>{}</span></a></span>",
        escape_attr(&account.url),
        escape_html(&account.username)
    )
}

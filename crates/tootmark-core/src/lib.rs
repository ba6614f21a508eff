mod bbcode;
mod config;
mod entity;
mod error;
mod escape;
mod formatter;
pub mod link_codec;
pub mod markdown;
mod model;
mod paragraph;
mod rewrite;
mod sanitize;
mod shortcode;
mod span;
mod tag_scan;

pub use bbcode::{BbcodeEngine, ParamDef, TagDef, TagTable, TagTableEngine};
pub use config::FormatterConfig;
pub use entity::{
    Entity, EntityKind, ExtractOptions, TextKind, extract_entities, extract_markdown_spans,
    extract_with_markdown, remove_overlapping,
};
pub use error::FormatError;
pub use escape::{escape_attr, escape_html, strip_tags, unescape_html};
pub use formatter::{FormatOptions, Formatter};
pub use model::{
    Account, AccountRef, AccountResolver, CustomEmoji, LinkableAccounts, NoAccounts, Status,
    same_acct,
};
pub use paragraph::simple_format;
pub use rewrite::{PlainRuns, rewrite};
pub use sanitize::{AmmoniaSanitizer, SanitizePolicy, Sanitizer};
pub use shortcode::{EmojiMap, encode_custom_emojis};
pub use span::{Span, SpanError};

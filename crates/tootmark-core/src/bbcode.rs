//! BBCode rendering over already-formatted HTML.
//!
//! `[tag]…[/tag]` and `[tag=param]…[/tag]` pairs are replaced with the HTML
//! from a [`TagTable`]. Markup already present in the input is copied
//! through, so brackets inside attribute values are never read as tags. A
//! pair only matches when both ends sit directly in the same HTML element.
//! Text inside `<pre>` and `<code>` is left alone.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FormatError;
use crate::tag_scan::parse_tag;

/// Renders BBCode found in HTML.
pub trait BbcodeEngine {
    fn render(&self, html: &str) -> Result<String, FormatError>;
}

/// Validation for a tag's `=param` and the `%token%` it fills in.
#[derive(Clone, Debug)]
pub struct ParamDef {
    pattern: Regex,
    token: String,
}

impl ParamDef {
    /// `pattern` must match the whole parameter.
    pub fn new(pattern: &str, token: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{})$", pattern))?,
            token: token.into(),
        })
    }

    fn accepts(&self, param: &str) -> bool {
        self.pattern.is_match(param)
    }
}

#[derive(Clone, Debug)]
pub struct TagDef {
    pub name: String,
    pub html_open: String,
    pub html_close: String,
    pub param: Option<ParamDef>,
}

impl TagDef {
    pub fn new(name: &str, html_open: &str, html_close: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            html_open: html_open.to_string(),
            html_close: html_close.to_string(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: ParamDef) -> Self {
        self.param = Some(param);
        self
    }

    fn open_html(&self, param: Option<&str>) -> String {
        match (&self.param, param) {
            (Some(def), Some(value)) => self
                .html_open
                .replace(&format!("%{}%", def.token), value),
            _ => self.html_open.clone(),
        }
    }
}

/// Tag name to definition.
#[derive(Clone, Debug, Default)]
pub struct TagTable {
    tags: HashMap<String, TagDef>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tags enabled for statuses and bios.
    pub fn builtin() -> Self {
        BUILTIN_TABLE.clone()
    }

    pub fn insert(&mut self, def: TagDef) {
        self.tags.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&TagDef> {
        self.tags.get(name)
    }
}

static BUILTIN_TABLE: Lazy<TagTable> = Lazy::new(|| {
    let param = |pattern: &str, token: &str| {
        ParamDef::new(pattern, token).expect("builtin bbcode parameter pattern")
    };
    let mut table = TagTable::new();
    table.insert(TagDef::new(
        "b",
        "<span style=\"font-family: 'kozuka-gothic-pro', sans-serif; font-weight: 900;\">",
        "</span>",
    ));
    table.insert(TagDef::new(
        "i",
        "<span style=\"font-family: 'kozuka-gothic-pro', sans-serif; font-style: italic; -moz-font-feature-settings: 'ital'; -webkit-font-feature-settings: 'ital'; font-feature-settings: 'ital';\">",
        "</span>",
    ));
    table.insert(TagDef::new("u", "<u>", "</u>"));
    table.insert(TagDef::new("s", "<s>", "</s>"));
    table.insert(TagDef::new("code", "<code>", "</code>"));
    table.insert(TagDef::new("quote", "<q>", "</q>"));
    table.insert(
        TagDef::new("color", "<span style=\"color: %color%;\">", "</span>")
            .with_param(param("[a-zA-Z]+|#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}", "color")),
    );
    table.insert(
        TagDef::new("size", "<span style=\"font-size: %size%px;\">", "</span>")
            .with_param(param("[0-9]{1,2}", "size")),
    );
    table.insert(TagDef::new("spin", "<span class=\"fa fa-spin\">", "</span>"));
    table.insert(TagDef::new(
        "pulse",
        "<span class=\"bbcode-pulse-loading\">",
        "</span>",
    ));
    table.insert(
        TagDef::new("flip", "<span class=\"fa fa-flip-%direction%\">", "</span>")
            .with_param(param("horizontal|vertical", "direction")),
    );
    table.insert(
        TagDef::new("large", "<span class=\"fa fa-%size%\">", "</span>")
            .with_param(param("2x|3x|4x|5x", "size")),
    );
    table.insert(
        TagDef::new("colorhex", "<span style=\"color: #%colorcode%\">", "</span>")
            .with_param(param("[0-9a-fA-F]{6}", "colorcode")),
    );
    table
});

/// [`BbcodeEngine`] driven by a [`TagTable`].
#[derive(Clone, Debug)]
pub struct TagTableEngine {
    table: TagTable,
}

impl TagTableEngine {
    pub fn new(table: TagTable) -> Self {
        Self { table }
    }
}

impl Default for TagTableEngine {
    fn default() -> Self {
        Self::new(TagTable::builtin())
    }
}

const VOID_ELEMENTS: [&str; 3] = ["br", "hr", "img"];
const LITERAL_ELEMENTS: [&str; 2] = ["pre", "code"];

struct OpenTag<'t> {
    def: &'t TagDef,
    /// Id of the HTML element the opener sits in.
    container: usize,
    /// Index of the segment holding the literal opener.
    segment: usize,
    html_open: String,
}

struct BracketTag {
    name: String,
    closing: bool,
    param: Option<String>,
    end: usize,
}

impl BbcodeEngine for TagTableEngine {
    fn render(&self, html: &str) -> Result<String, FormatError> {
        let chars: Vec<char> = html.chars().collect();
        // Openers are written literally and swapped for HTML once closed.
        let mut segments: Vec<String> = vec![String::new()];
        let mut stack: Vec<OpenTag<'_>> = Vec::new();
        let mut containers: Vec<usize> = Vec::new();
        let mut next_container = 0usize;
        let mut literal_depth = 0usize;
        let mut i = 0usize;
        while i < chars.len() {
            if chars[i] == '<'
                && let Some(tag) = parse_tag(&chars, i)
            {
                let verbatim = LITERAL_ELEMENTS.contains(&tag.name.as_str());
                if tag.closing {
                    containers.pop();
                    if verbatim {
                        literal_depth = literal_depth.saturating_sub(1);
                    }
                } else if !tag.self_closing && !VOID_ELEMENTS.contains(&tag.name.as_str()) {
                    next_container += 1;
                    containers.push(next_container);
                    if verbatim {
                        literal_depth += 1;
                    }
                }
                push_chars(&mut segments, &chars[i..tag.end]);
                i = tag.end;
                continue;
            }
            let container = containers.last().copied().unwrap_or(0);
            let Some(bracket) = (chars[i] == '[' && literal_depth == 0)
                .then(|| parse_bracket_tag(&chars, i))
                .flatten()
            else {
                push_chars(&mut segments, &chars[i..i + 1]);
                i += 1;
                continue;
            };
            let literal = &chars[i..bracket.end];
            let Some(def) = self.table.get(&bracket.name) else {
                push_chars(&mut segments, literal);
                i = bracket.end;
                continue;
            };

            if bracket.closing {
                let found = stack
                    .iter()
                    .rposition(|open| open.def.name == def.name && open.container == container);
                match found {
                    Some(pos) => {
                        for inner in &stack[pos + 1..] {
                            if inner.container == container
                                && closes_later(&chars[bracket.end..], &inner.def.name)
                            {
                                return Err(FormatError::UnbalancedTag {
                                    tag: def.name.clone(),
                                    open: inner.def.name.clone(),
                                });
                            }
                        }
                        stack.truncate(pos + 1);
                        if let Some(open) = stack.pop() {
                            segments[open.segment] = open.html_open;
                        }
                        segments.push(def.html_close.clone());
                        segments.push(String::new());
                    }
                    None => push_chars(&mut segments, literal),
                }
                i = bracket.end;
                continue;
            }

            let accepted = match (&def.param, bracket.param.as_deref()) {
                (None, None) => true,
                (Some(param_def), Some(value)) => {
                    if !param_def.accepts(value) {
                        return Err(FormatError::InvalidParam {
                            tag: def.name.clone(),
                            param: value.to_string(),
                        });
                    }
                    true
                }
                _ => false,
            };
            if accepted {
                segments.push(literal.iter().collect());
                stack.push(OpenTag {
                    def,
                    container,
                    segment: segments.len() - 1,
                    html_open: def.open_html(bracket.param.as_deref()),
                });
                segments.push(String::new());
            } else {
                push_chars(&mut segments, literal);
            }
            i = bracket.end;
        }
        if !stack.is_empty() {
            tracing::trace!(unclosed = stack.len(), "leaving unclosed bbcode tags literal");
        }
        Ok(segments.concat())
    }
}

fn push_chars(segments: &mut [String], chars: &[char]) {
    if let Some(last) = segments.last_mut() {
        last.extend(chars);
    }
}

fn closes_later(rest: &[char], name: &str) -> bool {
    let rest: String = rest.iter().collect::<String>().to_ascii_lowercase();
    rest.contains(&format!("[/{}]", name))
}

/// Parses `[name]`, `[name=param]` or `[/name]` at `chars[start] == '['`.
fn parse_bracket_tag(chars: &[char], start: usize) -> Option<BracketTag> {
    let mut j = start + 1;
    let closing = chars.get(j) == Some(&'/');
    if closing {
        j += 1;
    }
    let name_start = j;
    while j < chars.len() && chars[j].is_ascii_alphanumeric() {
        j += 1;
    }
    if j == name_start {
        return None;
    }
    let name = chars[name_start..j]
        .iter()
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    let mut param = None;
    if !closing && chars.get(j) == Some(&'=') {
        let param_start = j + 1;
        j = param_start;
        while j < chars.len() && !matches!(chars[j], ']' | '[' | '<' | '\n') {
            j += 1;
        }
        param = Some(chars[param_start..j].iter().collect());
    }
    (chars.get(j) == Some(&']')).then_some(BracketTag {
        name,
        closing,
        param,
        end: j + 1,
    })
}

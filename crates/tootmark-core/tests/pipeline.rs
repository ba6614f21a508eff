use tootmark_core::{
    Account, AccountRef, AccountResolver, AmmoniaSanitizer, BbcodeEngine, CustomEmoji, Entity,
    EntityKind, FormatError, FormatOptions, Formatter, FormatterConfig, NoAccounts, PlainRuns,
    SanitizePolicy, Sanitizer, Span, Status, TagTableEngine, rewrite,
};

fn config() -> FormatterConfig {
    FormatterConfig {
        base_url: "https://social.test".to_string(),
        local_domain: "social.test".to_string(),
        ..FormatterConfig::default()
    }
}

fn formatter() -> Formatter {
    Formatter::new(config())
}

fn local_status(text: &str) -> Status {
    Status {
        text: text.to_string(),
        local: true,
        account: Account::local("alice", "https://social.test/@alice"),
        ..Status::default()
    }
}

fn emoji_img(code: &str) -> String {
    format!(
        "<img draggable=\"false\" class=\"emojione\" alt=\":{code}:\" title=\":{code}:\" src=\"https://social.test/emoji/{code}.png\" />"
    )
}

fn emoji(code: &str) -> CustomEmoji {
    CustomEmoji::new(code, format!("https://social.test/emoji/{code}.png"))
}

#[test]
fn local_status_links_tokens_and_keeps_markdown() {
    let mut status = local_status("Hello @bob #Rust https://example.com/a\n\n**bold** :wave:");
    status.mentions = vec![Account::local("bob", "https://social.test/@bob")];
    status.emojis = vec![emoji("wave")];

    let html = formatter().format(&status, &FormatOptions::emojified());

    let expected = format!(
        "<p>Hello <span class=\"h-card\"><a href=\"https://social.test/@bob\" class=\"u-url mention\">@<span>bob</span></a></span> \
<a href=\"https://social.test/tags/rust\" class=\"mention hashtag\" rel=\"tag\">#<span>Rust</span></a> \
<a href=\"https://example.com/a\" target=\"_blank\" rel=\"nofollow noopener noreferrer\"><span class=\"invisible\">https://</span><span class=\"\">example.com/a</span><span class=\"invisible\"></span></a></p>\
<p><strong>bold</strong> {}</p>",
        emoji_img("wave")
    );
    assert_eq!(html, expected);
}

#[test]
fn emoji_are_left_alone_without_the_option() {
    let mut status = local_status(":wave:");
    status.emojis = vec![emoji("wave")];
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p>:wave:</p>"
    );
}

#[test]
fn unresolved_mentions_stay_plain() {
    let status = local_status("hi @nobody@elsewhere.test");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p>hi @nobody@elsewhere.test</p>"
    );
}

#[test]
fn reblogs_are_prefixed_with_the_original_author() {
    let mut original = local_status("hi");
    original.account = Account::local("carol", "https://social.test/@carol");
    let reblog = Status {
        local: true,
        account: Account::local("dave", "https://social.test/@dave"),
        reblog: Some(Box::new(original)),
        ..Status::default()
    };
    assert_eq!(
        formatter().format(&reblog, &FormatOptions::default()),
        "<p>RT <span class=\"h-card\"><a href=\"https://social.test/@carol\" class=\"u-url mention\">@<span>carol</span></a></span> hi</p>"
    );
}

#[test]
fn user_markup_is_escaped() {
    let status = local_status("<img src=x onerror=alert(1)> & <b>");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p>&lt;img src=x onerror=alert(1)&gt; &amp; &lt;b&gt;</p>"
    );
}

#[test]
fn markdown_link_targets_survive_bbcode() {
    let status = local_status("[docs](https://a.test/x?q=[u]y[/u]&z=1)");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p><a href=\"https://a.test/x?q=[u]y[/u]&amp;z=1\" target=\"_blank\" rel=\"nofollow noopener noreferrer\">docs</a></p>"
    );
}

#[test]
fn markdown_links_are_not_rescanned() {
    let mut status = local_status("[#tag @bob https://b.test](https://a.test/)");
    status.mentions = vec![Account::local("bob", "https://social.test/@bob")];
    let html = formatter().format(&status, &FormatOptions::default());
    assert!(!html.contains("hashtag"));
    assert!(!html.contains("h-card"));
    assert_eq!(html.matches("<a ").count(), 1);
}

#[test]
fn marker_words_in_image_text_survive() {
    let status = local_status("![a data-md-link b](https://x.test/i.png \"t data-md-link u\")");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p><img src=\"https://x.test/i.png\" alt=\"a data-md-link b\" title=\"t data-md-link u\" /></p>"
    );
}

#[test]
fn ampersand_hashtags_are_not_linked_in_any_mode() {
    let html = formatter().format(&local_status("AT&#tag"), &FormatOptions::default());
    assert_eq!(html, "<p>AT&amp;#tag</p>");
    assert_eq!(formatter().linkify("AT&#tag", &NoAccounts), "<p>AT&amp;#tag</p>");
}

#[test]
fn block_markdown_is_not_wrapped_in_paragraphs() {
    let status = local_status("# Title\n\n- one\n- two\n\n> quoted\n> more\n\ntail");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<h1>Title</h1><ul><li>one</li><li>two</li></ul><blockquote><p>quoted<br />more</p></blockquote><p>tail</p>"
    );
}

#[test]
fn bbcode_is_applied_to_local_statuses() {
    let status = local_status("[flip=horizontal]hey[/flip]");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p><span class=\"fa fa-flip-horizontal\">hey</span></p>"
    );
}

#[test]
fn failed_bbcode_keeps_the_previous_stage() {
    let status = local_status("[spin]round[/spin] and [large=9x]x[/large]");
    assert_eq!(
        formatter().format(&status, &FormatOptions::default()),
        "<p>[spin]round[/spin] and [large=9x]x[/large]</p>"
    );
}

#[test]
fn remote_statuses_are_sanitized_then_emojified() {
    let status = Status {
        text: "<p>Hi <script>steal()</script>:blob:</p>".to_string(),
        local: false,
        account: Account::remote("eve", "remote.test", "https://remote.test/@eve"),
        emojis: vec![emoji("blob")],
        ..Status::default()
    };
    assert_eq!(
        formatter().format(&status, &FormatOptions::emojified()),
        format!("<p>Hi {}</p>", emoji_img("blob"))
    );
}

#[test]
fn plaintext_of_remote_status_keeps_line_structure() {
    let status = Status {
        text: "<p>Line one<br>Line two</p><p>Tom &amp; Jerry</p>".to_string(),
        local: false,
        ..Status::default()
    };
    assert_eq!(
        formatter().plaintext(&status),
        "Line one\nLine two\nTom & Jerry\n"
    );
    let local = local_status("**raw** text");
    assert_eq!(formatter().plaintext(&local), "**raw** text");
}

#[test]
fn spoilers_always_expand_emoji() {
    let mut status = local_status("");
    status.spoiler_text = "CW :blob: <3".to_string();
    status.emojis = vec![emoji("blob")];
    assert_eq!(
        formatter().format_spoiler(&status),
        format!("CW {} &lt;3", emoji_img("blob"))
    );
}

#[test]
fn local_bio_is_linkified() {
    let mut account = Account::local("alice", "https://social.test/@alice");
    account.note = "Hi @bob, see https://a.test\nbye [u]now[/u]".to_string();
    assert_eq!(
        formatter().simplified_format(&account, &FormatOptions::default(), &NoAccounts),
        "<p>Hi @bob, see <a href=\"https://a.test\" target=\"_blank\" rel=\"nofollow noopener noreferrer\"><span class=\"invisible\">https://</span><span class=\"\">a.test</span><span class=\"invisible\"></span></a><br />bye <u>now</u></p>"
    );
}

#[test]
fn remote_bio_is_sanitized() {
    let mut account = Account::remote("eve", "remote.test", "https://remote.test/@eve");
    account.note = "<p>remote <em>bio</em></p>".to_string();
    assert_eq!(
        formatter().simplified_format(&account, &FormatOptions::default(), &NoAccounts),
        "<p>remote bio</p>"
    );
}

#[test]
fn bare_domains_link_when_enabled() {
    let bare_formatter = Formatter::new(FormatterConfig {
        extract_url_without_protocol: true,
        ..config()
    });
    assert_eq!(
        bare_formatter.linkify("visit example.com today", &NoAccounts),
        "<p>visit <a href=\"http://example.com\" target=\"_blank\" rel=\"nofollow noopener noreferrer\"><span class=\"invisible\"></span><span class=\"\">example.com</span><span class=\"invisible\"></span></a> today</p>"
    );
    assert_eq!(
        formatter().linkify("visit example.com today", &NoAccounts),
        "<p>visit example.com today</p>"
    );
}

struct FailingSanitizer;

impl Sanitizer for FailingSanitizer {
    fn sanitize(&self, _html: &str, _policy: &SanitizePolicy) -> Result<String, FormatError> {
        Err(FormatError::Sanitize("backend unavailable".to_string()))
    }
}

struct PassThrough;

impl BbcodeEngine for PassThrough {
    fn render(&self, html: &str) -> Result<String, FormatError> {
        Ok(html.to_string())
    }
}

#[test]
fn sanitizer_failure_escapes_input() {
    let formatter =
        Formatter::with_collaborators(config(), FailingSanitizer, TagTableEngine::default());
    assert_eq!(formatter.reformat("<b>x</b>"), "&lt;b&gt;x&lt;/b&gt;");
}

#[test]
fn bbcode_engine_is_pluggable() {
    let formatter = Formatter::with_collaborators(config(), AmmoniaSanitizer, PassThrough);
    assert_eq!(
        formatter.format(&local_status("[u]x[/u]"), &FormatOptions::default()),
        "<p>[u]x[/u]</p>"
    );
}

#[test]
fn formatter_is_shareable_across_threads() -> Result<(), Box<dyn std::error::Error>> {
    let formatter = std::sync::Arc::new(formatter());
    let handles: Vec<_> = (0..4)
        .map(|idx| {
            let formatter = std::sync::Arc::clone(&formatter);
            std::thread::spawn(move || {
                formatter.format(&local_status(&format!("*{idx}*")), &FormatOptions::default())
            })
        })
        .collect();
    for (idx, handle) in handles.into_iter().enumerate() {
        let html = handle.join().map_err(|_| "render thread panicked")?;
        assert_eq!(html, format!("<p><em>{idx}</em></p>"));
    }
    Ok(())
}

#[test]
fn rewrite_substitutes_exactly_the_entity_spans() -> Result<(), Box<dyn std::error::Error>> {
    let text = "12345https://x.test/<&>  #rust end";
    let entities = vec![
        Entity::new(EntityKind::Hashtag { tag: "rust".to_string() }, Span::new(25, 30)?),
        Entity::new(
            EntityKind::Url {
                url: "https://x.test/".to_string(),
            },
            Span::new(5, 20)?,
        ),
    ];
    let html = rewrite(text, &entities, PlainRuns::Escape, |entity, _| match entity.kind {
        EntityKind::Url { .. } => "[U]".to_string(),
        _ => "[H]".to_string(),
    });
    assert_eq!(html, "12345[U]&lt;&amp;&gt;  [H] end");
    Ok(())
}

struct Directory;

impl AccountResolver for Directory {
    fn resolve(&self, acct: &str) -> Option<AccountRef> {
        (acct == "bob@remote.test").then(|| AccountRef {
            username: "bob".to_string(),
            url: "https://remote.test/@bob".to_string(),
        })
    }
}

#[test]
fn linkify_uses_the_supplied_resolver() {
    assert_eq!(
        formatter().linkify("cc @bob@remote.test", &Directory),
        "<p>cc <span class=\"h-card\"><a href=\"https://remote.test/@bob\" class=\"u-url mention\">@<span>bob</span></a></span></p>"
    );
}

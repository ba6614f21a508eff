use std::fs;
use std::path::{Path, PathBuf};

use tootmark_core::{
    Account, CustomEmoji, FormatOptions, Formatter, FormatterConfig, Status, markdown,
};

#[test]
fn golden_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let fixtures_dir = root.join("tests/fixtures");
    let expect_dir = root.join("tests/expect");

    let mut fixtures = collect_fixtures(&fixtures_dir)?;
    fixtures.sort_by(|a, b| file_name(a).cmp(file_name(b)));
    if fixtures.is_empty() {
        return Err(format!("no fixtures found in {}", fixtures_dir.display()).into());
    }

    let formatter = Formatter::new(FormatterConfig {
        base_url: "https://social.test".to_string(),
        local_domain: "social.test".to_string(),
        ..FormatterConfig::default()
    });

    for fixture in fixtures {
        let name = file_stem(&fixture)?;
        let source = fs::read_to_string(&fixture)?;
        let html = formatter.format(&status(&source), &FormatOptions::emojified());

        let html_path = expect_dir.join(format!("{}.html", name));
        let expected = fs::read_to_string(&html_path)?;
        assert_eq!(
            html.trim_end(),
            expected.trim_end(),
            "HTML mismatch for fixture {}",
            name
        );
    }

    Ok(())
}

#[test]
fn markdown_examples() {
    assert_eq!(
        markdown::render("* a\n* b\n* c\n"),
        "<ul>\n<li>a</li>\n<li>b</li>\n<li>c</li>\n</ul>\n"
    );
    assert_eq!(
        markdown::render("+ one\n + inner 1\n + inner 2\n + inner 3\n+ two"),
        "<ul>\n<li>one\n<ul>\n<li>inner 1</li>\n<li>inner 2</li>\n<li>inner 3</li>\n</ul>\n</li>\n<li>two</li>\n</ul>"
    );
    assert_eq!(
        markdown::render("> a\n> > b\n> c\n"),
        "<blockquote>\na\n<blockquote>\nb\n</blockquote>\nc\n</blockquote>\n"
    );
}

fn status(text: &str) -> Status {
    Status {
        text: text.to_string(),
        local: true,
        account: Account::local("alice", "https://social.test/@alice"),
        mentions: vec![Account::local("bob", "https://social.test/@bob")],
        emojis: vec![CustomEmoji::new(
            "blob",
            "https://social.test/emoji/blob.png",
        )],
        ..Status::default()
    }
}

fn collect_fixtures(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut fixtures = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("md") {
            fixtures.push(path);
        }
    }
    Ok(fixtures)
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

fn file_stem(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|value| value.to_string())
        .ok_or_else(|| "fixture name is not valid UTF-8".into())
}

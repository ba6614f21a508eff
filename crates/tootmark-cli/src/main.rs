use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tootmark_core::{
    Account, CustomEmoji, FormatOptions, Formatter, FormatterConfig, LinkableAccounts, Status,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tootmark")]
#[command(about = "Render status text to HTML")]
struct Cli {
    /// Input file (defaults to stdin)
    input: Option<PathBuf>,

    /// Treat the input as HTML received from another server
    #[arg(long)]
    remote: bool,

    /// Render the input as a content warning
    #[arg(long, conflicts_with = "bio")]
    spoiler: bool,

    /// Render the input as an account bio
    #[arg(long)]
    bio: bool,

    /// Custom emoji available to the input, as CODE=URL
    #[arg(long = "emoji", value_name = "CODE=URL", value_parser = parse_pair)]
    emojis: Vec<(String, String)>,

    /// Accounts mentions may link to, as ACCT=URL
    #[arg(long = "account", value_name = "ACCT=URL", value_parser = parse_pair)]
    accounts: Vec<(String, String)>,

    /// Leave :shortcode: tokens as text
    #[arg(long)]
    no_emoji: bool,

    /// TOML file with formatter settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).unwrap_or_else(|err| {
            eprintln!("failed to load config {}: {}", path.display(), err);
            process::exit(1);
        }),
        None => FormatterConfig::default(),
    };

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|err| {
            eprintln!("failed to read {}: {}", path.display(), err);
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .unwrap_or_else(|err| {
                    eprintln!("failed to read stdin: {}", err);
                    process::exit(1);
                });
            buffer
        }
    };

    debug!(bytes = source.len(), remote = cli.remote, "rendering input");
    print!("{}", render(&cli, config, source));
}

fn render(cli: &Cli, config: FormatterConfig, source: String) -> String {
    let options = FormatOptions {
        custom_emojify: !cli.no_emoji,
    };
    let emojis: Vec<CustomEmoji> = cli
        .emojis
        .iter()
        .map(|(code, url)| CustomEmoji::new(code.as_str(), url.as_str()))
        .collect();
    let mentions: Vec<Account> = cli
        .accounts
        .iter()
        .map(|(acct, url)| account_from_acct(acct, url, &config.local_domain))
        .collect();

    let author_url = format!("{}/@cli", config.base_url.trim_end_matches('/'));
    let mut author = if cli.remote {
        Account::remote("cli", "remote.invalid", author_url)
    } else {
        Account::local("cli", author_url)
    };
    author.emojis = emojis.clone();

    let formatter = Formatter::new(config);

    if cli.bio {
        author.note = source;
        let resolver = LinkableAccounts::new(&mentions, &formatter.config().local_domain);
        return formatter.simplified_format(&author, &options, &resolver);
    }

    let (text, spoiler_text) = if cli.spoiler {
        (String::new(), source)
    } else {
        (source, String::new())
    };
    let status = Status {
        text,
        spoiler_text,
        local: !cli.remote,
        account: author,
        mentions,
        emojis,
        reblog: None,
    };
    if cli.spoiler {
        formatter.format_spoiler(&status)
    } else {
        formatter.format(&status, &options)
    }
}

fn load_config(path: &Path) -> Result<FormatterConfig, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn account_from_acct(acct: &str, url: &str, local_domain: &str) -> Account {
    let acct = acct.trim_start_matches('@');
    match acct.split_once('@') {
        Some((username, domain)) if !domain.eq_ignore_ascii_case(local_domain) => {
            Account::remote(username, domain, url)
        }
        Some((username, _)) => Account::local(username, url),
        None => Account::local(acct, url),
    }
}

fn parse_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, rest)) if !key.is_empty() && !rest.is_empty() => {
            Ok((key.to_string(), rest.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {:?}", value)),
    }
}

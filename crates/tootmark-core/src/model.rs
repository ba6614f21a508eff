//! Records handed to the formatter by its caller. Nothing here is persisted
//! or looked up by the pipeline itself.

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CustomEmoji {
    pub shortcode: String,
    /// Animated image, used when `animate_emoji` is enabled.
    pub url: String,
    pub static_url: String,
}

impl CustomEmoji {
    pub fn new(shortcode: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            shortcode: shortcode.into(),
            static_url: url.clone(),
            url,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Account {
    pub username: String,
    /// `None` for accounts on this instance.
    pub domain: Option<String>,
    pub url: String,
    pub display_name: String,
    pub note: String,
    pub emojis: Vec<CustomEmoji>,
}

impl Account {
    pub fn local(username: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn remote(
        username: impl Into<String>,
        domain: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            domain: Some(domain.into()),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.username, domain),
            None => self.username.clone(),
        }
    }

    pub fn to_ref(&self) -> AccountRef {
        AccountRef {
            username: self.username.clone(),
            url: self.url.clone(),
        }
    }
}

/// The part of an account a mention link needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountRef {
    pub username: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Status {
    pub text: String,
    pub spoiler_text: String,
    pub local: bool,
    pub account: Account,
    pub mentions: Vec<Account>,
    pub emojis: Vec<CustomEmoji>,
    pub reblog: Option<Box<Status>>,
}

impl Status {
    /// The status whose content is shown: the reblogged one, if any.
    pub fn proper(&self) -> &Status {
        match &self.reblog {
            Some(reblog) => reblog,
            None => self,
        }
    }
}

/// Resolves `user` / `user@domain` to a linkable account.
pub trait AccountResolver {
    fn resolve(&self, acct: &str) -> Option<AccountRef>;
}

/// Resolves mentions against a fixed set of accounts, such as the ones a
/// status mentions plus its author.
#[derive(Clone, Copy, Debug)]
pub struct LinkableAccounts<'a> {
    accounts: &'a [Account],
    local_domain: &'a str,
}

impl<'a> LinkableAccounts<'a> {
    pub fn new(accounts: &'a [Account], local_domain: &'a str) -> Self {
        Self {
            accounts,
            local_domain,
        }
    }
}

impl AccountResolver for LinkableAccounts<'_> {
    fn resolve(&self, acct: &str) -> Option<AccountRef> {
        self.accounts
            .iter()
            .find(|account| same_acct(&account.acct(), acct, self.local_domain))
            .map(Account::to_ref)
    }
}

/// Resolver that knows no accounts; every mention renders as plain text.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAccounts;

impl AccountResolver for NoAccounts {
    fn resolve(&self, _acct: &str) -> Option<AccountRef> {
        None
    }
}

/// Case-insensitive acct comparison where `@local_domain` equals no domain.
pub fn same_acct(left: &str, right: &str, local_domain: &str) -> bool {
    let normalize = |acct: &str| {
        let lowered = acct.to_lowercase();
        match lowered.split_once('@') {
            Some((user, domain)) if domain == local_domain.to_lowercase() => user.to_string(),
            _ => lowered,
        }
    };
    normalize(left) == normalize(right)
}

//! Where the mailbox lives and how to reach it.

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// The IMAPS port.
pub const DEFAULT_PORT: u16 = 993;

/// The mailbox every IMAP server is required to have.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Connection settings and credentials for one mailbox.
///
/// ```
/// # use std::time::Duration;
/// # use mailtoken::Account;
/// let account = Account::new("imap.example.com", "qa@example.com", "hunter2")
///     .port(1993)
///     .timeout(Duration::from_secs(10));
/// assert_eq!(account.port, 1993);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Host name, used both to resolve the server and for TLS certificate verification.
    pub host: String,
    /// Implicit-TLS port, 993 unless told otherwise.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Plaintext password sent with `LOGIN`.
    pub password: String,
    /// The mailbox to select, `INBOX` by default.
    pub mailbox: String,
    /// Upper bound for establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Upper bound for each blocking read.
    pub read_timeout: Option<Duration>,
    /// Upper bound for each blocking write.
    pub write_timeout: Option<Duration>,
    /// Skip certificate and host name verification. Only meant for local test servers.
    pub accept_invalid_certs: bool,
}

impl Account {
    /// Settings for `username` on `host`, with the default port and mailbox and no timeouts.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Account {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            mailbox: DEFAULT_MAILBOX.to_string(),
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            accept_invalid_certs: false,
        }
    }

    /// Use a port other than 993.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Select a mailbox other than `INBOX`.
    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Apply the same bound to connecting, reading and writing.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.read_timeout = Some(timeout);
        self.write_timeout = Some(timeout);
        self
    }

    /// Accept any certificate the server presents.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build an account from `IMAP_HOST`, `IMAP_USER` and `IMAP_PASSWORD`, plus the optional
    /// `IMAP_PORT`, `IMAP_MAILBOX` and `IMAP_TIMEOUT` (in seconds).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let mut account = Account::new(
            required("IMAP_HOST")?,
            required("IMAP_USER")?,
            required("IMAP_PASSWORD")?,
        );

        if let Some(port) = lookup("IMAP_PORT") {
            account.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid("IMAP_PORT", port))?;
        }
        if let Some(mailbox) = lookup("IMAP_MAILBOX") {
            account.mailbox = mailbox;
        }
        if let Some(timeout) = lookup("IMAP_TIMEOUT") {
            let secs = timeout
                .parse()
                .map_err(|_| ConfigError::Invalid("IMAP_TIMEOUT", timeout))?;
            account = account.timeout(Duration::from_secs(secs));
        }

        Ok(account)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// An [`Account`] could not be built from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set but its value cannot be used.
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::Missing(key) => write!(f, "{} is not set", key),
            ConfigError::Invalid(key, ref value) => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl StdError for ConfigError {}

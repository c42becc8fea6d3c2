//! Connection configuration and provider presets.

use std::time::Duration;

use crate::{Error, Result};

/// Known mail providers with preset server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Gmail / Google Workspace.
    Gmail,
    /// Outlook / Office 365.
    Outlook,
    /// Yahoo Mail.
    Yahoo,
    /// Manually configured server.
    Custom,
}

impl Provider {
    /// Guesses the provider from an email address domain.
    #[must_use]
    pub fn from_email(email: &str) -> Self {
        let domain = email.rsplit('@').next().unwrap_or("").to_lowercase();
        match domain.as_str() {
            "gmail.com" | "googlemail.com" => Self::Gmail,
            "outlook.com" | "hotmail.com" | "live.com" | "office365.com" => Self::Outlook,
            "yahoo.com" | "ymail.com" => Self::Yahoo,
            _ => Self::Custom,
        }
    }

    /// IMAP server host for this provider, if preset.
    #[must_use]
    pub fn imap_host(self) -> Option<&'static str> {
        match self {
            Self::Gmail => Some("imap.gmail.com"),
            Self::Outlook => Some("outlook.office365.com"),
            Self::Yahoo => Some("imap.mail.yahoo.com"),
            Self::Custom => None,
        }
    }
}

/// Settings for one IMAP connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port, normally 993.
    pub port: u16,
    /// Login username, normally the email address.
    pub username: String,
    /// Login password or app password.
    pub password: String,
    /// Timeout applied to the TCP connect and TLS handshake.
    ///
    /// Commands after connect have no per-operation deadline; a stuck
    /// server stalls the session until the transport errors out.
    pub connect_timeout: Duration,
    /// Skip server certificate verification. Only for test servers.
    pub danger_accept_invalid_certs: bool,
}

impl SessionConfig {
    /// Creates a config with explicit server settings.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(30),
            danger_accept_invalid_certs: false,
        }
    }

    /// Creates a config from an email address using provider presets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the domain has no known preset.
    pub fn for_email(email: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let email = email.into();
        let host = Provider::from_email(&email)
            .imap_host()
            .ok_or_else(|| Error::Config(format!("no server preset for address {email}")))?;
        Ok(Self::new(host, 993, email, password))
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Disables certificate verification. Only for test servers.
    #[must_use]
    pub fn with_danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }
}

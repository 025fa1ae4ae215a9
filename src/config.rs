//! Session configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// TLS settings for the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TlsOptions {
    /// Wrap the socket in TLS.
    pub enabled: bool,
    /// Verify the server certificate against the system roots.
    pub verify: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        TlsOptions {
            enabled: false,
            verify: true,
        }
    }
}

/// How to log in once connected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "method", rename_all = "snake_case"))]
pub enum LoginMethod {
    /// No account login.
    #[default]
    None,
    /// SASL PLAIN during capability negotiation.
    SaslPlain {
        /// Account name; the nickname is used when unset.
        account: Option<String>,
        /// Account password.
        password: String,
    },
}

impl LoginMethod {
    /// `true` for any SASL method.
    pub fn is_sasl(&self) -> bool {
        matches!(self, LoginMethod::SaslPlain { .. })
    }
}

/// Keepalive and reconnect timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timing {
    /// How often to PING once registered.
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead.
    pub ping_timeout: Duration,
    /// First reconnect delay.
    pub reconnect_base: Duration,
    /// Added to the reconnect delay after each failed attempt.
    pub reconnect_step: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(60),
            reconnect_base: Duration::from_secs(5),
            reconnect_step: Duration::from_secs(5),
        }
    }
}

/// Everything a [`Session`](crate::Session) needs to know about one server.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Display name of the server entry.
    pub name: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// TLS settings.
    pub tls: TlsOptions,
    /// Server password (`PASS`).
    pub password: Option<String>,
    /// Preferred nickname.
    pub nickname: String,
    /// Nicknames to try, in order, when the preferred one is taken.
    pub alternate_nicknames: Vec<String>,
    /// Username (ident).
    pub username: String,
    /// Real name (GECOS).
    pub realname: String,
    /// Account login.
    pub login: LoginMethod,
    /// Character encoding label of the server, e.g. `UTF-8` or `ISO-8859-1`.
    pub encoding: String,
    /// Keepalive and reconnect timing.
    pub timing: Timing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            name: String::new(),
            host: String::new(),
            port: 6667,
            tls: TlsOptions::default(),
            password: None,
            nickname: String::new(),
            alternate_nicknames: Vec::new(),
            username: String::new(),
            realname: String::new(),
            login: LoginMethod::None,
            encoding: "UTF-8".to_owned(),
            timing: Timing::default(),
        }
    }
}

impl SessionConfig {
    /// Plain-text connection to `host:port` as `nickname`. Username and
    /// real name default to the nickname.
    pub fn new(host: impl Into<String>, port: u16, nickname: impl Into<String>) -> Self {
        let host = host.into();
        let nickname = nickname.into();
        SessionConfig {
            name: host.clone(),
            host,
            port,
            username: nickname.clone(),
            realname: nickname.clone(),
            nickname,
            ..Default::default()
        }
    }

    /// Enable TLS.
    pub fn with_tls(mut self, verify: bool) -> Self {
        self.tls = TlsOptions {
            enabled: true,
            verify,
        };
        self
    }

    /// Log in with SASL PLAIN.
    pub fn with_sasl_plain(mut self, account: Option<&str>, password: impl Into<String>) -> Self {
        self.login = LoginMethod::SaslPlain {
            account: account.map(str::to_owned),
            password: password.into(),
        };
        self
    }

    /// Set the server password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set fallback nicknames.
    pub fn with_alternate_nicknames<I, S>(mut self, nicks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_nicknames = nicks.into_iter().map(Into::into).collect();
        self
    }

    /// Override timing.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Check the configuration before a session is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Empty("host"));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.nickname.is_empty() {
            return Err(ConfigError::Empty("nickname"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::Empty("username"));
        }
        if self.realname.is_empty() {
            return Err(ConfigError::Empty("realname"));
        }
        if let LoginMethod::SaslPlain { password, .. } = &self.login {
            if password.is_empty() {
                return Err(ConfigError::Empty("sasl password"));
            }
        }

        let t = &self.timing;
        for (value, name) in [
            (t.ping_interval, "ping interval"),
            (t.ping_timeout, "ping timeout"),
            (t.reconnect_base, "reconnect base"),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if t.ping_timeout < t.ping_interval {
            return Err(ConfigError::TimeoutBelowInterval);
        }

        #[cfg(feature = "encoding")]
        if encoding::Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(ConfigError::UnknownEncoding(self.encoding.clone()));
        }

        Ok(())
    }

    /// The SASL account name: configured account or the nickname.
    pub fn sasl_account(&self) -> Option<(&str, &str)> {
        match &self.login {
            LoginMethod::SaslPlain { account, password } => Some((
                account.as_deref().unwrap_or(&self.nickname),
                password.as_str(),
            )),
            LoginMethod::None => None,
        }
    }
}

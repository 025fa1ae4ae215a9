//! SASL authentication helpers.
//!
//! Only PLAIN is implemented on the client side. The exchange runs as:
//!
//! ```text
//! C: AUTHENTICATE PLAIN
//! S: AUTHENTICATE +
//! C: AUTHENTICATE <base64(authzid \0 authcid \0 password)>   (400-byte chunks)
//! S: 900 / 903  or  902 / 904 / 905 / 906 / 908
//! ```
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single AUTHENTICATE payload.
pub const SASL_CHUNK_SIZE: usize = 400;

/// SASL mechanisms a server may advertise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SaslMechanism {
    /// PLAIN (RFC 4616).
    Plain,
    /// EXTERNAL, TLS client certificate.
    External,
    /// SCRAM-SHA-256 (RFC 7677).
    ScramSha256,
    /// Anything else.
    Unknown(String),
}

impl SaslMechanism {
    /// Parse a mechanism name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Self::Plain,
            "EXTERNAL" => Self::External,
            "SCRAM-SHA-256" => Self::ScramSha256,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Canonical mechanism name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated mechanism list, as carried in the `sasl`
/// capability value or in `RPL_SASLMECHS` (908).
pub fn parse_mechanisms(list: &str) -> Vec<SaslMechanism> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SaslMechanism::parse)
        .collect()
}

/// Encode PLAIN credentials with an empty authorization identity.
///
/// ```
/// use slirc_session::sasl::encode_plain;
///
/// // "\0jilles\0sesame"
/// assert_eq!(encode_plain("jilles", "sesame"), "AGppbGxlcwBzZXNhbWU=");
/// ```
pub fn encode_plain(username: &str, password: &str) -> String {
    let payload = format!("\0{}\0{}", username, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded response into AUTHENTICATE payloads.
///
/// A response whose length is an exact multiple of [`SASL_CHUNK_SIZE`]
/// (including the empty response) is terminated with a lone `+`.
pub fn authenticate_payloads(encoded: &str) -> Vec<&str> {
    // base64 output is ASCII, so any byte offset is a char boundary.
    let mut payloads: Vec<&str> = Vec::with_capacity(encoded.len() / SASL_CHUNK_SIZE + 1);
    let mut rest = encoded;
    while rest.len() > SASL_CHUNK_SIZE {
        let (head, tail) = rest.split_at(SASL_CHUNK_SIZE);
        payloads.push(head);
        rest = tail;
    }
    if rest.len() == SASL_CHUNK_SIZE {
        payloads.push(rest);
        payloads.push("+");
    } else if rest.is_empty() {
        payloads.push("+");
    } else {
        payloads.push(rest);
    }
    payloads
}

/// Progress of the client side of a SASL exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaslState {
    /// Nothing sent yet.
    #[default]
    Idle,
    /// `AUTHENTICATE PLAIN` sent, waiting for `AUTHENTICATE +`.
    MechanismSent,
    /// Credentials sent, waiting for a numeric.
    CredentialsSent,
    /// The server answered with a final numeric.
    Finished,
}

/// How a SASL exchange ended, as reported to the event handler.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SaslOutcome {
    /// 900 RPL_LOGGEDIN: logged in as the given account.
    LoggedIn {
        /// Account name from the numeric.
        account: String,
    },
    /// 903 RPL_SASLSUCCESS.
    Succeeded,
    /// 901 RPL_LOGGEDOUT.
    LoggedOut,
    /// 902/904/905/906/907/908 with the server's explanation.
    Failed {
        /// The numeric that ended the exchange.
        code: u16,
        /// Human-readable text from the server.
        reason: String,
    },
    /// SASL login was configured but the server does not offer it.
    Unavailable,
}

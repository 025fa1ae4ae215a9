use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::nom_parser::parse_line;
use super::tags::{escape_tag_value, Tag};
use crate::error::{ParseError, ProtocolViolation};
use crate::prefix::Prefix;

/// A parsed IRC message.
///
/// Middle parameters and the trailing parameter are kept apart so that a
/// message can be re-serialized exactly; [`Message::arg`] indexes them as a
/// single list the way handlers usually want them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 tags, empty when the line had none.
    pub tags: Vec<Tag>,
    /// Message source.
    pub prefix: Option<Prefix>,
    /// Command word (upper-cased) or three-digit numeric.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter, if the line had one.
    pub trailing: Option<String>,
}

impl Message {
    /// Parse a single line.
    ///
    /// ```
    /// use slirc_session::Message;
    ///
    /// let msg = Message::parse(":nick!user@host PRIVMSG #rust :hello world").unwrap();
    /// assert_eq!(msg.nick(), Some("nick"));
    /// assert_eq!(msg.arg(0), Some("#rust"));
    /// assert_eq!(msg.arg(1), Some("hello world"));
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        parse_line(line)
    }

    /// Prefix name: the nickname for user sources, otherwise the server name.
    pub fn source(&self) -> Option<&str> {
        self.prefix.as_ref().map(Prefix::name)
    }

    /// Nickname, only when the prefix is a full `nick!user@host`.
    pub fn nick(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::Nickname(nick, _, _)) => Some(nick),
            _ => None,
        }
    }

    /// Username of a user source.
    pub fn user(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::user)
    }

    /// Hostname of a user source.
    pub fn host(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::host)
    }

    /// Number of parameters, trailing included.
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.trailing.is_some())
    }

    /// Parameter `i`, counting the trailing parameter last.
    pub fn arg(&self, i: usize) -> Option<&str> {
        match self.params.get(i) {
            Some(p) => Some(p),
            None if i == self.params.len() => self.trailing.as_deref(),
            None => None,
        }
    }

    /// The final parameter, trailing or not.
    pub fn last_arg(&self) -> Option<&str> {
        self.trailing
            .as_deref()
            .or_else(|| self.params.last().map(String::as_str))
    }

    /// Parameters from `start` onwards, trailing included.
    pub fn args_from(&self, start: usize) -> Vec<&str> {
        (start..self.arg_count()).filter_map(|i| self.arg(i)).collect()
    }

    /// Ensure at least `n` parameters are present.
    pub fn require_args(&self, n: usize) -> Result<(), ProtocolViolation> {
        let got = self.arg_count();
        if got < n {
            return Err(ProtocolViolation {
                command: self.command.clone(),
                expected: n,
                got,
            });
        }
        Ok(())
    }

    /// Numeric code when the command is exactly three digits.
    pub fn numeric(&self) -> Option<u16> {
        let bytes = self.command.as_bytes();
        if bytes.len() == 3 && bytes.iter().all(u8::is_ascii_digit) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Value of tag `key`; `Some("")` for a tag present without a value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key() == key)
            .map(|t| t.value().unwrap_or(""))
    }

    /// Timestamp from the `server-time` tag, if present and well-formed.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.tag("time")?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl FromStr for Message {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)
    }
}

impl fmt::Display for Message {
    /// Wire form without CRLF.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_str("@")?;
            for (i, Tag(key, value)) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(key)?;
                if let Some(value) = value {
                    f.write_str("=")?;
                    escape_tag_value(f, value)?;
                }
            }
            f.write_str(" ")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for p in &self.params {
            write!(f, " {}", p)?;
        }
        if let Some(t) = &self.trailing {
            write!(f, " :{}", t)?;
        }
        Ok(())
    }
}

//! IRC message prefix (source) types.
//!
//! A prefix either names a server or a user as `nick!user@host`. Anything
//! that does not have all three user parts is kept opaque as a server name.

use std::fmt;
use std::str::FromStr;

/// The source of an IRC message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// A server name, or any prefix that is not a full user mask.
    ServerName(String),
    /// `nick!user@host`.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix string (without the leading `:`).
    pub fn parse(s: &str) -> Self {
        match split_user_mask(s) {
            Some((nick, user, host)) => {
                Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
            }
            None => Prefix::ServerName(s.to_owned()),
        }
    }

    /// Nickname or server name, whichever this prefix carries.
    pub fn name(&self) -> &str {
        match self {
            Prefix::ServerName(name) => name,
            Prefix::Nickname(nick, _, _) => nick,
        }
    }

    /// Username, if this is a user mask.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) => Some(user),
            Prefix::ServerName(_) => None,
        }
    }

    /// Hostname, if this is a user mask.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, _, host) => Some(host),
            Prefix::ServerName(_) => None,
        }
    }

    /// `true` if the prefix decomposed into nick, user and host.
    pub fn is_user(&self) -> bool {
        matches!(self, Prefix::Nickname(..))
    }
}

fn split_user_mask(s: &str) -> Option<(&str, &str, &str)> {
    let (nick, rest) = s.split_once('!')?;
    let (user, host) = rest.split_once('@')?;
    if nick.is_empty() || user.is_empty() || host.is_empty() {
        return None;
    }
    Some((nick, user, host))
}

impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::parse(s))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => write!(f, "{}!{}@{}", nick, user, host),
        }
    }
}

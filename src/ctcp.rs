//! Client-To-Client Protocol framing.
//!
//! A CTCP message is a PRIVMSG (request) or NOTICE (response) whose text is
//! wrapped in `\x01`: `\x01COMMAND [params]\x01`. A body missing either
//! delimiter is ordinary text.

const DELIM: char = '\u{1}';

/// A CTCP message borrowed from a PRIVMSG or NOTICE body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// CTCP command, e.g. `ACTION` or `VERSION`.
    pub command: &'a str,
    /// Everything after the first space, if anything.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a message body; `None` when it is not CTCP.
    ///
    /// ```
    /// use slirc_session::ctcp::Ctcp;
    ///
    /// let c = Ctcp::parse("\u{1}ACTION waves\u{1}").unwrap();
    /// assert_eq!(c.command, "ACTION");
    /// assert_eq!(c.params, Some("waves"));
    /// assert!(Ctcp::parse("plain text").is_none());
    /// ```
    pub fn parse(body: &'a str) -> Option<Self> {
        let inner = body.strip_prefix(DELIM)?;
        let inner = inner.strip_suffix(DELIM)?;
        if inner.is_empty() {
            return None;
        }
        let (command, params) = match inner.split_once(' ') {
            Some((c, p)) => (c, Some(p)),
            None => (inner, None),
        };
        if command.is_empty() {
            return None;
        }
        Some(Ctcp { command, params })
    }

    /// `true` for `/me` actions.
    pub fn is_action(&self) -> bool {
        self.command.eq_ignore_ascii_case("ACTION")
    }
}

/// Wrap a command and optional params in CTCP delimiters.
pub fn frame(command: &str, params: Option<&str>) -> String {
    match params {
        Some(p) => format!("{DELIM}{command} {p}{DELIM}"),
        None => format!("{DELIM}{command}{DELIM}"),
    }
}

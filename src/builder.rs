//! Outgoing line construction.
//!
//! Lines are budgeted against [`LINE_BUDGET`]: the server prepends our full
//! `:nick!user@host` prefix when relaying, so a client line must leave room
//! for it or the relayed copy gets cut off.

use crate::error::BuildError;
use crate::util::{find_line_breaker, truncate_utf8_safe, LINE_BUDGET};

/// Incrementally builds one outgoing line.
///
/// ```
/// use slirc_session::builder::CommandBuilder;
///
/// let mut b = CommandBuilder::new("PRIVMSG").unwrap();
/// b.add_middle("#rust").unwrap();
/// assert_eq!(b.set_trailing("hello"), None);
/// assert_eq!(b.build(), "PRIVMSG #rust :hello\r\n");
/// ```
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    line: String,
    budget: usize,
    has_trailing: bool,
}

impl CommandBuilder {
    /// Start a line for `command`.
    pub fn new(command: &str) -> Result<Self, BuildError> {
        Self::with_budget(command, LINE_BUDGET)
    }

    /// Start a line with a custom byte budget (CRLF included).
    pub fn with_budget(command: &str, budget: usize) -> Result<Self, BuildError> {
        if command.is_empty() || !command.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(BuildError::InvalidCommand(command.to_owned()));
        }
        if command.len() + 2 > budget {
            return Err(BuildError::InvalidCommand(command.to_owned()));
        }
        Ok(CommandBuilder {
            line: command.to_owned(),
            budget,
            has_trailing: false,
        })
    }

    /// Bytes the finished line would take, CRLF included.
    pub fn expected_len(&self) -> usize {
        self.line.len() + 2
    }

    /// Append a middle parameter.
    pub fn add_middle(&mut self, param: &str) -> Result<(), BuildError> {
        if param.is_empty() || param.starts_with(':') || param.contains(' ') {
            return Err(BuildError::InvalidMiddle(param.to_owned()));
        }
        if let Some(c) = find_line_breaker(param) {
            return Err(BuildError::IllegalChar(c));
        }
        if self.has_trailing || self.expected_len() + 1 + param.len() > self.budget {
            return Err(BuildError::MiddleDoesNotFit {
                param: param.to_owned(),
                budget: self.budget,
            });
        }
        self.line.push(' ');
        self.line.push_str(param);
        Ok(())
    }

    /// Bytes left for a trailing parameter after its ` :` marker.
    pub fn trailing_room(&self) -> usize {
        self.budget.saturating_sub(self.expected_len() + 2)
    }

    /// Set the trailing parameter, keeping as much of `param` as fits on a
    /// UTF-8 boundary. Returns the part that did not fit, or `None` when all
    /// of it was taken. If nothing fits the whole input comes back unchanged.
    ///
    /// Callers are expected to have rejected CR, LF and NUL already.
    pub fn set_trailing<'a>(&mut self, param: &'a str) -> Option<&'a str> {
        let head = truncate_utf8_safe(param, self.trailing_room());
        if head.is_empty() && !param.is_empty() {
            return Some(param);
        }
        self.line.push_str(" :");
        self.line.push_str(head);
        self.has_trailing = true;
        let rest = &param[head.len()..];
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Finish the line, appending CRLF.
    pub fn build(mut self) -> String {
        self.line.push_str("\r\n");
        self.line
    }
}

/// Build `command` with `middles` and an optional trailing parameter,
/// splitting a long trailing parameter over as many lines as needed. Each
/// continuation line repeats the command and middles.
///
/// ```
/// use slirc_session::builder::build;
///
/// let text = "x".repeat(600);
/// let lines = build("PRIVMSG", &["#rust"], Some(&text)).unwrap();
/// assert_eq!(lines.len(), 2);
/// assert!(lines.iter().all(|l| l.len() <= 462 && l.ends_with("\r\n")));
/// ```
pub fn build(
    command: &str,
    middles: &[&str],
    trailing: Option<&str>,
) -> Result<Vec<String>, BuildError> {
    let mut base = CommandBuilder::new(command)?;
    for m in middles {
        base.add_middle(m)?;
    }

    let Some(mut rest) = trailing else {
        return Ok(vec![base.build()]);
    };
    if let Some(c) = find_line_breaker(rest) {
        return Err(BuildError::IllegalChar(c));
    }

    let mut lines = Vec::new();
    loop {
        let mut line = base.clone();
        match line.set_trailing(rest) {
            None => {
                lines.push(line.build());
                return Ok(lines);
            }
            Some(left) if left.len() == rest.len() => return Err(BuildError::NoRoomForTrailing),
            Some(left) => {
                lines.push(line.build());
                rest = left;
            }
        }
    }
}

/// Like [`build`], but the trailing parameter must fit on one line.
pub fn build_single(
    command: &str,
    middles: &[&str],
    trailing: Option<&str>,
) -> Result<String, BuildError> {
    let mut line = CommandBuilder::new(command)?;
    for m in middles {
        line.add_middle(m)?;
    }
    if let Some(t) = trailing {
        if let Some(c) = find_line_breaker(t) {
            return Err(BuildError::IllegalChar(c));
        }
        let room = line.trailing_room();
        if line.set_trailing(t).is_some() {
            return Err(BuildError::TrailingTooLong { len: t.len(), room });
        }
    }
    Ok(line.build())
}

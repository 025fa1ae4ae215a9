//! Typed outgoing commands.
//!
//! Each constructor validates its arguments up front so that a command that
//! exists can always be serialized (barring pathological lengths).

use crate::builder::{build, build_single};
use crate::ctcp;
use crate::error::{BuildError, CommandError};
use crate::util::find_line_breaker;

/// A client command ready for the Command Builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingCommand {
    verb: String,
    middles: Vec<String>,
    trailing: Option<String>,
    splittable: bool,
}

fn required(value: &str, what: &'static str) -> Result<(), CommandError> {
    if value.is_empty() {
        return Err(CommandError::MissingArgument(what));
    }
    Ok(())
}

fn middle(value: &str, what: &'static str) -> Result<String, CommandError> {
    required(value, what)?;
    if value.starts_with(':') || value.contains(' ') {
        return Err(BuildError::InvalidMiddle(value.to_owned()).into());
    }
    if let Some(c) = find_line_breaker(value) {
        return Err(BuildError::IllegalChar(c).into());
    }
    Ok(value.to_owned())
}

fn text(value: &str) -> Result<String, CommandError> {
    if let Some(c) = find_line_breaker(value) {
        return Err(BuildError::IllegalChar(c).into());
    }
    Ok(value.to_owned())
}

impl OutgoingCommand {
    fn new(verb: &str, middles: Vec<String>, trailing: Option<String>) -> Self {
        OutgoingCommand {
            verb: verb.to_owned(),
            middles,
            trailing,
            splittable: false,
        }
    }

    /// Arbitrary command. Middles are validated, the trailing parameter
    /// must fit on one line.
    pub fn raw(
        verb: &str,
        middles: &[&str],
        trailing: Option<&str>,
    ) -> Result<Self, CommandError> {
        required(verb, "command")?;
        if !verb.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(BuildError::InvalidCommand(verb.to_owned()).into());
        }
        let middles = middles
            .iter()
            .map(|m| middle(m, "parameter"))
            .collect::<Result<_, _>>()?;
        let trailing = trailing.map(text).transpose()?;
        Ok(Self::new(&verb.to_ascii_uppercase(), middles, trailing))
    }

    /// `PASS <password>`
    pub fn pass(password: &str) -> Result<Self, CommandError> {
        Ok(Self::new("PASS", vec![middle(password, "password")?], None))
    }

    /// `NICK <nickname>`
    pub fn nick(nickname: &str) -> Result<Self, CommandError> {
        Ok(Self::new("NICK", vec![middle(nickname, "nickname")?], None))
    }

    /// `USER <username> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Result<Self, CommandError> {
        required(realname, "realname")?;
        Ok(Self::new(
            "USER",
            vec![middle(username, "username")?, "0".into(), "*".into()],
            Some(text(realname)?),
        ))
    }

    /// `JOIN <channel> [<key>]`
    pub fn join(channel: &str, key: Option<&str>) -> Result<Self, CommandError> {
        let mut middles = vec![middle(channel, "channel")?];
        if let Some(key) = key {
            middles.push(middle(key, "key")?);
        }
        Ok(Self::new("JOIN", middles, None))
    }

    /// `PART <channel> [:<reason>]`
    pub fn part(channel: &str, reason: Option<&str>) -> Result<Self, CommandError> {
        Ok(Self::new(
            "PART",
            vec![middle(channel, "channel")?],
            reason.map(text).transpose()?,
        ))
    }

    /// `QUIT [:<reason>]`
    pub fn quit(reason: Option<&str>) -> Result<Self, CommandError> {
        Ok(Self::new("QUIT", vec![], reason.map(text).transpose()?))
    }

    /// `TOPIC <channel> [:<topic>]`; without a topic this queries it.
    pub fn topic(channel: &str, topic: Option<&str>) -> Result<Self, CommandError> {
        Ok(Self::new(
            "TOPIC",
            vec![middle(channel, "channel")?],
            topic.map(text).transpose()?,
        ))
    }

    /// `KICK <channel> <nick> [:<reason>]`
    pub fn kick(channel: &str, nick: &str, reason: Option<&str>) -> Result<Self, CommandError> {
        Ok(Self::new(
            "KICK",
            vec![middle(channel, "channel")?, middle(nick, "nickname")?],
            reason.map(text).transpose()?,
        ))
    }

    /// `MODE <target> [<modes> [<args>...]]`
    pub fn mode(target: &str, modes: &[&str]) -> Result<Self, CommandError> {
        let mut middles = vec![middle(target, "target")?];
        for m in modes {
            middles.push(middle(m, "mode")?);
        }
        Ok(Self::new("MODE", middles, None))
    }

    /// `INVITE <nick> <channel>`
    pub fn invite(nick: &str, channel: &str) -> Result<Self, CommandError> {
        Ok(Self::new(
            "INVITE",
            vec![middle(nick, "nickname")?, middle(channel, "channel")?],
            None,
        ))
    }

    /// `NAMES [<channel>]`
    pub fn names(channel: Option<&str>) -> Result<Self, CommandError> {
        let middles = channel.map(|c| middle(c, "channel")).transpose()?;
        Ok(Self::new("NAMES", middles.into_iter().collect(), None))
    }

    /// `WHOIS <nick>`
    pub fn whois(nick: &str) -> Result<Self, CommandError> {
        Ok(Self::new("WHOIS", vec![middle(nick, "nickname")?], None))
    }

    /// `LIST [<channel>]`
    pub fn list(channel: Option<&str>) -> Result<Self, CommandError> {
        let middles = channel.map(|c| middle(c, "channel")).transpose()?;
        Ok(Self::new("LIST", middles.into_iter().collect(), None))
    }

    /// `AWAY [:<message>]`; `None` clears away status.
    pub fn away(message: Option<&str>) -> Result<Self, CommandError> {
        Ok(Self::new("AWAY", vec![], message.map(text).transpose()?))
    }

    /// `PING :<token>`
    pub fn ping(token: &str) -> Result<Self, CommandError> {
        required(token, "token")?;
        Ok(Self::new("PING", vec![], Some(text(token)?)))
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Result<Self, CommandError> {
        Ok(Self::new("PONG", vec![], Some(text(token)?)))
    }

    /// `PRIVMSG <target> :<text>`; long text is split across lines.
    pub fn privmsg(target: &str, body: &str) -> Result<Self, CommandError> {
        required(body, "text")?;
        let mut cmd = Self::new("PRIVMSG", vec![middle(target, "target")?], Some(text(body)?));
        cmd.splittable = true;
        Ok(cmd)
    }

    /// `NOTICE <target> :<text>`; long text is split across lines.
    pub fn notice(target: &str, body: &str) -> Result<Self, CommandError> {
        required(body, "text")?;
        let mut cmd = Self::new("NOTICE", vec![middle(target, "target")?], Some(text(body)?));
        cmd.splittable = true;
        Ok(cmd)
    }

    /// CTCP request, sent as a PRIVMSG.
    pub fn ctcp_request(target: &str, command: &str, args: Option<&str>) -> Result<Self, CommandError> {
        required(command, "ctcp command")?;
        let body = ctcp::frame(command, args);
        Ok(Self::new("PRIVMSG", vec![middle(target, "target")?], Some(text(&body)?)))
    }

    /// CTCP response, sent as a NOTICE.
    pub fn ctcp_response(target: &str, command: &str, args: Option<&str>) -> Result<Self, CommandError> {
        required(command, "ctcp command")?;
        let body = ctcp::frame(command, args);
        Ok(Self::new("NOTICE", vec![middle(target, "target")?], Some(text(&body)?)))
    }

    /// `/me` action.
    pub fn action(target: &str, body: &str) -> Result<Self, CommandError> {
        Self::ctcp_request(target, "ACTION", Some(body))
    }

    /// `CAP LS [<version>]`
    pub fn cap_ls(version: Option<&str>) -> Result<Self, CommandError> {
        let mut middles = vec!["LS".to_owned()];
        if let Some(v) = version {
            middles.push(middle(v, "version")?);
        }
        Ok(Self::new("CAP", middles, None))
    }

    /// `CAP REQ :<caps>`
    pub fn cap_req(caps: &str) -> Result<Self, CommandError> {
        required(caps, "capabilities")?;
        Ok(Self::new("CAP", vec!["REQ".into()], Some(text(caps)?)))
    }

    /// `CAP LIST`
    pub fn cap_list() -> Self {
        Self::new("CAP", vec!["LIST".into()], None)
    }

    /// `CAP END`
    pub fn cap_end() -> Self {
        Self::new("CAP", vec!["END".into()], None)
    }

    /// `AUTHENTICATE <payload>`
    pub fn authenticate(payload: &str) -> Result<Self, CommandError> {
        Ok(Self::new("AUTHENTICATE", vec![middle(payload, "payload")?], None))
    }

    /// The command word.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Middle parameters.
    pub fn middles(&self) -> &[String] {
        &self.middles
    }

    /// Trailing parameter.
    pub fn trailing(&self) -> Option<&str> {
        self.trailing.as_deref()
    }

    /// Serialize to CRLF-terminated wire lines.
    pub fn to_lines(&self) -> Result<Vec<String>, BuildError> {
        let middles: Vec<&str> = self.middles.iter().map(String::as_str).collect();
        if self.splittable {
            build(&self.verb, &middles, self.trailing.as_deref())
        } else {
            build_single(&self.verb, &middles, self.trailing.as_deref()).map(|l| vec![l])
        }
    }
}

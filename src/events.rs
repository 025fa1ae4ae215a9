//! Typed protocol events.
//!
//! An embedder implements [`EventHandler`] and overrides only the events it
//! cares about; every method has an empty default. Handlers run
//! synchronously inside the session and must not block. To answer an
//! event, queue a command with [`EventContext::send`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::caps::{CapSubCommand, CapabilityRegistry};
use crate::command::OutgoingCommand;
use crate::error::{CommandError, Error};
use crate::message::{Message, Tag};
use crate::response::Numeric;
use crate::sasl::SaslOutcome;
use crate::session::{SessionCore, SessionId};
use crate::state::ConnectionState;

/// Who sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor<'a> {
    /// Nickname, or server name when the prefix is not a user mask. Empty
    /// when the message had no prefix.
    pub name: &'a str,
    /// Username, for user sources.
    pub user: Option<&'a str>,
    /// Hostname, for user sources.
    pub host: Option<&'a str>,
}

impl<'a> Actor<'a> {
    /// Actor for the prefix of `msg`.
    pub fn from_message(msg: &'a Message) -> Self {
        Actor {
            name: msg.source().unwrap_or(""),
            user: msg.user(),
            host: msg.host(),
        }
    }

    /// `true` when the source was a full `nick!user@host`.
    pub fn is_user(&self) -> bool {
        self.user.is_some()
    }
}

/// A CAP message after the registry processed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapChange<'a> {
    /// Subcommand the server sent.
    pub subcommand: CapSubCommand,
    /// Capability list as received.
    pub capabilities: &'a str,
    /// More lines of the same reply follow (`CAP * LS * :...`).
    pub continued: bool,
}

/// Something the server sent that the engine could not use.
#[derive(Debug)]
#[non_exhaustive]
pub enum Anomaly<'a> {
    /// A received line failed to parse and was dropped.
    Unparsable {
        /// The raw line.
        line: &'a str,
        /// Why it failed.
        error: &'a Error,
    },
    /// A message lacked required parameters and was dropped.
    Violation(&'a Error),
    /// The server ACKed, NAKed or DELeted a capability we never heard of.
    UnknownCapability(&'a Error),
    /// A line from the socket could not be framed or decoded.
    Undecodable(&'a Error),
}

/// Session view handed to every handler call.
pub struct EventContext<'a> {
    pub(crate) core: &'a mut SessionCore,
    pub(crate) tags: &'a [Tag],
}

impl<'a> EventContext<'a> {
    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.core.id
    }

    /// Configured server name.
    pub fn server_name(&self) -> &str {
        &self.core.config.name
    }

    /// Our current nickname.
    pub fn nickname(&self) -> &str {
        &self.core.nickname
    }

    /// Connection state.
    pub fn state(&self) -> ConnectionState {
        self.core.state
    }

    /// `true` after RPL_WELCOME.
    pub fn is_registered(&self) -> bool {
        self.core.registered
    }

    /// `true` after a successful SASL login.
    pub fn is_logged_in(&self) -> bool {
        self.core.logged_in
    }

    /// Capability negotiation state.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.core.caps
    }

    /// Network name from ISUPPORT, once known.
    pub fn network(&self) -> Option<&str> {
        self.core.network.as_deref()
    }

    /// `true` if `target` starts with one of the server's channel types.
    pub fn is_channel(&self, target: &str) -> bool {
        self.core.is_channel(target)
    }

    /// Tags of the message being dispatched; empty for synthetic events.
    pub fn tags(&self) -> &[Tag] {
        self.tags
    }

    /// `server-time` of the message being dispatched.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .tags
            .iter()
            .find(|t| t.key() == "time")
            .and_then(Tag::value)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Queue a command for the server.
    pub fn send(&mut self, cmd: OutgoingCommand) -> Result<(), CommandError> {
        self.core.send(&cmd)
    }
}

/// Callbacks for everything the dispatcher recognizes.
///
/// Parameters are borrowed from the message being dispatched; copy what
/// needs to outlive the call.
#[allow(unused_variables)]
pub trait EventHandler {
    /// Socket (and TLS) is up; registration has been queued.
    fn on_connect(&mut self, ctx: &mut EventContext<'_>) {}

    /// A connect attempt failed. `retry_in` is `None` when no retry is
    /// scheduled.
    fn on_connect_failed(&mut self, ctx: &mut EventContext<'_>, reason: &str, retry_in: Option<Duration>) {}

    /// The connection was lost or closed.
    fn on_disconnect(&mut self, ctx: &mut EventContext<'_>, reason: &str, retry_in: Option<Duration>) {}

    /// RPL_WELCOME: registration finished as `nick`.
    fn on_welcome(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, nick: &str, text: Option<&str>) {}

    /// Someone (maybe us) changed nickname.
    fn on_nick(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, new_nick: &str) {}

    /// Someone quit.
    fn on_quit(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, reason: Option<&str>) {}

    /// Someone joined a channel.
    fn on_join(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str) {}

    /// Someone left a channel.
    fn on_part(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, reason: Option<&str>) {}

    /// Channel mode change.
    fn on_mode(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, modes: &[&str]) {}

    /// User mode change (MODE on a nick, or RPL_UMODEIS).
    fn on_umode(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, target: &str, modes: &[&str]) {}

    /// Topic change.
    fn on_topic(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, topic: &str) {}

    /// Someone was kicked.
    fn on_kick(
        &mut self,
        ctx: &mut EventContext<'_>,
        actor: &Actor<'_>,
        channel: &str,
        kicked: &str,
        reason: Option<&str>,
    ) {
    }

    /// PRIVMSG to a channel.
    fn on_channel_message(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, text: &str) {}

    /// PRIVMSG to us.
    fn on_private_message(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, target: &str, text: &str) {}

    /// NOTICE to a channel.
    fn on_channel_notice(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, text: &str) {}

    /// NOTICE to us (or `*` before registration).
    fn on_notice(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, target: &str, text: &str) {}

    /// We were invited to a channel.
    fn on_invite(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, nick: &str, channel: &str) {}

    /// CTCP request (inside PRIVMSG).
    fn on_ctcp_request(
        &mut self,
        ctx: &mut EventContext<'_>,
        actor: &Actor<'_>,
        target: &str,
        command: &str,
        params: Option<&str>,
    ) {
    }

    /// CTCP response (inside NOTICE).
    fn on_ctcp_response(
        &mut self,
        ctx: &mut EventContext<'_>,
        actor: &Actor<'_>,
        target: &str,
        command: &str,
        params: Option<&str>,
    ) {
    }

    /// Any numeric reply, after the engine's own handling.
    fn on_numeric(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, numeric: Numeric, params: &[&str]) {}

    /// A CAP message was processed.
    fn on_cap(&mut self, ctx: &mut EventContext<'_>, change: &CapChange<'_>) {}

    /// SASL login progress.
    fn on_sasl(&mut self, ctx: &mut EventContext<'_>, outcome: &SaslOutcome) {}

    /// Server PING; the PONG has already been queued.
    fn on_ping(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, token: &str) {}

    /// Server PONG. `latency` is known when the token was one of our
    /// keepalive timestamps.
    fn on_pong(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, token: &str, latency: Option<Duration>) {}

    /// ERROR from the server, usually right before it closes the link.
    fn on_error(&mut self, ctx: &mut EventContext<'_>, text: &str) {}

    /// TAGMSG: tags-only message; see [`EventContext::tags`].
    fn on_tagmsg(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, target: &str) {}

    /// Any command the dispatcher has no route for.
    fn on_unknown(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, command: &str, params: &[&str]) {}

    /// Something was dropped because it was unusable.
    fn on_protocol_anomaly(&mut self, ctx: &mut EventContext<'_>, anomaly: &Anomaly<'_>) {}
}

/// Handler that ignores everything.
impl EventHandler for () {}

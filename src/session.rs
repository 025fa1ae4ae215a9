//! One server connection, without any I/O.
//!
//! A [`Session`] owns the connection state, the capability registry, the
//! keepalive bookkeeping and the caller's [`EventHandler`]. Input arrives as
//! method calls (`connect_finished`, `handle_line`, `keepalive_tick`, ...);
//! output is left in two queues for the I/O layer to drain: wire lines
//! ([`Session::poll_outgoing`]) and [`Effect`]s ([`Session::poll_effect`]).
//!
//! ```
//! use std::time::Instant;
//! use slirc_session::{Session, SessionConfig};
//! use slirc_session::state::{ConnectionState, Effect};
//!
//! let mut session = Session::new(SessionConfig::new("irc.example.net", 6667, "guest"), ());
//! let _ = session.connect().unwrap();
//! assert_eq!(session.poll_effect(), Some(Effect::StartConnect));
//!
//! let _ = session.connect_finished().unwrap();
//! assert_eq!(session.state(), ConnectionState::Connected);
//! assert_eq!(session.poll_outgoing().as_deref(), Some("CAP LS 302\r\n"));
//!
//! session.handle_line(":irc.example.net PING :abc", Instant::now());
//! let sent: Vec<String> = session.drain_outgoing().collect();
//! assert_eq!(sent.last().map(String::as_str), Some("PONG :abc\r\n"));
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::caps::CapabilityRegistry;
use crate::command::OutgoingCommand;
use crate::config::SessionConfig;
use crate::dispatch::dispatch;
use crate::error::{CommandError, Error, IllegalTransition};
use crate::events::{Anomaly, EventContext, EventHandler};
use crate::message::{Message, Tag};
use crate::sasl::SaslState;
use crate::state::{transition, Action, Backoff, ConnectionState, Effect, TableEffect};
use crate::util::millis_since;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the session is still alive after an action.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep going.
    Continue,
    /// The session is finished; drop it.
    Freed,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Keepalive {
    pub(crate) last_pong: Instant,
}

/// Session state the handler may look at through [`EventContext`].
#[derive(Debug)]
pub(crate) struct SessionCore {
    pub(crate) id: SessionId,
    pub(crate) config: SessionConfig,
    pub(crate) state: ConnectionState,
    pub(crate) last_action: Option<Action>,
    pub(crate) backoff: Backoff,
    pub(crate) caps: CapabilityRegistry,
    pub(crate) nickname: String,
    pub(crate) nick_attempt: usize,
    pub(crate) registered: bool,
    pub(crate) logged_in: bool,
    pub(crate) negotiated: bool,
    pub(crate) sasl: SaslState,
    pub(crate) chantypes: String,
    pub(crate) network: Option<String>,
    pub(crate) keepalive: Option<Keepalive>,
    pub(crate) latency: Option<Duration>,
    pub(crate) epoch: Instant,
    pub(crate) outbox: VecDeque<String>,
    pub(crate) effects: VecDeque<Effect>,
    pub(crate) freed: bool,
}

const DEFAULT_CHANTYPES: &str = "#&";

impl SessionCore {
    /// Queue a command. Only allowed while connected.
    pub(crate) fn send(&mut self, cmd: &OutgoingCommand) -> Result<(), CommandError> {
        if self.freed {
            return Err(CommandError::SessionFreed);
        }
        if self.state != ConnectionState::Connected {
            return Err(CommandError::NotConnected(self.state));
        }
        for line in cmd.to_lines()? {
            debug!(session = %self.config.name, line = line.trim_end(), "queue");
            self.outbox.push_back(line);
        }
        Ok(())
    }

    /// Queue an engine-generated command; failures are only logged.
    pub(crate) fn queue(&mut self, cmd: Result<OutgoingCommand, CommandError>) {
        if let Err(e) = cmd.and_then(|c| self.send(&c)) {
            warn!(session = %self.config.name, error = %e, "dropping internal command");
        }
    }

    pub(crate) fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.chantypes.contains(c))
    }

    /// Send `CAP END` once per connection.
    pub(crate) fn finish_negotiation(&mut self) {
        if self.negotiated {
            return;
        }
        self.negotiated = true;
        self.queue(Ok(OutgoingCommand::cap_end()));
    }

    pub(crate) fn start_keepalive(&mut self, now: Instant) {
        self.keepalive = Some(Keepalive { last_pong: now });
        self.effects
            .push_back(Effect::StartKeepalive(self.config.timing.ping_interval));
    }

    /// Record a PONG; returns the round trip when `token` is one of our
    /// keepalive timestamps.
    pub(crate) fn record_pong(&mut self, token: &str, now: Instant) -> Option<Duration> {
        if let Some(ka) = self.keepalive.as_mut() {
            ka.last_pong = now;
        }
        let sent: u64 = token.parse().ok()?;
        let rtt = Duration::from_millis(millis_since(self.epoch, now).checked_sub(sent)?);
        self.latency = Some(rtt);
        Some(rtt)
    }

    /// Forget everything tied to the previous socket.
    fn reset_connection(&mut self) {
        self.registered = false;
        self.logged_in = false;
        self.negotiated = false;
        self.sasl = SaslState::Idle;
        self.caps.reset();
        self.chantypes = DEFAULT_CHANTYPES.to_owned();
        self.network = None;
        self.latency = None;
        self.outbox.clear();
        if self.keepalive.take().is_some() {
            self.effects.push_back(Effect::StopKeepalive);
        }
    }
}

/// A single server connection and its event handler.
pub struct Session<H> {
    pub(crate) core: SessionCore,
    pub(crate) handler: H,
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("server", &self.core.config.name)
            .field("state", &self.core.state)
            .field("nickname", &self.core.nickname)
            .finish_non_exhaustive()
    }
}

impl<H: EventHandler> Session<H> {
    /// New session in [`ConnectionState::Disconnected`].
    pub fn new(config: SessionConfig, handler: H) -> Self {
        let backoff = Backoff::new(config.timing.reconnect_base, config.timing.reconnect_step);
        let nickname = config.nickname.clone();
        Session {
            core: SessionCore {
                id: SessionId::next(),
                config,
                state: ConnectionState::Disconnected,
                last_action: None,
                backoff,
                caps: CapabilityRegistry::new(),
                nickname,
                nick_attempt: 0,
                registered: false,
                logged_in: false,
                negotiated: false,
                sasl: SaslState::Idle,
                chantypes: DEFAULT_CHANTYPES.to_owned(),
                network: None,
                keepalive: None,
                latency: None,
                epoch: Instant::now(),
                outbox: VecDeque::new(),
                effects: VecDeque::new(),
                freed: false,
            },
            handler,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.core.id
    }

    /// Configuration the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.core.state
    }

    /// Last action applied.
    pub fn last_action(&self) -> Option<Action> {
        self.core.last_action
    }

    /// Current nickname.
    pub fn nickname(&self) -> &str {
        &self.core.nickname
    }

    /// `true` after RPL_WELCOME on the current connection.
    pub fn is_registered(&self) -> bool {
        self.core.registered
    }

    /// `true` after a successful SASL login on the current connection.
    pub fn is_logged_in(&self) -> bool {
        self.core.logged_in
    }

    /// `true` once `CAP END` was sent on the current connection.
    pub fn is_negotiated(&self) -> bool {
        self.core.negotiated
    }

    /// Capability negotiation state.
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.core.caps
    }

    /// Delay the next reconnect will wait.
    pub fn reconnect_interval(&self) -> Duration {
        self.core.backoff.current()
    }

    /// Last measured keepalive round trip.
    pub fn latency(&self) -> Option<Duration> {
        self.core.latency
    }

    /// `true` while keepalive PINGs are running.
    pub fn keepalive_active(&self) -> bool {
        self.core.keepalive.is_some()
    }

    /// `true` once the session was torn down by a quit.
    pub fn is_freed(&self) -> bool {
        self.core.freed
    }

    /// The event handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The event handler, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the session, returning the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    pub(crate) fn emit<F>(&mut self, tags: &[Tag], f: F)
    where
        F: FnOnce(&mut H, &mut EventContext<'_>),
    {
        let mut ctx = EventContext {
            core: &mut self.core,
            tags,
        };
        f(&mut self.handler, &mut ctx);
    }

    fn apply_inner(&mut self, action: Action) -> Result<(Step, Option<Duration>), IllegalTransition> {
        let core = &mut self.core;
        if core.freed {
            warn!(session = %core.config.name, %action, "action on freed session");
            return Err(IllegalTransition {
                state: core.state,
                action,
            });
        }
        let t = transition(core.state, action).map_err(|e| {
            warn!(session = %core.config.name, state = %core.state, %action, "illegal transition");
            e
        })?;
        info!(
            session = %core.config.name,
            from = %t.from,
            %action,
            to = %t.next,
            "state transition"
        );

        core.state = t.next;
        core.last_action = Some(action);

        let mut armed = None;
        if let Some(effect) = t.effect {
            let effect = match effect {
                TableEffect::StartConnect => Effect::StartConnect,
                TableEffect::CancelConnect => Effect::CancelConnect,
                TableEffect::ForceCancel => Effect::ForceCancel,
                TableEffect::CloseSocket => Effect::CloseSocket,
                TableEffect::ForceClose => Effect::ForceClose,
                TableEffect::CancelBackoff => Effect::CancelBackoff,
                TableEffect::ResetBackoff => {
                    core.backoff.on_success();
                    Effect::ResetBackoff
                }
                TableEffect::ArmBackoff => {
                    let delay = if action == Action::ConnectFail {
                        core.backoff.on_fail()
                    } else {
                        core.backoff.current()
                    };
                    armed = Some(delay);
                    Effect::ArmBackoff(delay)
                }
            };
            core.effects.push_back(effect);
        }

        if t.free {
            core.freed = true;
            core.outbox.clear();
            return Ok((Step::Freed, None));
        }
        Ok((Step::Continue, armed))
    }

    /// Apply a lifecycle action directly.
    ///
    /// Illegal actions leave the state unchanged and return an error.
    pub fn apply(&mut self, action: Action) -> Result<Step, IllegalTransition> {
        self.apply_inner(action).map(|(step, _)| step)
    }

    /// Ask for a connection.
    pub fn connect(&mut self) -> Result<Step, IllegalTransition> {
        self.apply(Action::Connect)
    }

    /// Ask to close the connection without reconnecting.
    pub fn disconnect(&mut self) -> Result<Step, IllegalTransition> {
        self.apply(Action::Disconnect)
    }

    /// Tear the session down, sending `QUIT` first when connected.
    pub fn quit(&mut self, reason: Option<&str>) -> Result<Step, IllegalTransition> {
        if self.core.state == ConnectionState::Connected {
            self.core.queue(OutgoingCommand::quit(reason));
        }
        self.apply(Action::Quit)
    }

    /// The backoff timer expired.
    pub fn reconnect_timer_fired(&mut self) -> Result<Step, IllegalTransition> {
        self.apply(Action::Connect)
    }

    /// The transport finished connecting: queue registration.
    pub fn connect_finished(&mut self) -> Result<Step, IllegalTransition> {
        let step = self.apply(Action::ConnectFinish)?;

        let core = &mut self.core;
        core.reset_connection();
        core.nickname = core.config.nickname.clone();
        core.nick_attempt = 0;
        core.epoch = Instant::now();

        core.queue(OutgoingCommand::cap_ls(Some("302")));
        if let Some(pass) = core.config.password.clone() {
            core.queue(OutgoingCommand::pass(&pass));
        }
        let nick = core.nickname.clone();
        core.queue(OutgoingCommand::nick(&nick));
        let (user, real) = (core.config.username.clone(), core.config.realname.clone());
        core.queue(OutgoingCommand::user(&user, &real));

        self.emit(&[], |h, ctx| h.on_connect(ctx));
        Ok(step)
    }

    /// The connect attempt failed or was cancelled.
    pub fn connect_failed(&mut self, reason: &str) -> Result<Step, IllegalTransition> {
        let (step, retry) = self.apply_inner(Action::ConnectFail)?;
        warn!(session = %self.core.config.name, reason, ?retry, "connect failed");
        if step == Step::Continue {
            self.emit(&[], |h, ctx| h.on_connect_failed(ctx, reason, retry));
        }
        Ok(step)
    }

    /// The socket is gone, for whatever reason.
    pub fn disconnected(&mut self, reason: &str) -> Result<Step, IllegalTransition> {
        let reason = if self.core.last_action == Some(Action::Reconnect) {
            "Ping timed out"
        } else {
            reason
        };
        let (step, retry) = self.apply_inner(Action::DisconnectFinish)?;
        self.core.reset_connection();
        info!(session = %self.core.config.name, reason, ?retry, "disconnected");
        if step == Step::Continue {
            self.emit(&[], |h, ctx| h.on_disconnect(ctx, reason, retry));
        }
        Ok(step)
    }

    /// Keepalive timer tick: PING, or force a reconnect when the server
    /// has been silent for longer than the timeout.
    pub fn keepalive_tick(&mut self, now: Instant) -> Result<Step, IllegalTransition> {
        let core = &mut self.core;
        if core.state != ConnectionState::Connected {
            return Ok(Step::Continue);
        }
        let Some(ka) = core.keepalive else {
            return Ok(Step::Continue);
        };

        let silence = now.saturating_duration_since(ka.last_pong);
        if silence > core.config.timing.ping_timeout {
            warn!(session = %core.config.name, ?silence, "ping timed out");
            return self.apply(Action::Reconnect);
        }
        let token = millis_since(core.epoch, now).to_string();
        core.queue(OutgoingCommand::ping(&token));
        Ok(Step::Continue)
    }

    /// Parse and dispatch one received line (CRLF optional).
    pub fn handle_line(&mut self, line: &str, now: Instant) {
        debug!(session = %self.core.config.name, line, "recv");
        match Message::parse(line) {
            Ok(msg) => dispatch(msg, self, now),
            Err(cause) => {
                warn!(session = %self.core.config.name, error = %cause, line, "dropping unparsable line");
                let error = Error::InvalidMessage {
                    line: line.to_owned(),
                    cause,
                };
                self.emit(&[], |h, ctx| {
                    h.on_protocol_anomaly(ctx, &Anomaly::Unparsable { line, error: &error })
                });
            }
        }
    }

    /// Dispatch an already parsed message.
    pub fn handle_message(&mut self, msg: Message, now: Instant) {
        dispatch(msg, self, now);
    }

    /// Report a line the transport could not frame or decode.
    pub fn report_undecodable(&mut self, error: Error) {
        warn!(session = %self.core.config.name, %error, "dropping undecodable input");
        self.emit(&[], |h, ctx| h.on_protocol_anomaly(ctx, &Anomaly::Undecodable(&error)));
    }

    /// Queue a command for the server.
    pub fn send(&mut self, cmd: OutgoingCommand) -> Result<(), CommandError> {
        self.core.send(&cmd)
    }

    /// Next wire line to write, CRLF included.
    pub fn poll_outgoing(&mut self) -> Option<String> {
        self.core.outbox.pop_front()
    }

    /// All queued wire lines.
    pub fn drain_outgoing(&mut self) -> std::collections::vec_deque::Drain<'_, String> {
        self.core.outbox.drain(..)
    }

    /// Next effect for the I/O layer.
    pub fn poll_effect(&mut self) -> Option<Effect> {
        self.core.effects.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Action;

    fn session() -> Session<()> {
        Session::new(SessionConfig::new("irc.test", 6667, "me"), ())
    }

    fn connected() -> Session<()> {
        let mut s = session();
        let _ = s.connect().unwrap();
        let _ = s.connect_finished().unwrap();
        s.drain_outgoing().for_each(drop);
        while s.poll_effect().is_some() {}
        s
    }

    #[test]
    fn test_registration_lines() {
        let config = SessionConfig::new("irc.test", 6667, "me").with_password("secret");
        let mut s = Session::new(config, ());
        let _ = s.connect().unwrap();
        let _ = s.connect_finished().unwrap();
        let lines: Vec<String> = s.drain_outgoing().collect();
        assert_eq!(
            lines,
            vec![
                "CAP LS 302\r\n",
                "PASS secret\r\n",
                "NICK me\r\n",
                "USER me 0 * :me\r\n",
            ]
        );
    }

    #[test]
    fn test_illegal_action_keeps_state() {
        let mut s = session();
        assert!(s.apply(Action::Disconnect).is_err());
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert_eq!(s.poll_effect(), None);
    }

    #[test]
    fn test_send_requires_connection() {
        let mut s = session();
        let cmd = OutgoingCommand::privmsg("#a", "hi").unwrap();
        assert_eq!(
            s.send(cmd),
            Err(CommandError::NotConnected(ConnectionState::Disconnected))
        );
    }

    #[test]
    fn test_connect_fail_arms_growing_backoff() {
        let mut s = session();
        for n in 1..=3u32 {
            let _ = s.apply(Action::Connect).unwrap();
            assert_eq!(s.poll_effect(), Some(Effect::StartConnect));
            let _ = s.connect_failed("refused").unwrap();
            let expected = Duration::from_secs(5) + Duration::from_secs(5) * n;
            assert_eq!(s.poll_effect(), Some(Effect::ArmBackoff(expected)));
            assert_eq!(s.reconnect_interval(), expected);
        }
        let _ = s.reconnect_timer_fired().unwrap();
        let _ = s.connect_finished().unwrap();
        assert_eq!(s.reconnect_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_quit_when_connected_sends_quit_then_frees() {
        let mut s = connected();
        assert_eq!(s.quit(Some("bye")).unwrap(), Step::Continue);
        assert_eq!(s.poll_outgoing().as_deref(), Some("QUIT :bye\r\n"));
        assert_eq!(s.poll_effect(), Some(Effect::CloseSocket));
        assert_eq!(s.disconnected("closed").unwrap(), Step::Freed);
        assert!(s.is_freed());
        assert!(s.connect().is_err());
    }

    #[test]
    fn test_keepalive_ping_and_timeout() {
        let mut s = connected();
        let t0 = Instant::now();
        s.handle_line(":irc.test 001 me :Welcome", t0);
        assert!(s.keepalive_active());
        assert_eq!(
            s.poll_effect(),
            Some(Effect::StartKeepalive(Duration::from_secs(30)))
        );

        let _ = s.keepalive_tick(t0 + Duration::from_secs(30)).unwrap();
        let ping = s.poll_outgoing().unwrap();
        assert!(ping.starts_with("PING :"), "{}", ping);

        let _ = s.keepalive_tick(t0 + Duration::from_secs(61)).unwrap();
        assert_eq!(s.last_action(), Some(Action::Reconnect));
        assert_eq!(s.state(), ConnectionState::Connected);
        assert_eq!(s.poll_effect(), Some(Effect::ForceClose));
    }
}

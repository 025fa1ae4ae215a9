//! Tokio driver for a [`Session`].
//!
//! [`Client::run`] owns the session and a [`Transport`] and feeds one into
//! the other: socket reads, caller commands, the keepalive interval and the
//! reconnect timer are serialized through a single `select!` loop, so the
//! session never needs a lock. Callers talk to the running client through a
//! cloneable [`ClientHandle`].
//!
//! ```no_run
//! use slirc_session::client::Client;
//! use slirc_session::transport::TcpTransport;
//! use slirc_session::{Session, SessionConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("irc.libera.chat", 6697, "guest").with_tls(true);
//! let (client, handle) = Client::new(Session::new(config, ()), TcpTransport::new())?;
//! let task = tokio::spawn(client.run());
//! handle.connect()?;
//! handle.privmsg("#test", "hello")?;
//! handle.quit(Some("bye"))?;
//! task.await?;
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, warn};

use crate::command::OutgoingCommand;
use crate::error::{CommandError, ConfigError, Error, TransportError};
use crate::events::EventHandler;
use crate::line::LineCodec;
use crate::session::Session;
use crate::state::{ConnectionState, Effect};
use crate::transport::Transport;

const READ_CAPACITY: usize = 4096;

/// Requests a [`ClientHandle`] sends to the running client.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientCommand {
    /// Start connecting.
    Connect,
    /// Close the connection; no reconnect.
    Disconnect,
    /// Send `QUIT` and tear the session down.
    Quit(Option<String>),
    /// Send a command to the server.
    Send(OutgoingCommand),
}

/// Cloneable handle to a running [`Client`].
///
/// Every method fails with [`CommandError::SessionFreed`] once the client
/// has stopped.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    fn submit(&self, cmd: ClientCommand) -> Result<(), CommandError> {
        self.tx.send(cmd).map_err(|_| CommandError::SessionFreed)
    }

    /// Connect to the configured server.
    pub fn connect(&self) -> Result<(), CommandError> {
        self.submit(ClientCommand::Connect)
    }

    /// Disconnect without reconnecting.
    pub fn disconnect(&self) -> Result<(), CommandError> {
        self.submit(ClientCommand::Disconnect)
    }

    /// Quit and stop the client.
    pub fn quit(&self, reason: Option<&str>) -> Result<(), CommandError> {
        self.submit(ClientCommand::Quit(reason.map(str::to_owned)))
    }

    /// Queue a command for the server.
    pub fn send(&self, cmd: OutgoingCommand) -> Result<(), CommandError> {
        self.submit(ClientCommand::Send(cmd))
    }

    /// Send a PRIVMSG; long text is split by the session.
    pub fn privmsg(&self, target: &str, text: &str) -> Result<(), CommandError> {
        self.send(OutgoingCommand::privmsg(target, text)?)
    }

    /// `true` once the client has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

enum Wake {
    Connected(Result<(), TransportError>),
    Read(Result<usize, TransportError>),
    Command(Option<ClientCommand>),
    Keepalive,
    Timer,
}

/// Runs one [`Session`] over one [`Transport`].
pub struct Client<T, H> {
    session: Session<H>,
    transport: T,
    codec: LineCodec,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    read_buf: BytesMut,
    write_buf: BytesMut,
    keepalive: Option<Interval>,
    reconnect_at: Option<Instant>,
    socket_open: bool,
}

impl<T, H> std::fmt::Debug for Client<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("socket_open", &self.socket_open)
            .finish_non_exhaustive()
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn apply_command<H: EventHandler>(session: &mut Session<H>, cmd: Option<ClientCommand>) {
    match cmd {
        Some(ClientCommand::Connect) => {
            let _ = session.connect();
        }
        Some(ClientCommand::Disconnect) => {
            let _ = session.disconnect();
        }
        Some(ClientCommand::Quit(reason)) => {
            let _ = session.quit(reason.as_deref());
        }
        Some(ClientCommand::Send(cmd)) => {
            if let Err(e) = session.send(cmd) {
                warn!(session = %session.config().name, error = %e, "command not sent");
            }
        }
        None => {
            debug!(session = %session.config().name, "all handles dropped, quitting");
            let _ = session.quit(None);
        }
    }
}

impl<T: Transport, H: EventHandler> Client<T, H> {
    /// Wrap `session` and `transport`. Fails when the configured encoding
    /// is unknown.
    pub fn new(session: Session<H>, transport: T) -> Result<(Self, ClientHandle), ConfigError> {
        let codec = LineCodec::new(&session.config().encoding)?;
        let (tx, commands) = mpsc::unbounded_channel();
        let client = Client {
            session,
            transport,
            codec,
            commands,
            read_buf: BytesMut::with_capacity(READ_CAPACITY),
            write_buf: BytesMut::new(),
            keepalive: None,
            reconnect_at: None,
            socket_open: false,
        };
        Ok((client, ClientHandle { tx }))
    }

    /// The wrapped session.
    pub fn session(&self) -> &Session<H> {
        &self.session
    }

    /// Drive the session until it is freed by a quit, then return the
    /// handler.
    pub async fn run(mut self) -> H {
        while !self.session.is_freed() {
            self.run_effects().await;
            if self.session.is_freed() {
                break;
            }
            match self.session.state() {
                ConnectionState::Disconnected => {
                    let cmd = self.commands.recv().await;
                    apply_command(&mut self.session, cmd);
                }
                ConnectionState::Connecting => self.connect_phase().await,
                ConnectionState::Connected => self.io_phase().await,
                ConnectionState::Reconnecting => self.backoff_phase().await,
                ConnectionState::Disconnecting | ConnectionState::Quitting => {
                    self.close_socket(false, "Connection closed").await;
                }
            }
        }
        info!(session = %self.session.config().name, "client stopped");
        self.session.into_handler()
    }

    async fn run_effects(&mut self) {
        while let Some(effect) = self.session.poll_effect() {
            debug!(session = %self.session.config().name, ?effect, "effect");
            match effect {
                Effect::CloseSocket => self.close_socket(true, "Connection closed").await,
                Effect::ForceClose => self.close_socket(false, "Connection reset").await,
                Effect::ArmBackoff(delay) => self.reconnect_at = Some(Instant::now() + delay),
                Effect::CancelBackoff => self.reconnect_at = None,
                Effect::StartKeepalive(period) => {
                    let mut interval = time::interval_at(Instant::now() + period, period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.keepalive = Some(interval);
                }
                Effect::StopKeepalive => self.keepalive = None,
                // Connecting is driven by the state loop, cancelling by
                // dropping the connect future.
                Effect::StartConnect
                | Effect::CancelConnect
                | Effect::ForceCancel
                | Effect::ResetBackoff => {}
            }
        }
    }

    /// Close the socket and report the disconnect to the session.
    async fn close_socket(&mut self, flush: bool, reason: &str) {
        if flush {
            if let Err(e) = self.flush().await {
                debug!(session = %self.session.config().name, error = %e, "flush before close failed");
            }
        }
        self.shutdown_transport().await;
        let _ = self.session.disconnected(reason);
    }

    async fn shutdown_transport(&mut self) {
        self.socket_open = false;
        self.read_buf.clear();
        self.keepalive = None;
        if let Err(e) = self.transport.close().await {
            debug!(session = %self.session.config().name, error = %e, "close failed");
        }
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        while let Some(line) = self.session.poll_outgoing() {
            self.write_buf.clear();
            if let Err(e) = self.codec.encode(line.as_str(), &mut self.write_buf) {
                warn!(session = %self.session.config().name, error = %e, "cannot encode line");
                continue;
            }
            debug!(session = %self.session.config().name, line = line.trim_end(), "send");
            self.transport.write(&self.write_buf).await?;
        }
        Ok(())
    }

    async fn connect_phase(&mut self) {
        let config = self.session.config();
        let (host, port, tls) = (config.host.clone(), config.port, config.tls.clone());
        info!(session = %config.name, %host, port, tls = tls.enabled, "connecting");

        let outcome = {
            let connect = self.transport.connect(&host, port, &tls);
            tokio::pin!(connect);
            loop {
                let wake = tokio::select! {
                    r = &mut connect => Wake::Connected(r),
                    cmd = self.commands.recv() => Wake::Command(cmd),
                };
                match wake {
                    Wake::Connected(r) => break Some(r),
                    Wake::Command(cmd) => {
                        apply_command(&mut self.session, cmd);
                        if self.session.state() != ConnectionState::Connecting {
                            break None;
                        }
                    }
                    _ => {}
                }
            }
        };

        match outcome {
            Some(Ok(())) => {
                self.socket_open = true;
                self.read_buf.clear();
                self.codec.reset();
                let _ = self.session.connect_finished();
            }
            Some(Err(e)) => {
                self.shutdown_transport().await;
                let _ = self.session.connect_failed(&e.to_string());
            }
            None => {
                self.shutdown_transport().await;
                let _ = self.session.connect_failed("Connection cancelled");
            }
        }
    }

    async fn io_phase(&mut self) {
        if let Err(e) = self.flush().await {
            self.connection_lost(&e.to_string()).await;
            return;
        }

        let wake = tokio::select! {
            r = self.transport.read_chunk(&mut self.read_buf) => Wake::Read(r),
            cmd = self.commands.recv() => Wake::Command(cmd),
            _ = tick(&mut self.keepalive) => Wake::Keepalive,
        };

        match wake {
            Wake::Read(Ok(0)) => self.connection_lost("Connection closed by peer").await,
            Wake::Read(Ok(_)) => self.drain_lines(),
            Wake::Read(Err(e)) => self.connection_lost(&e.to_string()).await,
            Wake::Command(cmd) => apply_command(&mut self.session, cmd),
            Wake::Keepalive => {
                let _ = self.session.keepalive_tick(now());
            }
            Wake::Connected(_) | Wake::Timer => {}
        }
    }

    fn drain_lines(&mut self) {
        loop {
            match self.codec.decode(&mut self.read_buf) {
                Ok(Some(line)) => self.session.handle_line(&line, now()),
                Ok(None) => break,
                Err(e) => self.session.report_undecodable(Error::Codec(e)),
            }
            if self.session.state() != ConnectionState::Connected {
                break;
            }
        }
    }

    async fn connection_lost(&mut self, reason: &str) {
        warn!(session = %self.session.config().name, reason, "connection lost");
        self.shutdown_transport().await;
        let _ = self.session.disconnected(reason);
    }

    async fn backoff_phase(&mut self) {
        let wake = tokio::select! {
            _ = sleep_until(self.reconnect_at) => Wake::Timer,
            cmd = self.commands.recv() => Wake::Command(cmd),
        };
        match wake {
            Wake::Timer => {
                self.reconnect_at = None;
                let _ = self.session.reconnect_timer_fired();
            }
            Wake::Command(cmd) => apply_command(&mut self.session, cmd),
            _ => {}
        }
    }
}

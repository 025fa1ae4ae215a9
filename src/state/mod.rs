//! Sans-IO connection state machine.
//!
//! [`transition`] is a pure lookup in the connection lifecycle table. It
//! returns the next state together with the side effect the I/O layer must
//! carry out; it never touches a socket or a timer itself.
//!
//! ```text
//!               Connect                ConnectFinish
//! Disconnected ────────► Connecting ──────────────► Connected
//!      ▲                 │    ▲  ConnectFail           │ DisconnectFinish
//!      │  Disconnect     ▼    │  (arm backoff)         ▼
//!      └──────────── Reconnecting ◄────────────────────┘
//! ```
//!
//! `Disconnecting` and `Quitting` are transient states held while a
//! connect attempt is cancelled or a socket is closed.
//!
//! # Example
//!
//! ```
//! use slirc_session::state::{transition, Action, ConnectionState, TableEffect};
//!
//! let t = transition(ConnectionState::Disconnected, Action::Connect).unwrap();
//! assert_eq!(t.next, ConnectionState::Connecting);
//! assert_eq!(t.effect, Some(TableEffect::StartConnect));
//!
//! assert!(transition(ConnectionState::Disconnected, Action::Disconnect).is_err());
//! ```

mod backoff;

pub use self::backoff::Backoff;

use std::fmt;
use std::time::Duration;

use crate::error::IllegalTransition;

/// Lifecycle state of one server connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No socket and no pending attempt.
    #[default]
    Disconnected,
    /// A connect (TCP and optional TLS) is in flight.
    Connecting,
    /// Socket is up.
    Connected,
    /// A local disconnect is being carried out.
    Disconnecting,
    /// The session is shutting down for good.
    Quitting,
    /// Waiting for the backoff timer before the next attempt.
    Reconnecting,
}

impl ConnectionState {
    /// Every state, for exhaustive table tests.
    pub const ALL: [ConnectionState; 6] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Disconnecting,
        ConnectionState::Quitting,
        ConnectionState::Reconnecting,
    ];
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnecting => "DISCONNECTING",
            ConnectionState::Quitting => "QUITTING",
            ConnectionState::Reconnecting => "RECONNECTING",
        })
    }
}

/// Inputs to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Start connecting (caller request or backoff timer).
    Connect,
    /// The connect attempt failed or was cancelled.
    ConnectFail,
    /// The connect attempt succeeded.
    ConnectFinish,
    /// Caller asked to disconnect.
    Disconnect,
    /// The socket is gone.
    DisconnectFinish,
    /// Caller asked to tear the session down.
    Quit,
    /// Keepalive timed out; drop the socket and try again.
    Reconnect,
}

impl Action {
    /// Every action, for exhaustive table tests.
    pub const ALL: [Action; 7] = [
        Action::Connect,
        Action::ConnectFail,
        Action::ConnectFinish,
        Action::Disconnect,
        Action::DisconnectFinish,
        Action::Quit,
        Action::Reconnect,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Connect => "CONNECT",
            Action::ConnectFail => "CONNECT_FAIL",
            Action::ConnectFinish => "CONNECT_FINISH",
            Action::Disconnect => "DISCONNECT",
            Action::DisconnectFinish => "DISCONNECT_FINISH",
            Action::Quit => "QUIT",
            Action::Reconnect => "RECONNECT",
        })
    }
}

/// Side effects the I/O layer carries out on behalf of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Open the socket (and TLS) to the configured server.
    StartConnect,
    /// Abort the in-flight connect; report [`Action::ConnectFail`].
    CancelConnect,
    /// Cancel again, the previous cancel has not completed yet.
    ForceCancel,
    /// Close the socket; report [`Action::DisconnectFinish`].
    CloseSocket,
    /// Close the socket without a QUIT; report [`Action::DisconnectFinish`].
    ForceClose,
    /// Schedule [`Action::Connect`] after the given delay.
    ArmBackoff(Duration),
    /// Drop a scheduled reconnect.
    CancelBackoff,
    /// The connection is established; the backoff interval was reset.
    ResetBackoff,
    /// Start sending keepalive PINGs at the given period.
    StartKeepalive(Duration),
    /// Stop the keepalive timer.
    StopKeepalive,
}

/// Side effect named by the transition table, before the session fills in
/// runtime values such as the backoff delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableEffect {
    /// See [`Effect::StartConnect`].
    StartConnect,
    /// See [`Effect::CancelConnect`].
    CancelConnect,
    /// See [`Effect::ForceCancel`].
    ForceCancel,
    /// See [`Effect::CloseSocket`].
    CloseSocket,
    /// See [`Effect::ForceClose`].
    ForceClose,
    /// See [`Effect::ArmBackoff`].
    ArmBackoff,
    /// See [`Effect::CancelBackoff`].
    CancelBackoff,
    /// See [`Effect::ResetBackoff`].
    ResetBackoff,
}

/// Result of a legal transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State before the action.
    pub from: ConnectionState,
    /// The action applied.
    pub action: Action,
    /// State after the action.
    pub next: ConnectionState,
    /// What the I/O layer has to do, if anything.
    pub effect: Option<TableEffect>,
    /// The session is finished and should be dropped.
    pub free: bool,
}

/// Look up `(state, action)` in the lifecycle table.
pub fn transition(state: ConnectionState, action: Action) -> Result<Transition, IllegalTransition> {
    use Action as A;
    use ConnectionState as S;
    use TableEffect as E;

    let (next, effect, free) = match (state, action) {
        (S::Disconnected, A::Connect) => (S::Connecting, Some(E::StartConnect), false),
        (S::Disconnected, A::Quit) => (S::Disconnected, None, true),

        (S::Connecting, A::ConnectFail) => (S::Reconnecting, Some(E::ArmBackoff), false),
        (S::Connecting, A::ConnectFinish) => (S::Connected, Some(E::ResetBackoff), false),
        (S::Connecting, A::Disconnect) => (S::Disconnecting, Some(E::CancelConnect), false),
        (S::Connecting, A::Quit) => (S::Quitting, Some(E::CancelConnect), false),

        (S::Connected, A::Disconnect) => (S::Disconnecting, Some(E::CloseSocket), false),
        (S::Connected, A::Quit) => (S::Quitting, Some(E::CloseSocket), false),
        (S::Connected, A::Reconnect) => (S::Connected, Some(E::ForceClose), false),
        (S::Connected, A::DisconnectFinish) => (S::Reconnecting, Some(E::ArmBackoff), false),

        (S::Disconnecting, A::ConnectFail) => (S::Disconnected, None, false),
        (S::Disconnecting, A::Disconnect) => (S::Disconnecting, Some(E::ForceCancel), false),
        (S::Disconnecting, A::Quit) => (S::Quitting, Some(E::ForceCancel), false),
        (S::Disconnecting, A::DisconnectFinish) => (S::Disconnected, None, false),

        (S::Quitting, A::ConnectFail) => (S::Disconnected, None, true),
        (S::Quitting, A::Quit) => (S::Quitting, Some(E::ForceCancel), false),
        (S::Quitting, A::DisconnectFinish) => (S::Disconnected, None, true),

        (S::Reconnecting, A::Connect) => (S::Connecting, Some(E::StartConnect), false),
        (S::Reconnecting, A::Disconnect) => (S::Disconnected, Some(E::CancelBackoff), false),
        (S::Reconnecting, A::Quit) => (S::Disconnected, Some(E::CancelBackoff), true),

        _ => return Err(IllegalTransition { state, action }),
    };

    Ok(Transition {
        from: state,
        action,
        next,
        effect,
        free,
    })
}

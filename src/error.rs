//! Error types for the IRC client engine.
//!
//! Parsing, building, state-machine and transport failures each get their
//! own enum so callers can match on the layer that failed. [`Error`] ties
//! them together for code that only wants to propagate.

use thiserror::Error;

use crate::state::{Action, ConnectionState};

/// Convenience type alias for Results using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A received line could not be parsed.
    #[error("invalid message: {line}")]
    InvalidMessage {
        /// The raw line.
        line: String,
        /// The underlying parse error.
        #[source]
        cause: ParseError,
    },

    /// A message was syntactically valid but semantically unusable.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// An outgoing command was rejected.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The state machine refused an action.
    #[error(transparent)]
    Transition(#[from] IllegalTransition),

    /// The server used a capability this client does not know.
    #[error(transparent)]
    Capability(#[from] CapabilityUnsupported),

    /// Socket or TLS failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Received bytes could not be framed or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Session configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors encountered when parsing a single IRC line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The line was empty (or only whitespace).
    #[error("empty message")]
    Empty,

    /// The line did not match the message grammar.
    #[error("parsing failed at position {position}: {context}")]
    Malformed {
        /// Byte offset where parsing failed.
        position: usize,
        /// What was being parsed.
        context: &'static str,
    },

    /// More middle parameters than RFC 1459 allows.
    #[error("too many parameters: {got} (max {max})")]
    TooManyParams {
        /// Allowed number of middle parameters.
        max: usize,
        /// Number found in the line.
        got: usize,
    },

    /// Message body exceeded 512 bytes including CRLF.
    #[error("message too long: {len} bytes (max {max})")]
    LineTooLong {
        /// Body length in bytes.
        len: usize,
        /// Maximum allowed body length.
        max: usize,
    },

    /// Illegal control character in message.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),
}

/// A well-formed message that lacks what its command requires.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{command}: expected at least {expected} parameters, got {got}")]
pub struct ProtocolViolation {
    /// The offending command or numeric.
    pub command: String,
    /// Minimum number of parameters the command needs.
    pub expected: usize,
    /// Number of parameters present.
    pub got: usize,
}

/// The server used a capability the client has no definition for.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported capability: {name}")]
pub struct CapabilityUnsupported {
    /// Capability name as sent by the server.
    pub name: String,
}

/// An action that is not defined for the current connection state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal transition: {action:?} in state {state:?}")]
pub struct IllegalTransition {
    /// State the session was in.
    pub state: ConnectionState,
    /// Action that was refused.
    pub action: Action,
}

/// Failures while serializing an outgoing command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// A middle parameter would push the line past the budget.
    #[error("parameter {param:?} does not fit in a {budget}-byte line")]
    MiddleDoesNotFit {
        /// The rejected parameter.
        param: String,
        /// Line budget including CRLF.
        budget: usize,
    },

    /// A middle parameter is empty, has a space, or starts with `:`.
    #[error("invalid middle parameter: {0:?}")]
    InvalidMiddle(String),

    /// The command name is empty or not alphanumeric.
    #[error("invalid command name: {0:?}")]
    InvalidCommand(String),

    /// Not even one character of the trailing parameter fits.
    #[error("no room left for the trailing parameter")]
    NoRoomForTrailing,

    /// The trailing parameter must go out as a single line but is too long.
    #[error("trailing parameter of {len} bytes exceeds the {room}-byte room")]
    TrailingTooLong {
        /// Trailing length in bytes.
        len: usize,
        /// Bytes available for it.
        room: usize,
    },

    /// CR, LF or NUL inside a parameter.
    #[error("illegal control character: {0:?}")]
    IllegalChar(char),
}

/// Errors returned when constructing or sending an outgoing command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    /// A required argument was empty.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// The command cannot be serialized.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Commands can only be sent while connected.
    #[error("not connected (state {0:?})")]
    NotConnected(ConnectionState),

    /// The session was torn down.
    #[error("session has been freed")]
    SessionFreed,
}

/// Socket, DNS and TLS failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// I/O error during connect, read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The host name is not a valid TLS server name.
    #[error("invalid server name for TLS: {0}")]
    InvalidServerName(String),

    /// TLS setup failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Read or write on a transport that is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

/// Errors produced by the line codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// I/O error while framing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line grew past the framing limit; the buffer was discarded.
    #[error("line too long: {len} bytes (max {max})")]
    LineTooLong {
        /// Buffered bytes when the limit was hit.
        len: usize,
        /// Framing limit.
        max: usize,
    },

    /// A line was not valid in the configured encoding.
    #[error("line is not valid {encoding}")]
    Decode {
        /// Encoding label used.
        encoding: &'static str,
    },
}

/// Invalid session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Port 0 is not connectable.
    #[error("port must be non-zero")]
    InvalidPort,

    /// A timing value must be non-zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The ping timeout is shorter than the ping interval.
    #[error("ping timeout must not be shorter than the ping interval")]
    TimeoutBelowInterval,

    /// Unknown character encoding label.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

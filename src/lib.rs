//! # slirc-session
//!
//! An IRC client protocol engine: turns the byte stream of one server
//! connection into typed events, drives the connection through its
//! lifecycle and serializes outgoing commands.
//!
//! ## Features
//!
//! - RFC 1459 line parsing with IRCv3 message tags
//! - Outgoing command construction with 512-byte aware line splitting
//! - CAP 302 negotiation and SASL PLAIN login
//! - Typed event dispatch through the [`EventHandler`] trait
//! - Sans-IO connection state machine with linear reconnect backoff and
//!   PING keepalive
//! - Optional Tokio driver with TCP/TLS transport (feature `tokio`)

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing IRC lines
//!
//! ```rust
//! use slirc_session::Message;
//!
//! let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.nick(), Some("nick"));
//! assert_eq!(msg.arg(1), Some("Hello!"));
//! ```
//!
//! ### Building commands
//!
//! ```rust
//! use slirc_session::OutgoingCommand;
//!
//! let lines = OutgoingCommand::privmsg("#rust", "Hello, world!")
//!     .unwrap()
//!     .to_lines()
//!     .unwrap();
//! assert_eq!(lines, vec!["PRIVMSG #rust :Hello, world!\r\n"]);
//! ```
//!
//! ### Reacting to events
//!
//! ```rust
//! use std::time::Instant;
//! use slirc_session::{Actor, EventContext, EventHandler, OutgoingCommand, Session, SessionConfig};
//!
//! struct Echo;
//!
//! impl EventHandler for Echo {
//!     fn on_channel_message(&mut self, ctx: &mut EventContext<'_>, _: &Actor<'_>, channel: &str, text: &str) {
//!         if let Ok(cmd) = OutgoingCommand::privmsg(channel, text) {
//!             let _ = ctx.send(cmd);
//!         }
//!     }
//! }
//!
//! let mut session = Session::new(SessionConfig::new("irc.example.net", 6667, "echo"), Echo);
//! let _ = session.connect().unwrap();
//! let _ = session.connect_finished().unwrap();
//! session.drain_outgoing().for_each(drop);
//!
//! session.handle_line(":a!b@c PRIVMSG #chan :hi", Instant::now());
//! assert_eq!(session.poll_outgoing().as_deref(), Some("PRIVMSG #chan :hi\r\n"));
//! ```

pub mod builder;
pub mod caps;
pub mod casemap;
pub mod command;
pub mod config;
pub mod ctcp;
mod dispatch;
pub mod error;
pub mod events;
pub mod isupport;
pub mod message;
pub mod prefix;
pub mod response;
pub mod sasl;
pub mod session;
pub mod state;
pub mod util;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod client;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod line;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod transport;

pub use self::caps::{CapSubCommand, Capability, CapabilityRegistry};
pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::command::OutgoingCommand;
pub use self::config::{LoginMethod, SessionConfig, Timing, TlsOptions};
pub use self::ctcp::Ctcp;
pub use self::error::{Error, Result};
pub use self::events::{Actor, Anomaly, CapChange, EventContext, EventHandler};
pub use self::isupport::{Isupport, IsupportEntry};
pub use self::message::{parse_line, Message, Tag};
pub use self::prefix::Prefix;
pub use self::response::{Numeric, Response};
pub use self::sasl::{SaslMechanism, SaslOutcome};
pub use self::session::{Session, SessionId, Step};
pub use self::state::{Action, Backoff, ConnectionState, Effect};

#[cfg(feature = "tokio")]
pub use self::client::{Client, ClientCommand, ClientHandle};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
#[cfg(feature = "tokio")]
pub use self::transport::{TcpTransport, Transport};

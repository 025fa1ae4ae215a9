//! IRCv3 capability negotiation state.
//!
//! The registry knows a fixed set of capabilities and tracks, for each one,
//! what the server offered, what was requested, and what ended up enabled.
//! It never sends anything itself; the dispatcher asks it what to request
//! and when negotiation can end.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::collections::HashMap;
use std::fmt;

use crate::error::CapabilityUnsupported;
use crate::sasl::{parse_mechanisms, SaslMechanism};

/// Capabilities this client can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// SASL authentication
    Sasl,
    /// Notify of capability changes (CAP NEW / CAP DEL)
    CapNotify,
    /// Server-time message tags
    ServerTime,
}

impl Capability {
    /// Every capability the client knows, in request order.
    pub const ALL: [Capability; 3] = [Capability::Sasl, Capability::CapNotify, Capability::ServerTime];

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sasl => "sasl",
            Self::CapNotify => "cap-notify",
            Self::ServerTime => "server-time",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.name().eq_ignore_ascii_case(name))
    }

    /// Whether the client wants this capability given the server's value.
    ///
    /// `sasl` is only useful when the server takes PLAIN; a bare `sasl`
    /// (CAP 301 or no value) is taken on trust.
    pub fn accepts(self, value: Option<&str>) -> bool {
        match self {
            Self::Sasl => match value {
                None | Some("") => true,
                Some(list) => parse_mechanisms(list).contains(&SaslMechanism::Plain),
            },
            Self::CapNotify | Self::ServerTime => true,
        }
    }
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CAP subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapSubCommand {
    /// List capabilities the server supports.
    Ls,
    /// List capabilities enabled for this connection.
    List,
    /// Request capabilities.
    Req,
    /// Server accepted a request.
    Ack,
    /// Server rejected a request.
    Nak,
    /// End negotiation.
    End,
    /// New capabilities became available.
    New,
    /// Capabilities were withdrawn.
    Del,
}

impl CapSubCommand {
    /// Parse a subcommand, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "LS" => Self::Ls,
            "LIST" => Self::List,
            "REQ" => Self::Req,
            "ACK" => Self::Ack,
            "NAK" => Self::Nak,
            "END" => Self::End,
            "NEW" => Self::New,
            "DEL" => Self::Del,
            _ => return None,
        })
    }

    /// Wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ls => "LS",
            Self::List => "LIST",
            Self::Req => "REQ",
            Self::Ack => "ACK",
            Self::Nak => "NAK",
            Self::End => "END",
            Self::New => "NEW",
            Self::Del => "DEL",
        }
    }
}

/// Split a CAP list into `(name, value)` pairs.
///
/// ```
/// use slirc_session::caps::parse_cap_list;
///
/// let caps: Vec<_> = parse_cap_list("sasl=PLAIN,EXTERNAL  multi-prefix").collect();
/// assert_eq!(caps, vec![("sasl", Some("PLAIN,EXTERNAL")), ("multi-prefix", None)]);
/// ```
pub fn parse_cap_list(list: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    list.split_ascii_whitespace().map(|item| match item.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (item, None),
    })
}

/// Per-capability negotiation flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityState {
    /// Value the server advertised (`sasl=PLAIN,EXTERNAL`).
    pub value: Option<String>,
    /// The server currently offers it.
    pub offered: bool,
    /// The client asked for it.
    pub requested: bool,
    /// The server acknowledged it.
    pub enabled: bool,
}

/// Negotiation state for all known capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    states: HashMap<Capability, CapabilityState>,
    pending: Vec<Capability>,
}

impl CapabilityRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(name: &str) -> Result<Capability, CapabilityUnsupported> {
        Capability::from_name(name).ok_or_else(|| CapabilityUnsupported {
            name: name.to_owned(),
        })
    }

    /// Record that the server offers `name`.
    ///
    /// Returns `Ok(true)` when the capability was queued for the next
    /// request batch.
    pub fn offer(&mut self, name: &str, value: Option<&str>) -> Result<bool, CapabilityUnsupported> {
        let cap = Self::lookup(name)?;
        let state = self.states.entry(cap).or_default();
        state.offered = true;
        state.value = value.map(str::to_owned);

        if !cap.accepts(value) || state.enabled || state.requested || self.pending.contains(&cap) {
            return Ok(false);
        }
        self.pending.push(cap);
        Ok(true)
    }

    /// Drain the queued capabilities as a `CAP REQ` argument, marking them
    /// requested.
    pub fn take_request(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.pending.iter().map(|c| c.name()).collect();
        let request = names.join(" ");
        for cap in self.pending.drain(..) {
            self.states.entry(cap).or_default().requested = true;
        }
        Some(request)
    }

    /// Apply one entry of a `CAP ACK` list.
    ///
    /// A `-` prefix disables the capability. `~` and `=` modifiers from
    /// older drafts are stripped and otherwise ignored. Returns the
    /// capability and whether it is now enabled.
    pub fn acknowledge(&mut self, raw: &str) -> Result<(Capability, bool), CapabilityUnsupported> {
        let mut name = raw;
        let mut disable = false;
        while let Some(c) = name.chars().next() {
            match c {
                '-' => disable = true,
                '~' | '=' => {}
                _ => break,
            }
            name = &name[1..];
        }

        let cap = Self::lookup(name)?;
        let state = self.states.entry(cap).or_default();
        state.enabled = !disable;
        if disable {
            state.requested = false;
        }
        Ok((cap, state.enabled))
    }

    /// Apply one entry of a `CAP NAK` list.
    pub fn deny(&mut self, name: &str) -> Result<Capability, CapabilityUnsupported> {
        let cap = Self::lookup(name)?;
        let state = self.states.entry(cap).or_default();
        state.requested = false;
        state.enabled = false;
        Ok(cap)
    }

    /// Apply one entry of a `CAP DEL` list.
    pub fn revoke(&mut self, name: &str) -> Result<Capability, CapabilityUnsupported> {
        let cap = Self::lookup(name)?;
        self.pending.retain(|c| *c != cap);
        self.states.insert(cap, CapabilityState::default());
        Ok(cap)
    }

    /// `true` once every requested capability has been acknowledged.
    pub fn all_requested_enabled(&self) -> bool {
        self.states
            .values()
            .filter(|s| s.requested)
            .all(|s| s.enabled)
    }

    /// Whether `cap` is enabled for this connection.
    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.states.get(&cap).is_some_and(|s| s.enabled)
    }

    /// Whether the server offered `cap`.
    pub fn is_offered(&self, cap: Capability) -> bool {
        self.states.get(&cap).is_some_and(|s| s.offered)
    }

    /// Value the server advertised for `cap`.
    pub fn value(&self, cap: Capability) -> Option<&str> {
        self.states.get(&cap).and_then(|s| s.value.as_deref())
    }

    /// Flags for `cap`, if the server ever mentioned it.
    pub fn state(&self, cap: Capability) -> Option<&CapabilityState> {
        self.states.get(&cap)
    }

    /// Enabled capabilities in request order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.is_enabled(*c))
    }

    /// Forget everything; called for every new connection.
    pub fn reset(&mut self) {
        self.states.clear();
        self.pending.clear();
    }
}

impl fmt::Display for CapabilityRegistry {
    /// Space-separated enabled capabilities.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cap) in self.enabled().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(cap.name())?;
        }
        Ok(())
    }
}

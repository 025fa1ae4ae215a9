//! CAP negotiation and the SASL PLAIN exchange.

use tracing::{debug, info, warn};

use super::{arg, Handled};
use crate::caps::{parse_cap_list, CapSubCommand, Capability};
use crate::command::OutgoingCommand;
use crate::error::{CapabilityUnsupported, Error};
use crate::events::{Actor, Anomaly, CapChange, EventHandler};
use crate::message::Message;
use crate::sasl::{authenticate_payloads, encode_plain, SaslOutcome, SaslState};
use crate::session::Session;

fn report_unknown<H: EventHandler>(s: &mut Session<H>, err: CapabilityUnsupported) {
    warn!(session = %s.core.config.name, capability = %err.name, "unknown capability");
    let error = Error::Capability(err);
    s.emit(&[], |h, ctx| {
        h.on_protocol_anomaly(ctx, &Anomaly::UnknownCapability(&error))
    });
}

fn offer_all<H: EventHandler>(s: &mut Session<H>, list: &str) {
    for (name, value) in parse_cap_list(list) {
        match s.core.caps.offer(name, value) {
            Ok(true) => debug!(session = %s.core.config.name, capability = name, "will request"),
            Ok(false) => debug!(session = %s.core.config.name, capability = name, "not requesting"),
            Err(_) => debug!(session = %s.core.config.name, capability = name, "ignoring unsupported capability"),
        }
    }
}

fn request_pending<H: EventHandler>(s: &mut Session<H>) -> bool {
    match s.core.caps.take_request() {
        Some(request) => {
            s.core.queue(OutgoingCommand::cap_req(&request));
            true
        }
        None => false,
    }
}

/// Send `AUTHENTICATE PLAIN` if SASL login is configured and not done yet.
fn start_sasl<H: EventHandler>(s: &mut Session<H>) {
    let core = &mut s.core;
    if !core.config.login.is_sasl() || core.logged_in || core.sasl != SaslState::Idle {
        return;
    }
    core.sasl = SaslState::MechanismSent;
    core.queue(OutgoingCommand::authenticate("PLAIN"));
}

/// Finish negotiation unless a SASL exchange still has to complete.
pub(super) fn end_negotiation<H: EventHandler>(s: &mut Session<H>) {
    if s.core.negotiated {
        return;
    }
    if s.core.config.login.is_sasl() {
        if s.core.caps.is_enabled(Capability::Sasl) {
            if !s.core.logged_in && s.core.sasl != SaslState::Finished {
                debug!(session = %s.core.config.name, "CAP END deferred until SASL completes");
                return;
            }
        } else {
            warn!(session = %s.core.config.name, "SASL not supported, login skipped");
            s.emit(&[], |h, ctx| h.on_sasl(ctx, &SaslOutcome::Unavailable));
        }
    }
    s.core.finish_negotiation();
}

pub(super) fn handle<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let Some(sub) = CapSubCommand::parse(arg(msg, 1)) else {
        let actor = Actor::from_message(msg);
        let params = msg.args_from(0);
        s.emit(&msg.tags, |h, ctx| h.on_unknown(ctx, &actor, &msg.command, &params));
        return Ok(());
    };

    let multiline = matches!(sub, CapSubCommand::Ls | CapSubCommand::List);
    let continued = multiline && msg.arg_count() >= 4 && msg.arg(2) == Some("*");
    let list = if continued { arg(msg, 3) } else { arg(msg, 2) };

    let mut end = false;
    match sub {
        CapSubCommand::Ls => {
            offer_all(s, list);
            if !continued && !request_pending(s) {
                end = true;
            }
        }
        CapSubCommand::New => {
            offer_all(s, list);
            request_pending(s);
        }
        CapSubCommand::Ack => {
            for name in list.split_ascii_whitespace() {
                match s.core.caps.acknowledge(name) {
                    Ok((cap, enabled)) => {
                        info!(session = %s.core.config.name, capability = %cap, enabled, "capability acknowledged");
                        if cap == Capability::Sasl && enabled {
                            start_sasl(s);
                        }
                    }
                    Err(e) => report_unknown(s, e),
                }
            }
            end = s.core.caps.all_requested_enabled();
        }
        CapSubCommand::Nak => {
            for name in list.split_ascii_whitespace() {
                match s.core.caps.deny(name) {
                    Ok(cap) => info!(session = %s.core.config.name, capability = %cap, "capability refused"),
                    Err(e) => report_unknown(s, e),
                }
            }
            end = true;
        }
        CapSubCommand::Del => {
            for name in list.split_ascii_whitespace() {
                match s.core.caps.revoke(name) {
                    Ok(cap) => info!(session = %s.core.config.name, capability = %cap, "capability withdrawn"),
                    Err(e) => report_unknown(s, e),
                }
            }
        }
        CapSubCommand::List | CapSubCommand::Req | CapSubCommand::End => {}
    }

    let change = CapChange {
        subcommand: sub,
        capabilities: list,
        continued,
    };
    s.emit(&msg.tags, |h, ctx| h.on_cap(ctx, &change));

    if end {
        end_negotiation(s);
    }
    Ok(())
}

pub(super) fn authenticate<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    if arg(msg, 0) != "+" || s.core.sasl != SaslState::MechanismSent {
        debug!(session = %s.core.config.name, "ignoring unexpected AUTHENTICATE");
        return Ok(());
    }
    let Some((account, password)) = s.core.config.sasl_account() else {
        return Ok(());
    };

    let encoded = encode_plain(account, password);
    for payload in authenticate_payloads(&encoded) {
        s.core.queue(OutgoingCommand::authenticate(payload));
    }
    s.core.sasl = SaslState::CredentialsSent;
    Ok(())
}

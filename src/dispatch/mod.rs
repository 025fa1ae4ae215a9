//! Routes parsed messages to typed handler callbacks.
//!
//! The dispatcher owns no state: everything it updates (registration,
//! nickname, capability registry, keepalive) lives in the [`Session`].
//! Each route returns `Err(ProtocolViolation)` when the message lacks the
//! parameters it needs; the message is then dropped and reported through
//! [`EventHandler::on_protocol_anomaly`].

mod cap;
mod numeric;

use std::time::Instant;

use tracing::warn;

use crate::casemap::irc_eq;
use crate::command::OutgoingCommand;
use crate::ctcp::Ctcp;
use crate::error::{Error, ProtocolViolation};
use crate::events::{Actor, Anomaly, EventHandler};
use crate::message::Message;
use crate::session::Session;

type Handled = Result<(), ProtocolViolation>;

/// Parameter `i`, or `""` when absent. Only used after `require_args`.
fn arg(msg: &Message, i: usize) -> &str {
    msg.arg(i).unwrap_or("")
}

/// Route one message.
pub fn dispatch<H: EventHandler>(msg: Message, session: &mut Session<H>, now: Instant) {
    let result = match msg.numeric() {
        Some(code) => numeric::handle(session, &msg, code, now),
        None => match msg.command.as_str() {
            "PRIVMSG" => privmsg(session, &msg),
            "NOTICE" => notice(session, &msg),
            "JOIN" => join(session, &msg),
            "PART" => part(session, &msg),
            "QUIT" => quit(session, &msg),
            "NICK" => nick(session, &msg),
            "MODE" => mode(session, &msg),
            "TOPIC" => topic(session, &msg),
            "KICK" => kick(session, &msg),
            "INVITE" => invite(session, &msg),
            "CAP" => cap::handle(session, &msg),
            "AUTHENTICATE" => cap::authenticate(session, &msg),
            "PING" => ping(session, &msg),
            "PONG" => pong(session, &msg, now),
            "ERROR" => error(session, &msg),
            "TAGMSG" => tagmsg(session, &msg),
            _ => unknown(session, &msg),
        },
    };

    if let Err(violation) = result {
        report_violation(session, violation);
    }
}

fn report_violation<H: EventHandler>(s: &mut Session<H>, violation: ProtocolViolation) {
    warn!(session = %s.core.config.name, %violation, "dropping message");
    let error = Error::Protocol(violation);
    s.emit(&[], |h, ctx| h.on_protocol_anomaly(ctx, &Anomaly::Violation(&error)));
}

fn privmsg<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let actor = Actor::from_message(msg);
    let target = arg(msg, 0);
    let text = msg.last_arg().unwrap_or("");

    if let Some(ctcp) = Ctcp::parse(text) {
        s.emit(&msg.tags, |h, ctx| {
            h.on_ctcp_request(ctx, &actor, target, ctcp.command, ctcp.params)
        });
    } else if s.core.is_channel(target) {
        s.emit(&msg.tags, |h, ctx| h.on_channel_message(ctx, &actor, target, text));
    } else {
        s.emit(&msg.tags, |h, ctx| h.on_private_message(ctx, &actor, target, text));
    }
    Ok(())
}

fn notice<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let actor = Actor::from_message(msg);
    let target = arg(msg, 0);
    let text = msg.last_arg().unwrap_or("");

    if let Some(ctcp) = Ctcp::parse(text) {
        s.emit(&msg.tags, |h, ctx| {
            h.on_ctcp_response(ctx, &actor, target, ctcp.command, ctcp.params)
        });
    } else if s.core.is_channel(target) {
        s.emit(&msg.tags, |h, ctx| h.on_channel_notice(ctx, &actor, target, text));
    } else {
        s.emit(&msg.tags, |h, ctx| h.on_notice(ctx, &actor, target, text));
    }
    Ok(())
}

fn join<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_join(ctx, &actor, arg(msg, 0)));
    Ok(())
}

fn part<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_part(ctx, &actor, arg(msg, 0), msg.arg(1)));
    Ok(())
}

fn quit<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_quit(ctx, &actor, msg.arg(0)));
    Ok(())
}

fn nick<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    let new_nick = arg(msg, 0);
    if irc_eq(actor.name, &s.core.nickname) {
        s.core.nickname = new_nick.to_owned();
    }
    s.emit(&msg.tags, |h, ctx| h.on_nick(ctx, &actor, new_nick));
    Ok(())
}

fn mode<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    let target = arg(msg, 0);
    let modes = msg.args_from(1);
    if s.core.is_channel(target) {
        s.emit(&msg.tags, |h, ctx| h.on_mode(ctx, &actor, target, &modes));
    } else {
        s.emit(&msg.tags, |h, ctx| h.on_umode(ctx, &actor, target, &modes));
    }
    Ok(())
}

fn topic<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_topic(ctx, &actor, arg(msg, 0), arg(msg, 1)));
    Ok(())
}

fn kick<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| {
        h.on_kick(ctx, &actor, arg(msg, 0), arg(msg, 1), msg.arg(2))
    });
    Ok(())
}

fn invite<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(2)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_invite(ctx, &actor, arg(msg, 0), arg(msg, 1)));
    Ok(())
}

fn ping<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    let token = msg.last_arg().unwrap_or("");
    s.core.queue(OutgoingCommand::pong(token));
    s.emit(&msg.tags, |h, ctx| h.on_ping(ctx, &actor, token));
    Ok(())
}

fn pong<H: EventHandler>(s: &mut Session<H>, msg: &Message, now: Instant) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    let token = msg.last_arg().unwrap_or("");
    let latency = s.core.record_pong(token, now);
    s.emit(&msg.tags, |h, ctx| h.on_pong(ctx, &actor, token, latency));
    Ok(())
}

fn error<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    let text = msg.last_arg().unwrap_or("");
    warn!(session = %s.core.config.name, text, "server error");
    s.emit(&msg.tags, |h, ctx| h.on_error(ctx, text));
    Ok(())
}

fn tagmsg<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    msg.require_args(1)?;
    let actor = Actor::from_message(msg);
    s.emit(&msg.tags, |h, ctx| h.on_tagmsg(ctx, &actor, arg(msg, 0)));
    Ok(())
}

fn unknown<H: EventHandler>(s: &mut Session<H>, msg: &Message) -> Handled {
    let actor = Actor::from_message(msg);
    let params = msg.args_from(0);
    s.emit(&msg.tags, |h, ctx| h.on_unknown(ctx, &actor, &msg.command, &params));
    Ok(())
}

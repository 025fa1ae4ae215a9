//! Numeric replies the engine reacts to before the handler sees them.

use std::time::Instant;

use tracing::{info, warn};

use super::cap::end_negotiation;
use super::{arg, Handled};
use crate::command::OutgoingCommand;
use crate::events::{Actor, EventHandler};
use crate::isupport::Isupport;
use crate::message::Message;
use crate::response::{Numeric, Response};
use crate::sasl::{SaslOutcome, SaslState};
use crate::session::Session;

pub(super) fn handle<H: EventHandler>(
    s: &mut Session<H>,
    msg: &Message,
    code: u16,
    now: Instant,
) -> Handled {
    let numeric = Numeric::from_code(code);
    let actor = Actor::from_message(msg);

    if let Numeric::Recognized(response) = numeric {
        match response {
            Response::RPL_WELCOME => {
                msg.require_args(1)?;
                let nick = arg(msg, 0);
                let core = &mut s.core;
                core.registered = true;
                core.negotiated = true;
                core.nickname = nick.to_owned();
                core.start_keepalive(now);
                info!(session = %core.config.name, nick, "registered");
                let text = msg.arg(1);
                s.emit(&msg.tags, |h, ctx| h.on_welcome(ctx, &actor, nick, text));
            }
            Response::RPL_ISUPPORT => {
                let args = msg.args_from(0);
                if let Some(isupport) = Isupport::from_response_args(&args) {
                    if let Some(chantypes) = isupport.chantypes() {
                        s.core.chantypes = chantypes.to_owned();
                    }
                    if let Some(network) = isupport.network() {
                        s.core.network = Some(network.to_owned());
                    }
                }
            }
            Response::RPL_UMODEIS => {
                msg.require_args(2)?;
                let modes = msg.args_from(1);
                s.emit(&msg.tags, |h, ctx| h.on_umode(ctx, &actor, arg(msg, 0), &modes));
                return Ok(());
            }
            Response::ERR_NICKNAMEINUSE if !s.core.registered => {
                msg.require_args(2)?;
                let core = &mut s.core;
                let next = match core.config.alternate_nicknames.get(core.nick_attempt) {
                    Some(alt) => alt.clone(),
                    None => format!("{}_", core.nickname),
                };
                core.nick_attempt += 1;
                warn!(session = %core.config.name, taken = arg(msg, 1), next = %next, "nickname in use");
                core.nickname = next.clone();
                core.queue(OutgoingCommand::nick(&next));
            }
            Response::RPL_LOGGEDIN => {
                s.core.logged_in = true;
                s.core.sasl = SaslState::Finished;
                let outcome = SaslOutcome::LoggedIn {
                    account: msg.arg(2).unwrap_or("").to_owned(),
                };
                s.emit(&msg.tags, |h, ctx| h.on_sasl(ctx, &outcome));
                end_negotiation(s);
            }
            Response::RPL_LOGGEDOUT => {
                s.core.logged_in = false;
                s.emit(&msg.tags, |h, ctx| h.on_sasl(ctx, &SaslOutcome::LoggedOut));
            }
            Response::RPL_SASLSUCCESS => {
                s.core.sasl = SaslState::Finished;
                s.emit(&msg.tags, |h, ctx| h.on_sasl(ctx, &SaslOutcome::Succeeded));
                end_negotiation(s);
            }
            Response::ERR_NICKLOCKED
            | Response::ERR_SASLFAIL
            | Response::ERR_SASLTOOLONG
            | Response::ERR_SASLABORTED
            | Response::RPL_SASLMECHS => {
                s.core.sasl = SaslState::Finished;
                let outcome = SaslOutcome::Failed {
                    code,
                    reason: msg.last_arg().unwrap_or("").to_owned(),
                };
                warn!(session = %s.core.config.name, code, "SASL login failed");
                s.emit(&msg.tags, |h, ctx| h.on_sasl(ctx, &outcome));
                end_negotiation(s);
            }
            Response::ERR_SASLALREADY => {
                let outcome = SaslOutcome::Failed {
                    code,
                    reason: msg.last_arg().unwrap_or("").to_owned(),
                };
                s.emit(&msg.tags, |h, ctx| h.on_sasl(ctx, &outcome));
            }
            _ => {}
        }
    }

    let params = msg.args_from(0);
    s.emit(&msg.tags, |h, ctx| h.on_numeric(ctx, &actor, numeric, &params));
    Ok(())
}

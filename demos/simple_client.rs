//! Simple IRC client example
//!
//! Connects, joins a channel, answers greetings and quits on Ctrl+C.
//!
//! ```text
//! RUST_LOG=slirc_session=debug cargo run --example simple_client -- irc.libera.chat 6697 '#example'
//! ```

use std::time::Duration;

use anyhow::Context;
use slirc_session::{
    Actor, Client, EventContext, EventHandler, OutgoingCommand, SaslOutcome, Session, SessionConfig, TcpTransport,
};
use tracing_subscriber::EnvFilter;

struct Greeter {
    channel: String,
}

impl EventHandler for Greeter {
    fn on_welcome(&mut self, ctx: &mut EventContext<'_>, _: &Actor<'_>, nick: &str, _: Option<&str>) {
        println!("✓ registered as {} on {}", nick, ctx.server_name());
        match OutgoingCommand::join(&self.channel, None) {
            Ok(cmd) => {
                let _ = ctx.send(cmd);
            }
            Err(e) => eprintln!("cannot join {}: {}", self.channel, e),
        }
    }

    fn on_channel_message(&mut self, ctx: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, text: &str) {
        println!("← <{}:{}> {}", actor.name, channel, text);
        if text.contains("hello") {
            let reply = format!("Hello there, {}!", actor.name);
            if let Ok(cmd) = OutgoingCommand::privmsg(channel, &reply) {
                let _ = ctx.send(cmd);
            }
        }
    }

    fn on_private_message(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, _: &str, text: &str) {
        println!("← *{}* {}", actor.name, text);
    }

    fn on_sasl(&mut self, _: &mut EventContext<'_>, outcome: &SaslOutcome) {
        println!("SASL: {:?}", outcome);
    }

    fn on_disconnect(&mut self, _: &mut EventContext<'_>, reason: &str, retry_in: Option<Duration>) {
        match retry_in {
            Some(delay) => println!("disconnected ({}), retrying in {:?}", reason, delay),
            None => println!("disconnected ({})", reason),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "irc.libera.chat".to_owned());
    let port: u16 = args
        .next()
        .map(|p| p.parse())
        .transpose()
        .context("port must be a number")?
        .unwrap_or(6697);
    let channel = args.next().unwrap_or_else(|| "#example".to_owned());

    let mut config = SessionConfig::new(host, port, "slirc_example").with_tls(true);
    if let Ok(password) = std::env::var("IRC_SASL_PASSWORD") {
        config = config.with_sasl_plain(None, password);
    }
    config.validate()?;

    let (client, handle) = Client::new(Session::new(config, Greeter { channel }), TcpTransport::new())?;
    let task = tokio::spawn(client.run());

    handle.connect()?;
    tokio::signal::ctrl_c().await?;
    handle.quit(Some("Goodbye!"))?;
    task.await?;
    Ok(())
}

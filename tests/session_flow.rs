//! Received lines driven through a connected session: registration,
//! capability negotiation, SASL, nickname fallback and message dispatch.

use std::time::{Duration, Instant};

use slirc_session::{
    Actor, Anomaly, CapChange, Capability, EventContext, EventHandler, Numeric, OutgoingCommand, SaslOutcome, Session,
    SessionConfig,
};

/// Records every event as a short string.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl Recorder {
    fn push(&mut self, event: String) {
        self.events.push(event);
    }
}

impl EventHandler for Recorder {
    fn on_welcome(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, nick: &str, text: Option<&str>) {
        self.push(format!("welcome {} {} {}", actor.name, nick, text.unwrap_or("-")));
    }

    fn on_nick(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, new_nick: &str) {
        self.push(format!("nick {} {}", actor.name, new_nick));
    }

    fn on_join(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str) {
        self.push(format!("join {} {}", actor.name, channel));
    }

    fn on_mode(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, modes: &[&str]) {
        self.push(format!("mode {} {} {}", actor.name, channel, modes.join(" ")));
    }

    fn on_umode(&mut self, _: &mut EventContext<'_>, _: &Actor<'_>, target: &str, modes: &[&str]) {
        self.push(format!("umode {} {}", target, modes.join(" ")));
    }

    fn on_kick(
        &mut self,
        _: &mut EventContext<'_>,
        actor: &Actor<'_>,
        channel: &str,
        kicked: &str,
        reason: Option<&str>,
    ) {
        self.push(format!("kick {} {} {} {}", actor.name, channel, kicked, reason.unwrap_or("-")));
    }

    fn on_channel_message(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, text: &str) {
        self.push(format!("chanmsg {} {} {}", actor.name, channel, text));
    }

    fn on_private_message(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, target: &str, text: &str) {
        self.push(format!("privmsg {} {} {}", actor.name, target, text));
    }

    fn on_notice(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, target: &str, text: &str) {
        self.push(format!("notice {} {} {}", actor.name, target, text));
    }

    fn on_ctcp_request(
        &mut self,
        ctx: &mut EventContext<'_>,
        actor: &Actor<'_>,
        target: &str,
        command: &str,
        params: Option<&str>,
    ) {
        self.push(format!("ctcp {} {} {} {}", actor.name, target, command, params.unwrap_or("-")));
        if command == "VERSION" {
            let reply = OutgoingCommand::ctcp_response(actor.name, "VERSION", Some("recorder 1.0")).unwrap();
            ctx.send(reply).unwrap();
        }
    }

    fn on_numeric(&mut self, ctx: &mut EventContext<'_>, _: &Actor<'_>, numeric: Numeric, _: &[&str]) {
        self.push(format!("numeric {} {}", numeric.code(), ctx.network().unwrap_or("-")));
    }

    fn on_cap(&mut self, _: &mut EventContext<'_>, change: &CapChange<'_>) {
        self.push(format!(
            "cap {} {}{}",
            change.subcommand.as_str(),
            change.capabilities,
            if change.continued { " (more)" } else { "" }
        ));
    }

    fn on_sasl(&mut self, _: &mut EventContext<'_>, outcome: &SaslOutcome) {
        self.push(format!("sasl {:?}", outcome));
    }

    fn on_pong(&mut self, _: &mut EventContext<'_>, _: &Actor<'_>, token: &str, latency: Option<Duration>) {
        self.push(format!("pong {} {:?}", token, latency));
    }

    fn on_error(&mut self, _: &mut EventContext<'_>, text: &str) {
        self.push(format!("error {}", text));
    }

    fn on_unknown(&mut self, _: &mut EventContext<'_>, _: &Actor<'_>, command: &str, params: &[&str]) {
        self.push(format!("unknown {} {}", command, params.join(" ")));
    }

    fn on_protocol_anomaly(&mut self, _: &mut EventContext<'_>, anomaly: &Anomaly<'_>) {
        let kind = match anomaly {
            Anomaly::Unparsable { .. } => "unparsable",
            Anomaly::Violation(_) => "violation",
            Anomaly::UnknownCapability(_) => "unknown-cap",
            Anomaly::Undecodable(_) => "undecodable",
            _ => "other",
        };
        self.push(format!("anomaly {}", kind));
    }
}

fn connected(config: SessionConfig) -> Session<Recorder> {
    let mut session = Session::new(config, Recorder::default());
    let _ = session.connect().unwrap();
    let _ = session.connect_finished().unwrap();
    session.drain_outgoing().for_each(drop);
    while session.poll_effect().is_some() {}
    session
}

fn feed(session: &mut Session<Recorder>, line: &str) {
    session.handle_line(line, Instant::now());
}

fn sent(session: &mut Session<Recorder>) -> Vec<String> {
    session.drain_outgoing().collect()
}

fn events(session: &mut Session<Recorder>) -> Vec<String> {
    std::mem::take(&mut session.handler_mut().events)
}

#[test]
fn registration_lines_on_connect() {
    let mut session = Session::new(
        SessionConfig::new("irc.test", 6667, "alice").with_password("secret"),
        Recorder::default(),
    );
    let _ = session.connect().unwrap();
    let _ = session.connect_finished().unwrap();

    assert_eq!(
        sent(&mut session),
        vec![
            "CAP LS 302\r\n",
            "PASS secret\r\n",
            "NICK alice\r\n",
            "USER alice 0 * :alice\r\n",
        ]
    );
}

#[test]
fn welcome_registers_and_starts_keepalive() {
    let mut session = connected(SessionConfig::new("irc.example.net", 6667, "alice"));

    feed(&mut session, ":irc.example.net 001 alice :Welcome");

    assert!(session.is_registered());
    assert!(session.is_negotiated());
    assert!(session.keepalive_active());
    assert_eq!(session.nickname(), "alice");
    assert_eq!(
        session.poll_effect(),
        Some(slirc_session::Effect::StartKeepalive(Duration::from_secs(30)))
    );
    assert_eq!(
        events(&mut session),
        vec!["welcome irc.example.net alice Welcome", "numeric 1 -"]
    );
}

#[test]
fn channel_and_private_messages() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":alice!a@host PRIVMSG #chan :hello there");
    feed(&mut session, ":bob!b@host PRIVMSG alice :psst");
    feed(&mut session, ":irc.test NOTICE * :*** Looking up your hostname");

    assert_eq!(
        events(&mut session),
        vec![
            "chanmsg alice #chan hello there",
            "privmsg bob alice psst",
            "notice irc.test * *** Looking up your hostname",
        ]
    );
}

#[test]
fn cap_ls_requests_only_supported() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP * LS :sasl multi-prefix");

    assert_eq!(sent(&mut session), vec!["CAP REQ :sasl\r\n"]);
    assert_eq!(events(&mut session), vec!["cap LS sasl multi-prefix"]);
}

#[test]
fn multiline_ls_is_batched() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP * LS * :sasl=PLAIN away-notify");
    assert!(sent(&mut session).is_empty());

    feed(&mut session, ":srv CAP * LS :server-time");
    assert_eq!(sent(&mut session), vec!["CAP REQ :sasl server-time\r\n"]);
    assert_eq!(
        events(&mut session),
        vec!["cap LS sasl=PLAIN away-notify (more)", "cap LS server-time"]
    );
}

#[test]
fn ls_with_nothing_supported_ends_negotiation() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP * LS :multi-prefix extended-join");

    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert!(session.is_negotiated());
}

#[test]
fn ack_without_sasl_login_ends_negotiation() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP * LS :sasl");
    assert_eq!(sent(&mut session), vec!["CAP REQ :sasl\r\n"]);

    feed(&mut session, ":srv CAP alice ACK :sasl");
    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert!(session.capabilities().is_enabled(Capability::Sasl));
}

#[test]
fn nak_ends_negotiation() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP * LS :server-time");
    sent(&mut session);
    feed(&mut session, ":srv CAP alice NAK :server-time");

    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert!(!session.capabilities().is_enabled(Capability::ServerTime));
}

#[test]
fn sasl_plain_exchange() {
    let config = SessionConfig::new("irc.test", 6667, "alice").with_sasl_plain(Some("alice"), "hunter2");
    let mut session = connected(config);

    feed(&mut session, ":srv CAP * LS :sasl=PLAIN,EXTERNAL multi-prefix");
    assert_eq!(sent(&mut session), vec!["CAP REQ :sasl\r\n"]);

    feed(&mut session, ":srv CAP alice ACK :sasl");
    assert_eq!(sent(&mut session), vec!["AUTHENTICATE PLAIN\r\n"]);
    assert!(!session.is_negotiated());

    feed(&mut session, "AUTHENTICATE +");
    assert_eq!(sent(&mut session), vec!["AUTHENTICATE AGFsaWNlAGh1bnRlcjI=\r\n"]);

    feed(&mut session, ":srv 900 alice alice!a@host alice :You are now logged in as alice");
    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert!(session.is_logged_in());

    feed(&mut session, ":srv 903 alice :SASL authentication successful");
    assert!(sent(&mut session).is_empty());

    let events = events(&mut session);
    assert!(events.contains(&"sasl LoggedIn { account: \"alice\" }".to_owned()));
    assert!(events.contains(&"sasl Succeeded".to_owned()));
}

#[test]
fn sasl_failure_still_ends_negotiation() {
    let config = SessionConfig::new("irc.test", 6667, "alice").with_sasl_plain(None, "wrong");
    let mut session = connected(config);

    feed(&mut session, ":srv CAP * LS :sasl");
    feed(&mut session, ":srv CAP alice ACK :sasl");
    feed(&mut session, "AUTHENTICATE +");
    sent(&mut session);
    events(&mut session);

    feed(&mut session, ":srv 904 alice :SASL authentication failed");

    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert!(!session.is_logged_in());
    assert_eq!(
        events(&mut session),
        vec![
            "sasl Failed { code: 904, reason: \"SASL authentication failed\" }",
            "numeric 904 -",
        ]
    );
}

#[test]
fn sasl_configured_but_not_offered() {
    let config = SessionConfig::new("irc.test", 6667, "alice").with_sasl_plain(None, "pw");
    let mut session = connected(config);

    feed(&mut session, ":srv CAP * LS :multi-prefix");

    assert_eq!(sent(&mut session), vec!["CAP END\r\n"]);
    assert_eq!(events(&mut session), vec!["cap LS multi-prefix", "sasl Unavailable"]);
}

#[test]
fn cap_new_and_del() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));
    feed(&mut session, ":srv CAP * LS :cap-notify");
    feed(&mut session, ":srv CAP alice ACK :cap-notify");
    sent(&mut session);

    feed(&mut session, ":srv CAP alice NEW :server-time");
    assert_eq!(sent(&mut session), vec!["CAP REQ :server-time\r\n"]);

    feed(&mut session, ":srv CAP alice ACK :server-time");
    assert!(session.capabilities().is_enabled(Capability::ServerTime));

    feed(&mut session, ":srv CAP alice DEL :server-time");
    assert!(!session.capabilities().is_enabled(Capability::ServerTime));
}

#[test]
fn unknown_capability_in_ack_is_an_anomaly() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv CAP alice ACK :multi-prefix");

    let events = events(&mut session);
    assert_eq!(events.first().map(String::as_str), Some("anomaly unknown-cap"));
}

#[test]
fn nickname_in_use_tries_alternates_then_underscore() {
    let config = SessionConfig::new("irc.test", 6667, "alice").with_alternate_nicknames(["alice2"]);
    let mut session = connected(config);

    feed(&mut session, ":srv 433 * alice :Nickname is already in use");
    assert_eq!(sent(&mut session), vec!["NICK alice2\r\n"]);

    feed(&mut session, ":srv 433 * alice2 :Nickname is already in use");
    assert_eq!(sent(&mut session), vec!["NICK alice2_\r\n"]);

    feed(&mut session, ":srv 001 alice2_ :Welcome");
    assert_eq!(session.nickname(), "alice2_");

    // Once registered, a collision is the user's problem.
    feed(&mut session, ":srv 433 alice2_ bob :Nickname is already in use");
    assert!(sent(&mut session).is_empty());
}

#[test]
fn own_nick_change_is_tracked() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));
    feed(&mut session, ":srv 001 alice :Welcome");

    feed(&mut session, ":ALICE!a@host NICK :alice_away");
    assert_eq!(session.nickname(), "alice_away");

    feed(&mut session, ":bob!b@host NICK carol");
    assert_eq!(session.nickname(), "alice_away");
}

#[test]
fn ctcp_version_reply() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":bob!b@host PRIVMSG alice :\u{1}VERSION\u{1}");
    feed(&mut session, ":bob!b@host PRIVMSG #chan :\u{1}ACTION waves\u{1}");

    assert_eq!(
        sent(&mut session),
        vec!["NOTICE bob :\u{1}VERSION recorder 1.0\u{1}\r\n"]
    );
    assert_eq!(
        events(&mut session),
        vec!["ctcp bob alice VERSION -", "ctcp bob #chan ACTION waves"]
    );
}

#[test]
fn unterminated_ctcp_is_plain_text() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":bob!b@host PRIVMSG #chan :\u{1}hello there");
    feed(&mut session, ":bob!b@host NOTICE alice :\u{1}VERSION");

    assert!(sent(&mut session).is_empty());
    assert_eq!(
        events(&mut session),
        vec!["chanmsg bob #chan \u{1}hello there", "notice bob alice \u{1}VERSION"]
    );
}

#[test]
fn ping_is_answered() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, "PING :irc.test");

    assert_eq!(sent(&mut session), vec!["PONG :irc.test\r\n"]);
}

#[test]
fn keepalive_pong_measures_latency() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));
    let t0 = Instant::now();
    session.handle_line(":srv 001 alice :Welcome", t0);

    let _ = session.keepalive_tick(t0 + Duration::from_secs(30)).unwrap();
    let ping = session.poll_outgoing().unwrap();
    let token = ping
        .strip_prefix("PING :")
        .and_then(|rest| rest.strip_suffix("\r\n"))
        .unwrap()
        .to_owned();

    session.handle_line(
        &format!(":srv PONG srv :{}", token),
        t0 + Duration::from_millis(30_150),
    );

    assert_eq!(session.latency(), Some(Duration::from_millis(150)));
}

#[test]
fn isupport_updates_channel_prefixes_and_network() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv 005 alice CHANTYPES=#+ NETWORK=TestNet :are supported by this server");
    feed(&mut session, ":bob!b@host PRIVMSG +modeless :hi");
    feed(&mut session, ":bob!b@host PRIVMSG &local :hi");

    assert_eq!(
        events(&mut session),
        vec![
            "numeric 5 TestNet",
            "chanmsg bob +modeless hi",
            "privmsg bob &local hi",
        ]
    );
}

#[test]
fn modes_join_and_kick() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":bob!b@host JOIN #chan");
    feed(&mut session, ":bob!b@host MODE #chan +o alice");
    feed(&mut session, ":alice MODE alice :+i");
    feed(&mut session, ":srv 221 alice +iw");
    feed(&mut session, ":bob!b@host KICK #chan carol :bye");

    assert_eq!(
        events(&mut session),
        vec![
            "join bob #chan",
            "mode bob #chan +o alice",
            "umode alice +i",
            "umode alice +iw",
            "kick bob #chan carol bye",
        ]
    );
}

#[test]
fn malformed_input_reports_anomalies() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":only.a.prefix");
    feed(&mut session, "");
    feed(&mut session, ":bob!b@host KICK #chan");
    feed(&mut session, ":bob!b@host PRIVMSG");

    assert_eq!(
        events(&mut session),
        vec![
            "anomaly unparsable",
            "anomaly unparsable",
            "anomaly violation",
            "anomaly violation",
        ]
    );
    assert!(sent(&mut session).is_empty());
}

#[test]
fn unknown_commands_and_error() {
    let mut session = connected(SessionConfig::new("irc.test", 6667, "alice"));

    feed(&mut session, ":srv FOO bar :baz qux");
    feed(&mut session, "ERROR :Closing Link: too many connections");

    assert_eq!(
        events(&mut session),
        vec!["unknown FOO bar baz qux", "error Closing Link: too many connections"]
    );
}

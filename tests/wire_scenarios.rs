//! Wire-level behavior of the parser and builder on concrete lines.

use slirc_session::builder::{build, build_single};
use slirc_session::error::{BuildError, ParseError};
use slirc_session::util::{LINE_BUDGET, MAX_LINE_LEN};
use slirc_session::{Message, Prefix, Tag};

#[test]
fn parse_welcome() {
    let msg = Message::parse(":irc.example.net 001 alice :Welcome\r\n").unwrap();

    assert_eq!(msg.prefix, Some(Prefix::ServerName("irc.example.net".into())));
    assert_eq!(msg.command, "001");
    assert_eq!(msg.params, vec!["alice"]);
    assert_eq!(msg.trailing.as_deref(), Some("Welcome"));
    assert_eq!(msg.numeric(), Some(1));
}

#[test]
fn parse_user_prefix() {
    let msg = Message::parse(":alice!a@host PRIVMSG #chan :hello there").unwrap();

    assert_eq!(
        msg.prefix,
        Some(Prefix::Nickname("alice".into(), "a".into(), "host".into()))
    );
    assert_eq!(msg.nick(), Some("alice"));
    assert_eq!(msg.user(), Some("a"));
    assert_eq!(msg.host(), Some("host"));
    assert_eq!(msg.args_from(0), vec!["#chan", "hello there"]);
}

#[test]
fn parse_tagged_line() {
    let msg = Message::parse(
        "@time=2023-01-01T12:00:00.000Z;msgid=abc\\s123;+draft/reply :bob!b@h PRIVMSG #c :hi",
    )
    .unwrap();

    assert_eq!(
        msg.tags,
        vec![
            Tag("time".into(), Some("2023-01-01T12:00:00.000Z".into())),
            Tag("msgid".into(), Some("abc 123".into())),
            Tag("+draft/reply".into(), None),
        ]
    );
    assert_eq!(msg.tag("msgid"), Some("abc 123"));
    assert!(msg.server_time().is_some());
    assert_eq!(
        msg.to_string(),
        "@time=2023-01-01T12:00:00.000Z;msgid=abc\\s123;+draft/reply :bob!b@h PRIVMSG #c :hi"
    );
}

#[test]
fn colon_inside_middle_is_not_trailing() {
    let msg = Message::parse("MODE #c +b nick!*@*:x").unwrap();
    assert_eq!(msg.params, vec!["#c", "+b", "nick!*@*:x"]);
    assert_eq!(msg.trailing, None);
}

#[test]
fn fourteen_middles_then_trailing() {
    let middles: Vec<String> = (1..=14).map(|i| format!("p{}", i)).collect();
    let line = format!("CMD {} :last one", middles.join(" "));
    let msg = Message::parse(&line).unwrap();
    assert_eq!(msg.params.len(), 14);
    assert_eq!(msg.trailing.as_deref(), Some("last one"));

    let line = format!("CMD {} p15", middles.join(" "));
    assert!(matches!(
        Message::parse(&line),
        Err(ParseError::TooManyParams { max: 14, got: 15 })
    ));
}

#[test]
fn overlong_body_rejected() {
    let line = format!("PRIVMSG #c :{}", "x".repeat(MAX_LINE_LEN));
    assert!(matches!(Message::parse(&line), Err(ParseError::LineTooLong { .. })));

    // Tags do not count against the body limit.
    let tagged = format!("@a={} PING :x", "v".repeat(600));
    assert!(Message::parse(&tagged).is_ok());
}

#[test]
fn empty_and_malformed_lines() {
    assert!(matches!(Message::parse(""), Err(ParseError::Empty)));
    assert!(matches!(Message::parse("\r\n"), Err(ParseError::Empty)));
    assert!(Message::parse(":prefix.only").is_err());
    assert!(Message::parse("PRIVMSG #c :a\0b").is_err());
}

#[test]
fn parsed_lines_rebuild_byte_identical() {
    for line in [
        "NICK alice",
        "PRIVMSG #rust :hello, world",
        "MODE #c +o bob",
        "USER alice 0 * :Alice Liddell",
        "PONG :irc.example.net",
    ] {
        let msg = Message::parse(line).unwrap();
        let middles: Vec<&str> = msg.params.iter().map(String::as_str).collect();
        let rebuilt = build_single(&msg.command, &middles, msg.trailing.as_deref()).unwrap();
        assert_eq!(rebuilt, format!("{}\r\n", line));
    }
}

#[test]
fn long_privmsg_is_split() {
    let text: String = (0..600).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let lines = build("PRIVMSG", &["#chan"], Some(&text)).unwrap();

    assert!(lines.len() >= 2);
    let mut joined = String::new();
    for line in &lines {
        assert!(line.len() <= MAX_LINE_LEN);
        assert!(line.len() <= LINE_BUDGET);
        assert!(line.starts_with("PRIVMSG #chan :"));
        let msg = Message::parse(line).unwrap();
        joined.push_str(msg.trailing.as_deref().unwrap());
    }
    assert_eq!(joined, text);
}

#[test]
fn split_respects_utf8_boundaries() {
    let text = "é".repeat(400);
    let lines = build("PRIVMSG", &["#chan"], Some(&text)).unwrap();

    assert!(lines.len() >= 2);
    let joined: String = lines
        .iter()
        .map(|l| Message::parse(l).unwrap().trailing.unwrap())
        .collect();
    assert_eq!(joined, text);
}

#[test]
fn builder_rejects_bad_input() {
    assert!(matches!(
        build("PRIVMSG", &["#chan"], Some("line\r\nQUIT")),
        Err(BuildError::IllegalChar(_))
    ));
    assert!(build("PRIVMSG", &["two words"], Some("x")).is_err());
    assert!(build_single("PRIVMSG", &["#chan"], Some(&"x".repeat(600))).is_err());
}

//! Fuzz target for IRC line parsing
//!
//! Feeds arbitrary lines to the parser and to a connected session. Neither
//! may panic, and whatever parses must re-serialize to an equal message.

#![no_main]

use std::str;
use std::time::Instant;

use libfuzzer_sys::fuzz_target;
use slirc_session::{Message, Session, SessionConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = str::from_utf8(data) else {
        return;
    };

    if let Ok(msg) = Message::parse(input) {
        let again = Message::parse(&msg.to_string()).expect("serialized message parses");
        assert_eq!(msg, again);
    }

    let mut session = Session::new(SessionConfig::new("fuzz.test", 6667, "fuzz"), ());
    let _ = session.connect();
    let _ = session.connect_finished();
    for line in input.split('\n') {
        session.handle_line(line, Instant::now());
    }
    session.drain_outgoing().for_each(drop);
});

//! Fuzz target for outgoing line splitting
//!
//! Whatever the builder accepts must come back as lines within the budget
//! that parse and reassemble to the input text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_session::builder::build;
use slirc_session::util::LINE_BUDGET;
use slirc_session::Message;

fuzz_target!(|input: (&str, &str)| {
    let (target, text) = input;
    let Ok(lines) = build("PRIVMSG", &[target], Some(text)) else {
        return;
    };

    let mut joined = String::new();
    for line in &lines {
        assert!(line.len() <= LINE_BUDGET);
        let msg = Message::parse(line).expect("built line parses");
        joined.push_str(msg.trailing.as_deref().unwrap_or(""));
    }
    assert_eq!(joined, text);
});

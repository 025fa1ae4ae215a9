//! IRCv3 message tags.

use std::fmt::{Result as FmtResult, Write};

/// A single message tag: key and optional (unescaped) value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub String, pub Option<String>);

impl Tag {
    /// Tag key, including any vendor prefix or `+` client marker.
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Tag value, if one was given.
    pub fn value(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Split a raw tag section (without the leading `@`) into tags.
///
/// Empty entries (`a;;b`) are skipped, and a value that unescapes to
/// nothing (`key=`) is treated as no value.
pub(crate) fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('=') {
            Some((key, value)) => {
                let value = unescape_tag_value(value);
                Tag(key.to_owned(), (!value.is_empty()).then_some(value))
            }
            None => Tag(item.to_owned(), None),
        })
        .collect()
}

/// Escape a tag value for the wire.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Reverse [`escape_tag_value`]. Unknown escapes lose their backslash and
/// a dangling backslash at the end is dropped.
pub(crate) fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

//! Nom-based IRC line parser.
//!
//! The combinators only borrow from the input; [`parse_line`] turns the
//! borrowed pieces into an owned [`Message`] once all limits are checked.

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use super::tags::parse_tags;
use super::Message;
use crate::error::ParseError;
use crate::prefix::Prefix;
use crate::util::{MAX_BODY_LEN, MAX_MIDDLE_PARAMS, MAX_TAGS_LENGTH};

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

fn parse_tags_section(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_till1(|c| c == ' ')),
    )(input)
}

fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_till1(|c| c == ' ')),
    )(input)
}

fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Borrowed components of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawParts<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub middles: Vec<&'a str>,
    pub trailing: Option<&'a str>,
    /// Byte offset where the untagged body starts.
    pub body_start: usize,
}

/// Split parameters. Runs of spaces separate middles; the first token that
/// starts with `:` opens the trailing parameter, which keeps everything to
/// the end of the line.
fn split_params(mut rest: &str) -> (Vec<&str>, Option<&str>) {
    let mut middles = Vec::new();
    loop {
        let token = rest.trim_start_matches(' ');
        if token.is_empty() {
            return (middles, None);
        }
        if let Some(trailing) = token.strip_prefix(':') {
            return (middles, Some(trailing));
        }
        let end = token.find(' ').unwrap_or(token.len());
        middles.push(&token[..end]);
        rest = &token[end..];
    }
}

pub(crate) fn parse_parts(input: &str) -> ParseResult<&str, RawParts<'_>> {
    let (rest, tags) = context("parsing optional tags", opt(parse_tags_section))(input)?;
    let (rest, _) = space0(rest)?;
    let body_start = input.len() - rest.len();

    let (rest, prefix) = context("parsing optional prefix", opt(parse_prefix))(rest)?;
    let (rest, _) = space0(rest)?;

    let (rest, command) = context("parsing required command", parse_command)(rest)?;
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(rest, VerboseErrorKind::Context("parsing IRC command"))],
        }));
    }

    let (middles, trailing) = split_params(rest);
    Ok((
        "",
        RawParts {
            tags,
            prefix,
            command,
            middles,
            trailing,
            body_start,
        },
    ))
}

fn to_parse_error(input: &str, err: nom::Err<VerboseError<&str>>) -> ParseError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let mut position = input.len();
            let mut ctx = "parsing IRC message";
            // The first entry is the innermost failure, contexts wrap it.
            if let Some((at, _)) = e.errors.first() {
                position = input.len() - at.len();
            }
            for (_, kind) in &e.errors {
                if let VerboseErrorKind::Context(c) = kind {
                    ctx = c;
                    break;
                }
            }
            ParseError::Malformed {
                position,
                context: ctx,
            }
        }
        nom::Err::Incomplete(_) => ParseError::Malformed {
            position: input.len(),
            context: "incomplete input",
        },
    }
}

/// Parse one line (CRLF optional) into a [`Message`].
pub fn parse_line(line: &str) -> Result<Message, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(c) = line.chars().find(|c| matches!(c, '\0' | '\r' | '\n')) {
        return Err(ParseError::IllegalControlChar(c));
    }

    let (_, parts) = parse_parts(line).map_err(|e| to_parse_error(line, e))?;

    if let Some(tags) = parts.tags {
        if tags.len() > MAX_TAGS_LENGTH {
            return Err(ParseError::LineTooLong {
                len: tags.len(),
                max: MAX_TAGS_LENGTH,
            });
        }
    }
    let body_len = line.len() - parts.body_start;
    if body_len > MAX_BODY_LEN {
        return Err(ParseError::LineTooLong {
            len: body_len,
            max: MAX_BODY_LEN,
        });
    }
    if parts.middles.len() > MAX_MIDDLE_PARAMS {
        return Err(ParseError::TooManyParams {
            max: MAX_MIDDLE_PARAMS,
            got: parts.middles.len(),
        });
    }

    Ok(Message {
        tags: parts.tags.map(parse_tags).unwrap_or_default(),
        prefix: parts.prefix.map(Prefix::parse),
        command: parts.command.to_ascii_uppercase(),
        params: parts.middles.into_iter().map(str::to_owned).collect(),
        trailing: parts.trailing.map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts_simple() {
        let (_, p) = parse_parts("PING").unwrap();
        assert_eq!(p.command, "PING");
        assert!(p.tags.is_none() && p.prefix.is_none());
        assert!(p.middles.is_empty());
        assert_eq!(p.trailing, None);
    }

    #[test]
    fn test_parse_parts_full() {
        let (_, p) = parse_parts("@a=b :n!u@h PRIVMSG #chan :hello there").unwrap();
        assert_eq!(p.tags, Some("a=b"));
        assert_eq!(p.prefix, Some("n!u@h"));
        assert_eq!(p.middles, vec!["#chan"]);
        assert_eq!(p.trailing, Some("hello there"));
        assert_eq!(p.body_start, 5);
    }

    #[test]
    fn test_colon_inside_middle() {
        let (_, p) = parse_parts("PRIVMSG #chan foo:bar :baz qux").unwrap();
        assert_eq!(p.middles, vec!["#chan", "foo:bar"]);
        assert_eq!(p.trailing, Some("baz qux"));
    }

    #[test]
    fn test_collapsed_spaces() {
        let (_, p) = parse_parts("MODE  #chan   +o   nick").unwrap();
        assert_eq!(p.middles, vec!["#chan", "+o", "nick"]);
    }

    #[test]
    fn test_trailing_keeps_inner_colons_and_spaces() {
        let (_, p) = parse_parts("NOTICE x :a :b  c ").unwrap();
        assert_eq!(p.trailing, Some("a :b  c "));
    }

    #[test]
    fn test_leading_colon_parameters() {
        let (_, p) = parse_parts(":srv CMD :only trailing").unwrap();
        assert!(p.middles.is_empty());
        assert_eq!(p.trailing, Some("only trailing"));
    }

    #[test]
    fn test_missing_command_reports_context() {
        let err = parse_line(":prefix.only").unwrap_err();
        match err {
            ParseError::Malformed { position, context } => {
                assert_eq!(position, 12);
                assert_eq!(context, "parsing IRC command");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_command_character() {
        assert!(matches!(
            parse_line("PRIV-MSG x"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(parse_line(""), Err(ParseError::Empty));
        assert_eq!(parse_line("   \r\n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_nul_rejected() {
        assert_eq!(
            parse_line("PRIVMSG #a :x\0y"),
            Err(ParseError::IllegalControlChar('\0'))
        );
    }

    #[test]
    fn test_tags_excluded_from_body_limit() {
        let tags = "x".repeat(600);
        let body = format!("PRIVMSG #a :{}", "y".repeat(480));
        let line = format!("@k={} {}", tags, body);
        assert!(parse_line(&line).is_ok());

        let long = format!("PRIVMSG #a :{}", "y".repeat(500));
        assert!(matches!(
            parse_line(&long),
            Err(ParseError::LineTooLong { max: 510, .. })
        ));
    }

    #[test]
    fn test_param_count_bound() {
        let fourteen = format!("CMD {}", vec!["p"; 14].join(" "));
        assert_eq!(parse_line(&fourteen).unwrap().params.len(), 14);

        let fifteen = format!("CMD {} :t", vec!["p"; 15].join(" "));
        assert_eq!(
            parse_line(&fifteen),
            Err(ParseError::TooManyParams { max: 14, got: 15 })
        );
    }

    #[test]
    fn test_command_uppercased() {
        assert_eq!(parse_line("privmsg #a :hi").unwrap().command, "PRIVMSG");
    }
}

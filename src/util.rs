//! Wire limits and string helpers shared by the parser and the builder.

/// Maximum length of an IRC line, including CRLF and excluding tags.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum length of a line body (everything but CRLF).
pub const MAX_BODY_LEN: usize = MAX_LINE_LEN - 2;

/// Maximum length for the IRCv3 tags section.
pub const MAX_TAGS_LENGTH: usize = 8191;

/// Maximum number of middle parameters (RFC 1459 §2.3).
pub const MAX_MIDDLE_PARAMS: usize = 14;

/// Bytes reserved for the `:nick!user@host ` prefix the server prepends
/// when relaying a client line.
pub const PREFIX_RESERVE: usize = 50;

/// Byte budget for an outgoing line, CRLF included.
pub const LINE_BUDGET: usize = MAX_LINE_LEN - PREFIX_RESERVE;

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// ```
/// use slirc_session::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
/// assert_eq!(truncate_utf8_safe("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// First character that may never appear inside a line: CR, LF or NUL.
#[inline]
pub(crate) fn find_line_breaker(s: &str) -> Option<char> {
    s.chars().find(|c| matches!(c, '\r' | '\n' | '\0'))
}

/// Milliseconds elapsed since `epoch`, saturating.
#[inline]
pub(crate) fn millis_since(epoch: std::time::Instant, now: std::time::Instant) -> u64 {
    u64::try_from(now.saturating_duration_since(epoch).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_safe_multibyte() {
        assert_eq!(truncate_utf8_safe("café", 4), "caf");
        assert_eq!(truncate_utf8_safe("café", 5), "café");
        assert_eq!(truncate_utf8_safe("100€", 4), "100");
        assert_eq!(truncate_utf8_safe("Hi👋", 3), "Hi");
        assert_eq!(truncate_utf8_safe("日本語", 7), "日本");
        assert_eq!(truncate_utf8_safe("hello", 0), "");
    }

    #[test]
    fn test_line_breakers() {
        assert_eq!(find_line_breaker("plain text"), None);
        assert_eq!(find_line_breaker("a\r\nb"), Some('\r'));
        assert_eq!(find_line_breaker("nul\0"), Some('\0'));
    }

    #[test]
    fn test_constants() {
        assert_eq!(LINE_BUDGET, 462);
        assert_eq!(MAX_BODY_LEN, 510);
    }
}

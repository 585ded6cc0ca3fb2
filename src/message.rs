//! Line framing and the IRC message grammar.
//!
//! This module does two jobs: pulling complete lines out of a connection's
//! input buffer (`extract_line`, `unfinished_tail_len`), and parsing one
//! line into a [`Message`] (prefix, command, params).

use crate::prefix::Prefix;
use std::fmt;

/// Per-line byte ceiling, excluding the `\r\n` terminator.
pub const MAX_LINE_BODY: usize = 510;

/// A parsed IRC message: optional source, verb, and parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Builds a message with no prefix, for the common "just send this" case.
    pub fn new(command: impl Into<String>, params: impl IntoIterator<Item = String>) -> Message {
        Message {
            prefix: None,
            command: command.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Attaches a prefix to this message, returning it for chaining.
    pub fn with_prefix(mut self, prefix: Prefix) -> Message {
        self.prefix = Some(prefix);
        self
    }

    /// Parses a single line (no terminator, `\r` already stripped) per the
    /// wire grammar. A malformed line (prefix with no following space)
    /// yields an empty command, which the dispatcher treats as a no-op.
    pub fn parse(line: &str) -> Message {
        let mut rest = line;
        let mut prefix = None;

        if let Some(stripped) = rest.strip_prefix(':') {
            match stripped.find(' ') {
                Some(sp) => {
                    prefix = Some(Prefix::parse(&stripped[..sp]));
                    rest = &stripped[sp + 1..];
                }
                None => {
                    return Message {
                        prefix: None,
                        command: String::new(),
                        params: Vec::new(),
                    };
                }
            }
        }

        rest = rest.trim_start_matches(' ');

        let (head, trailing) = match rest.find(" :") {
            Some(idx) => (&rest[..idx], Some(rest[idx + 2..].to_string())),
            None => (rest, None),
        };

        let mut tokens = head.split(' ').filter(|t| !t.is_empty());
        let command = tokens.next().unwrap_or_default().to_string();
        let mut params: Vec<String> = tokens.map(|t| t.to_string()).collect();
        if let Some(t) = trailing {
            params.push(t);
        }

        Message {
            prefix,
            command,
            params,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for p in middle {
                write!(f, " {p}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

/// Returns the length of the unfinished tail of `buf`: the bytes after the
/// last newline, or the whole buffer if it contains none.
pub fn unfinished_tail_len(buf: &[u8]) -> usize {
    match buf.iter().rposition(|&b| b == b'\n') {
        Some(pos) => buf.len() - (pos + 1),
        None => buf.len(),
    }
}

/// Extracts one complete line from the front of `buf`, if any, stripping a
/// single trailing `\r`. The extracted bytes (including the newline) are
/// removed from `buf`. Returns `None` if `buf` contains no newline yet.
pub fn extract_line(buf: &mut Vec<u8>) -> Option<String> {
    let nl = buf.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buf.drain(..=nl).collect();
    line.pop(); // drop '\n'
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_command() {
        let m = Message::parse("PING");
        assert_eq!(m.command, "PING");
        assert!(m.params.is_empty());
    }

    #[test]
    fn parses_trailing_param_with_spaces() {
        let m = Message::parse("PRIVMSG #dev :hello there world");
        assert_eq!(m.command, "PRIVMSG");
        assert_eq!(m.params, vec!["#dev", "hello there world"]);
    }

    #[test]
    fn parses_prefix_and_middle_params() {
        let m = Message::parse(":alice!a@localhost JOIN #dev");
        assert_eq!(
            m.prefix,
            Some(Prefix::parse("alice!a@localhost"))
        );
        assert_eq!(m.command, "JOIN");
        assert_eq!(m.params, vec!["#dev"]);
    }

    #[test]
    fn malformed_prefix_yields_empty_command() {
        let m = Message::parse(":nospacehere");
        assert_eq!(m.command, "");
        assert!(m.params.is_empty());
    }

    #[test]
    fn skips_leading_spaces_after_prefix() {
        let m = Message::parse(":srv   NOTICE x :hi");
        assert_eq!(m.command, "NOTICE");
        assert_eq!(m.params, vec!["x", "hi"]);
    }

    #[test]
    fn round_trip_preserves_tuple() {
        let original = "PRIVMSG #dev :Hello, world!";
        let parsed = Message::parse(original);
        let serialized = parsed.to_string();
        let reparsed = Message::parse(&serialized);
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn extract_line_splits_on_newline_and_strips_cr() {
        let mut buf = b"NICK alice\r\nUSER a 0 * :A\r\n".to_vec();
        let first = extract_line(&mut buf).unwrap();
        assert_eq!(first, "NICK alice");
        let second = extract_line(&mut buf).unwrap();
        assert_eq!(second, "USER a 0 * :A");
        assert!(extract_line(&mut buf).is_none());
    }

    #[test]
    fn unfinished_tail_measures_bytes_after_last_newline() {
        assert_eq!(unfinished_tail_len(b"abc\ndef"), 3);
        assert_eq!(unfinished_tail_len(b"no newline"), 10);
        assert_eq!(unfinished_tail_len(b"complete\n"), 0);
    }

    #[test]
    fn bare_lf_is_accepted_as_terminator() {
        let mut buf = b"PING\n".to_vec();
        assert_eq!(extract_line(&mut buf).unwrap(), "PING");
    }
}

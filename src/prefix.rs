//! IRC message prefix (source) types.
//!
//! A prefix identifies the originator of a message: either a bare server
//! name, or a full `nick!user@host` client mask. This server only ever
//! emits prefixes it synthesizes itself (see [`crate::connection::user_prefix`]),
//! but still needs to parse them back out of lines it receives (clients are
//! not required to send one, and some send a bare nick).

use std::fmt;

/// The source of a message, as carried by the optional leading `:token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// A bare server or nick name with no `!user@host` suffix.
    Server(String),
    /// A full client mask: nickname, username, and host.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parses a prefix token (with the leading `:` already stripped).
    pub fn parse(s: &str) -> Prefix {
        match s.find('!') {
            Some(bang) => {
                let nick = &s[..bang];
                let rest = &s[bang + 1..];
                match rest.find('@') {
                    Some(at) => Prefix::Nickname(
                        nick.to_string(),
                        rest[..at].to_string(),
                        rest[at + 1..].to_string(),
                    ),
                    None => Prefix::Server(s.to_string()),
                }
            }
            None => Prefix::Server(s.to_string()),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => write!(f, "{name}"),
            Prefix::Nickname(nick, user, host) => write!(f, "{nick}!{user}@{host}"),
        }
    }
}

//! Numeric replies and their constructor functions.
//!
//! [`Response`] enumerates the numerics this server can emit. Each has a
//! constructor function below that builds the exact [`Message`] the
//! protocol calls for, server-prefixed and with the literal text the
//! wire format expects.

use crate::message::Message;
use std::fmt;

/// A three-digit IRC numeric reply code.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Response {
    RPL_WELCOME,
    RPL_YOURHOST,
    RPL_CREATED,
    RPL_MYINFO,
    RPL_WHOREPLY,
    RPL_ENDOFWHO,
    RPL_CHANNELMODEIS,
    RPL_NOTOPIC,
    RPL_TOPIC,
    RPL_INVITING,
    RPL_NAMREPLY,
    RPL_ENDOFNAMES,
    ERR_NOSUCHNICK,
    ERR_NOSUCHCHANNEL,
    ERR_CANNOTSENDTOCHAN,
    ERR_NORECIPIENT,
    ERR_NOTEXTTOSEND,
    ERR_UNKNOWNCOMMAND,
    ERR_NONICKNAMEGIVEN,
    ERR_NICKNAMEINUSE,
    ERR_USERNOTINCHANNEL,
    ERR_NOTONCHANNEL,
    ERR_USERONCHANNEL,
    ERR_NOTREGISTERED,
    ERR_NEEDMOREPARAMS,
    ERR_PASSWDMISMATCH,
    ERR_CHANNELISFULL,
    ERR_UNKNOWNMODE,
    ERR_INVITEONLYCHAN,
    ERR_BADCHANNELKEY,
    ERR_BADCHANNAME,
    ERR_CHANOPRIVSNEEDED,
}

impl Response {
    /// The three-digit numeric this variant encodes.
    pub fn code(&self) -> u16 {
        use Response::*;
        match self {
            RPL_WELCOME => 1,
            RPL_YOURHOST => 2,
            RPL_CREATED => 3,
            RPL_MYINFO => 4,
            RPL_WHOREPLY => 352,
            RPL_ENDOFWHO => 315,
            RPL_CHANNELMODEIS => 324,
            RPL_NOTOPIC => 331,
            RPL_TOPIC => 332,
            RPL_INVITING => 341,
            RPL_NAMREPLY => 353,
            RPL_ENDOFNAMES => 366,
            ERR_NOSUCHNICK => 401,
            ERR_NOSUCHCHANNEL => 403,
            ERR_CANNOTSENDTOCHAN => 404,
            ERR_NORECIPIENT => 411,
            ERR_NOTEXTTOSEND => 412,
            ERR_UNKNOWNCOMMAND => 421,
            ERR_NONICKNAMEGIVEN => 431,
            ERR_NICKNAMEINUSE => 433,
            ERR_USERNOTINCHANNEL => 441,
            ERR_NOTONCHANNEL => 442,
            ERR_USERONCHANNEL => 443,
            ERR_NOTREGISTERED => 451,
            ERR_NEEDMOREPARAMS => 461,
            ERR_PASSWDMISMATCH => 464,
            ERR_CHANNELISFULL => 471,
            ERR_UNKNOWNMODE => 472,
            ERR_INVITEONLYCHAN => 473,
            ERR_BADCHANNELKEY => 475,
            ERR_BADCHANNAME => 479,
            ERR_CHANOPRIVSNEEDED => 482,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Builds a bare numeric-reply message: `<code> <target> <params...>`.
fn reply(code: Response, target: &str, mut params: Vec<String>) -> Message {
    let mut all = vec![target.to_string()];
    all.append(&mut params);
    Message::new(code.to_string(), all)
}

fn p(s: impl Into<String>) -> String {
    s.into()
}

// === Registration welcome burst (001-004) ===

pub fn welcome(server: &str, nick: &str) -> Message {
    reply(
        Response::RPL_WELCOME,
        nick,
        vec![p(format!(
            "Welcome to the Internet Relay Network {nick}"
        ))],
    )
    .with_server(server)
}

pub fn yourhost(server: &str, version: &str, nick: &str) -> Message {
    reply(
        Response::RPL_YOURHOST,
        nick,
        vec![p(format!(
            "Your host is {server}, running version {version}"
        ))],
    )
    .with_server(server)
}

pub fn created(server: &str, nick: &str) -> Message {
    reply(
        Response::RPL_CREATED,
        nick,
        vec![p("This server was created today".to_string())],
    )
    .with_server(server)
}

pub fn myinfo(server: &str, version: &str, nick: &str) -> Message {
    reply(
        Response::RPL_MYINFO,
        nick,
        vec![p(server), p(version), p("o"), p("itklo")],
    )
    .with_server(server)
}

// === Channel replies ===

pub fn notopic(server: &str, nick: &str, chan: &str) -> Message {
    reply(
        Response::RPL_NOTOPIC,
        nick,
        vec![p(chan), p("No topic is set")],
    )
    .with_server(server)
}

pub fn topic(server: &str, nick: &str, chan: &str, topic_text: &str) -> Message {
    reply(Response::RPL_TOPIC, nick, vec![p(chan), p(topic_text)]).with_server(server)
}

pub fn inviting(server: &str, nick: &str, target: &str, chan: &str) -> Message {
    reply(Response::RPL_INVITING, nick, vec![p(target), p(chan)]).with_server(server)
}

pub fn namreply(server: &str, nick: &str, chan: &str, names: &str) -> Message {
    reply(
        Response::RPL_NAMREPLY,
        nick,
        vec![p("="), p(chan), p(names)],
    )
    .with_server(server)
}

pub fn endofnames(server: &str, nick: &str, chan: &str) -> Message {
    reply(
        Response::RPL_ENDOFNAMES,
        nick,
        vec![p(chan), p("End of /NAMES list.")],
    )
    .with_server(server)
}

pub fn channelmodeis(server: &str, nick: &str, chan: &str, modes: &str, extra: Vec<String>) -> Message {
    let mut params = vec![p(chan), p(modes)];
    params.extend(extra);
    reply(Response::RPL_CHANNELMODEIS, nick, params).with_server(server)
}

pub fn whoreply(
    server: &str,
    nick: &str,
    mask: &str,
    user: &str,
    member_nick: &str,
    realname: &str,
) -> Message {
    reply(
        Response::RPL_WHOREPLY,
        nick,
        vec![
            p(mask),
            p(user),
            p("localhost"),
            p(server),
            p(member_nick),
            p("H"),
            p(format!("0 {realname}")),
        ],
    )
    .with_server(server)
}

pub fn endofwho(server: &str, nick: &str, mask: &str) -> Message {
    reply(
        Response::RPL_ENDOFWHO,
        nick,
        vec![p(mask), p("End of /WHO list.")],
    )
    .with_server(server)
}

// === Errors ===

pub fn err_nosuchnick(server: &str, client: &str, nickname: &str) -> Message {
    reply(
        Response::ERR_NOSUCHNICK,
        client,
        vec![p(nickname), p("No such nick/channel")],
    )
    .with_server(server)
}

pub fn err_nosuchchannel(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_NOSUCHCHANNEL,
        client,
        vec![p(chan), p("No such channel")],
    )
    .with_server(server)
}

pub fn err_cannotsendtochan(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_CANNOTSENDTOCHAN,
        client,
        vec![p(chan), p("Cannot send to channel")],
    )
    .with_server(server)
}

pub fn err_norecipient(server: &str, client: &str, command: &str) -> Message {
    reply(
        Response::ERR_NORECIPIENT,
        client,
        vec![p(format!("No recipient given ({command})"))],
    )
    .with_server(server)
}

pub fn err_notexttosend(server: &str, client: &str) -> Message {
    reply(
        Response::ERR_NOTEXTTOSEND,
        client,
        vec![p("No text to send")],
    )
    .with_server(server)
}

pub fn err_unknowncommand(server: &str, client: &str, command: &str) -> Message {
    reply(
        Response::ERR_UNKNOWNCOMMAND,
        client,
        vec![p(command), p("Unknown command")],
    )
    .with_server(server)
}

pub fn err_nonicknamegiven(server: &str, client: &str) -> Message {
    reply(
        Response::ERR_NONICKNAMEGIVEN,
        client,
        vec![p("No nickname given")],
    )
    .with_server(server)
}

pub fn err_nicknameinuse(server: &str, client: &str, nick: &str) -> Message {
    reply(
        Response::ERR_NICKNAMEINUSE,
        client,
        vec![p(nick), p("Nickname is already in use")],
    )
    .with_server(server)
}

pub fn err_usernotinchannel(server: &str, client: &str, target: &str, chan: &str) -> Message {
    reply(
        Response::ERR_USERNOTINCHANNEL,
        client,
        vec![p(target), p(chan), p("They aren't on that channel")],
    )
    .with_server(server)
}

pub fn err_notonchannel(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_NOTONCHANNEL,
        client,
        vec![p(chan), p("You're not on that channel")],
    )
    .with_server(server)
}

pub fn err_useronchannel(server: &str, client: &str, target: &str, chan: &str) -> Message {
    reply(
        Response::ERR_USERONCHANNEL,
        client,
        vec![p(target), p(chan), p("is already on channel")],
    )
    .with_server(server)
}

pub fn err_notregistered(server: &str, client: &str) -> Message {
    reply(
        Response::ERR_NOTREGISTERED,
        client,
        vec![p("You have not registered")],
    )
    .with_server(server)
}

pub fn err_needmoreparams(server: &str, client: &str, command: &str) -> Message {
    reply(
        Response::ERR_NEEDMOREPARAMS,
        client,
        vec![p(command), p("Not enough parameters")],
    )
    .with_server(server)
}

pub fn err_passwdmismatch(server: &str, client: &str) -> Message {
    reply(
        Response::ERR_PASSWDMISMATCH,
        client,
        vec![p("Password incorrect")],
    )
    .with_server(server)
}

pub fn err_channelisfull(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_CHANNELISFULL,
        client,
        vec![p(chan), p("Cannot join channel (+l)")],
    )
    .with_server(server)
}

pub fn err_unknownmode(server: &str, client: &str, ch: char) -> Message {
    reply(
        Response::ERR_UNKNOWNMODE,
        client,
        vec![p(ch.to_string()), p("is unknown mode char to me")],
    )
    .with_server(server)
}

pub fn err_inviteonlychan(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_INVITEONLYCHAN,
        client,
        vec![p(chan), p("Cannot join channel (+i)")],
    )
    .with_server(server)
}

pub fn err_badchannelkey(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_BADCHANNELKEY,
        client,
        vec![p(chan), p("Cannot join channel (+k)")],
    )
    .with_server(server)
}

pub fn err_badchanname(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_BADCHANNAME,
        client,
        vec![p(chan), p("Illegal channel name")],
    )
    .with_server(server)
}

pub fn err_chanoprivsneeded(server: &str, client: &str, chan: &str) -> Message {
    reply(
        Response::ERR_CHANOPRIVSNEEDED,
        client,
        vec![p(chan), p("You're not channel operator")],
    )
    .with_server(server)
}

trait WithServer {
    fn with_server(self, server: &str) -> Message;
}

impl WithServer for Message {
    fn with_server(self, server: &str) -> Message {
        self.with_prefix(crate::prefix::Prefix::Server(server.to_string()))
    }
}

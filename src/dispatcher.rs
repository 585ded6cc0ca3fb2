//! Routes a parsed message to its handler, enforcing registered-only
//! gating and reporting unknown verbs.

use crate::handlers;
use crate::message::Message;
use crate::response;
use crate::server::{Handle, Server};

const REGISTERED_ONLY: &[&str] = &["JOIN", "PRIVMSG", "MODE", "WHO", "TOPIC", "INVITE", "KICK"];

/// Dispatches one parsed line on behalf of `handle`. A message with an
/// empty command (the Frame Parser's representation of a malformed line)
/// is a silent no-op.
pub fn dispatch(server: &mut Server, handle: Handle, msg: Message) {
    if msg.command.is_empty() {
        return;
    }
    let verb = msg.command.to_ascii_uppercase();

    if REGISTERED_ONLY.contains(&verb.as_str()) {
        let registered = server
            .connections
            .get(&handle)
            .map(|c| c.registration.is_registered())
            .unwrap_or(false);
        if !registered {
            let client = server
                .connections
                .get(&handle)
                .and_then(|c| c.registration.nick())
                .unwrap_or("*")
                .to_string();
            if let Some(conn) = server.connections.get_mut(&handle) {
                conn.enqueue(&response::err_notregistered(&server.name.clone(), &client));
            }
            return;
        }
    }

    match verb.as_str() {
        "CAP" => handlers::handle_cap(server, handle, &msg),
        "PASS" => handlers::handle_pass(server, handle, &msg),
        "NICK" => handlers::handle_nick(server, handle, &msg),
        "USER" => handlers::handle_user(server, handle, &msg),
        "PING" => handlers::handle_ping(server, handle, &msg),
        "PRIVMSG" => handlers::handle_privmsg(server, handle, &msg),
        "JOIN" => handlers::handle_join(server, handle, &msg),
        "TOPIC" => handlers::handle_topic(server, handle, &msg),
        "MODE" => handlers::handle_mode(server, handle, &msg),
        "INVITE" => handlers::handle_invite(server, handle, &msg),
        "KICK" => handlers::handle_kick(server, handle, &msg),
        "WHO" => handlers::handle_who(server, handle, &msg),
        "QUIT" => handlers::handle_quit(server, handle, &msg),
        _ => {
            let client = server
                .connections
                .get(&handle)
                .and_then(|c| c.registration.nick())
                .unwrap_or("*")
                .to_string();
            if let Some(conn) = server.connections.get_mut(&handle) {
                conn.enqueue(&response::err_unknowncommand(&server.name.clone(), &client, &msg.command));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::message::Message;

    fn server() -> Server {
        Server::new("ircserv", "0.1", "pw")
    }

    fn output_of(server: &Server, handle: Handle) -> String {
        String::from_utf8(server.connections[&handle].output.clone()).unwrap()
    }

    #[test]
    fn full_handshake_sends_welcome_burst_in_order() {
        let mut server = server();
        server.connections.insert(1, Connection::new(1));

        dispatch(&mut server, 1, Message::parse("PASS pw"));
        dispatch(&mut server, 1, Message::parse("NICK alice"));
        dispatch(&mut server, 1, Message::parse("USER a 0 * :A"));

        let out = output_of(&server, 1);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with(":ircserv 001"));
        assert!(lines[1].starts_with(":ircserv 002"));
        assert!(lines[2].starts_with(":ircserv 003"));
        assert!(lines[3].starts_with(":ircserv 004"));
    }

    #[test]
    fn second_client_with_same_nick_gets_433_and_stays_unregistered() {
        let mut server = server();
        server.connections.insert(1, Connection::new(1));
        server.connections.insert(2, Connection::new(2));
        dispatch(&mut server, 1, Message::parse("NICK bob"));
        dispatch(&mut server, 2, Message::parse("NICK bob"));

        let out = output_of(&server, 2);
        assert!(out.contains("433 * bob :Nickname is already in use"));
        assert!(!server.connections[&2].registration.is_registered());
    }

    #[test]
    fn unregistered_client_gets_451_for_join() {
        let mut server = server();
        server.connections.insert(1, Connection::new(1));
        dispatch(&mut server, 1, Message::parse("JOIN #dev"));
        assert!(output_of(&server, 1).contains("451"));
    }

    #[test]
    fn unknown_verb_gets_421() {
        let mut server = server();
        server.connections.insert(1, Connection::new(1));
        dispatch(&mut server, 1, Message::parse("BOGUS"));
        assert!(output_of(&server, 1).contains("421 * BOGUS :Unknown command"));
    }

    #[test]
    fn empty_command_is_a_silent_no_op() {
        let mut server = server();
        server.connections.insert(1, Connection::new(1));
        dispatch(&mut server, 1, Message::parse(":nospacehere"));
        assert!(server.connections[&1].output.is_empty());
    }
}

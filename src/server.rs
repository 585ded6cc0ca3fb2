//! The central server value: owns the connection table, channel store, and
//! nick registry. Connections and channels hold only handles into these
//! tables, never cross-references, so deletion is a single table erase
//! plus index cleanup.

use crate::channel::Channel;
use crate::connection::Connection;
use crate::message::Message;
use crate::prefix::Prefix;
use crate::registry::NickRegistry;
use std::collections::{BTreeSet, HashMap};

/// A connection's stable integer handle. The OS socket descriptor serves
/// directly as this value.
pub type Handle = i32;

/// Process-wide, single-threaded server state.
pub struct Server {
    pub name: String,
    pub version: String,
    pub password: String,
    pub connections: HashMap<Handle, Connection>,
    pub channels: HashMap<String, Channel>,
    pub nicks: NickRegistry,
}

impl Server {
    pub fn new(name: impl Into<String>, version: impl Into<String>, password: impl Into<String>) -> Server {
        Server {
            name: name.into(),
            version: version.into(),
            password: password.into(),
            connections: HashMap::new(),
            channels: HashMap::new(),
            nicks: NickRegistry::new(),
        }
    }

    /// Convenience constructor for unit tests that exercise logic needing
    /// a `&Server` (e.g. the mode engine's nick lookups) without any real
    /// sockets.
    #[cfg(test)]
    pub fn new_for_test(name: &str, version: &str) -> Server {
        Server::new(name, version, "unused")
    }

    /// Tears down `handle`'s membership in every subsystem: broadcasts a
    /// `QUIT` to channel co-members, removes it from every channel
    /// (auto-promoting a new operator where needed, destroying channels
    /// left empty), releases its nick binding, and removes its connection
    /// entry. Does not touch sockets or the readiness multiplexer — the
    /// event loop does that once this returns.
    pub fn disconnect(&mut self, handle: Handle) {
        let departing = self.connections.get(&handle).map(|c| {
            (
                c.display_prefix(),
                c.registration.nick().map(|s| s.to_string()),
            )
        });

        if let Some((prefix, Some(nick))) = departing.clone() {
            let quit_line =
                Message::new("QUIT", vec!["Client Quit".to_string()]).with_prefix(Prefix::parse(&prefix));

            let mut recipients: BTreeSet<Handle> = BTreeSet::new();
            for chan in self.channels.values() {
                if chan.members.contains(&handle) {
                    recipients.extend(chan.members.iter().copied().filter(|&m| m != handle));
                }
            }
            for r in recipients {
                if let Some(conn) = self.connections.get_mut(&r) {
                    conn.enqueue(&quit_line);
                }
            }
            self.nicks.release(&nick);
        }

        let mut promotions: Vec<(String, Handle)> = Vec::new();
        let mut empties: Vec<String> = Vec::new();
        for (name, chan) in self.channels.iter_mut() {
            if chan.members.contains(&handle) {
                chan.remove_member(handle);
                if let Some(promoted) = chan.promote_if_needed() {
                    promotions.push((name.clone(), promoted));
                }
                if chan.is_empty() {
                    empties.push(name.clone());
                }
            }
        }

        for (chan_name, promoted_handle) in promotions {
            let promoted_nick = self
                .connections
                .get(&promoted_handle)
                .and_then(|c| c.registration.nick())
                .unwrap_or("")
                .to_string();
            let line = Message::new(
                "MODE",
                vec![chan_name.clone(), "+o".to_string(), promoted_nick],
            )
            .with_prefix(Prefix::Server(self.name.clone()));

            if let Some(chan) = self.channels.get(&chan_name) {
                let members: Vec<Handle> = chan.members.iter().copied().collect();
                for m in members {
                    if let Some(conn) = self.connections.get_mut(&m) {
                        conn.enqueue(&line);
                    }
                }
            }
        }

        for name in empties {
            self.channels.remove(&name);
        }

        self.connections.remove(&handle);
    }

    /// Sends `message` to every member of `chan_name` except `exclude`, if
    /// the channel exists.
    pub fn broadcast_to_channel(&mut self, chan_name: &str, message: &Message, exclude: Option<Handle>) {
        let Some(chan) = self.channels.get(chan_name) else {
            return;
        };
        let members: Vec<Handle> = chan.members.iter().copied().collect();
        for m in members {
            if Some(m) == exclude {
                continue;
            }
            if let Some(conn) = self.connections.get_mut(&m) {
                conn.enqueue(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(server: &mut Server, handle: Handle, nick: &str) {
        let mut conn = Connection::new(handle);
        conn.registration.set_password_accepted();
        conn.registration.set_nick(nick.to_string());
        conn.registration.set_user("u".into(), "R".into());
        conn.registration.try_complete();
        server.connections.insert(handle, conn);
        server.nicks.claim(nick, handle);
    }

    #[test]
    fn disconnect_promotes_and_broadcasts_quit_and_mode() {
        let mut server = Server::new("ircserv", "0.1", "pw");
        register(&mut server, 1, "alice");
        register(&mut server, 2, "bob");
        register(&mut server, 3, "carol");

        let mut chan = Channel::new();
        chan.members.extend([1, 2, 3]);
        chan.operators.insert(1);
        server.channels.insert("#dev".to_string(), chan);

        server.disconnect(1);

        assert!(!server.channels["#dev"].members.contains(&1));
        assert!(server.channels["#dev"].operators.contains(&2));
        assert_eq!(server.nicks.lookup("alice"), None);
        assert!(!server.connections.contains_key(&1));

        let bob_out = String::from_utf8(server.connections[&2].output.clone()).unwrap();
        assert!(bob_out.contains("QUIT :Client Quit"));
        assert!(bob_out.contains("MODE #dev +o bob"));
    }

    #[test]
    fn disconnect_destroys_channel_left_empty() {
        let mut server = Server::new("ircserv", "0.1", "pw");
        register(&mut server, 1, "alice");
        let mut chan = Channel::new();
        chan.members.insert(1);
        chan.operators.insert(1);
        server.channels.insert("#solo".to_string(), chan);

        server.disconnect(1);
        assert!(!server.channels.contains_key("#solo"));
    }
}

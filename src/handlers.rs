//! Verb handlers: the protocol semantics behind each IRC command this
//! server understands.

use crate::channel::Channel;
use crate::message::Message;
use crate::mode;
use crate::prefix::Prefix;
use crate::response;
use crate::server::{Handle, Server};

/// The nickname (or `*` if none yet) used as the target of a numeric
/// reply to `handle`.
fn client_display(server: &Server, handle: Handle) -> String {
    server
        .connections
        .get(&handle)
        .and_then(|c| c.registration.nick())
        .unwrap_or("*")
        .to_string()
}

fn send(server: &mut Server, handle: Handle, message: Message) {
    if let Some(conn) = server.connections.get_mut(&handle) {
        conn.enqueue(&message);
    }
}

/// Attempts to complete registration for `handle`; on success, enqueues
/// the 001-004 welcome burst.
fn try_complete_registration(server: &mut Server, handle: Handle) {
    let completed = match server.connections.get_mut(&handle) {
        Some(conn) => conn.registration.try_complete(),
        None => false,
    };
    if !completed {
        return;
    }
    let nick = server
        .connections
        .get(&handle)
        .and_then(|c| c.registration.nick())
        .unwrap_or("")
        .to_string();
    let msgs = [
        response::welcome(&server.name, &nick),
        response::yourhost(&server.name, &server.version, &nick),
        response::created(&server.name, &nick),
        response::myinfo(&server.name, &server.version, &nick),
    ];
    if let Some(conn) = server.connections.get_mut(&handle) {
        for m in &msgs {
            conn.enqueue(m);
        }
    }
}

pub fn handle_cap(server: &mut Server, handle: Handle, msg: &Message) {
    let Some(sub) = msg.params.first() else {
        return;
    };
    if sub.eq_ignore_ascii_case("LS") {
        let reply = Message::new("CAP", vec!["*".to_string(), "LS".to_string(), String::new()])
            .with_prefix(Prefix::Server(server.name.clone()));
        send(server, handle, reply);
    }
    // CAP END and anything else is silently ignored.
}

pub fn handle_pass(server: &mut Server, handle: Handle, msg: &Message) {
    let already_registered = server
        .connections
        .get(&handle)
        .map(|c| c.registration.is_registered())
        .unwrap_or(false);
    if already_registered {
        return;
    }
    let Some(given) = msg.params.first() else {
        let client = client_display(server, handle);
        send(server, handle, response::err_needmoreparams(&server.name, &client, "PASS"));
        return;
    };
    if *given != server.password {
        let client = client_display(server, handle);
        send(server, handle, response::err_passwdmismatch(&server.name, &client));
        if let Some(conn) = server.connections.get_mut(&handle) {
            conn.request_close();
        }
        return;
    }
    if let Some(conn) = server.connections.get_mut(&handle) {
        conn.registration.set_password_accepted();
    }
    try_complete_registration(server, handle);
}

pub fn handle_nick(server: &mut Server, handle: Handle, msg: &Message) {
    let new_nick = msg.params.first().cloned().unwrap_or_default();
    if new_nick.is_empty() {
        let client = client_display(server, handle);
        send(server, handle, response::err_nonicknamegiven(&server.name, &client));
        return;
    }
    if server.nicks.is_taken_by_other(&new_nick, handle) {
        let client = client_display(server, handle);
        send(server, handle, response::err_nicknameinuse(&server.name, &client, &new_nick));
        return;
    }
    let old_nick = server
        .connections
        .get(&handle)
        .and_then(|c| c.registration.nick())
        .map(|s| s.to_string());
    if let Some(old) = &old_nick {
        server.nicks.release(old);
    }
    server.nicks.claim(&new_nick, handle);
    if let Some(conn) = server.connections.get_mut(&handle) {
        conn.registration.set_nick(new_nick);
    }
    try_complete_registration(server, handle);
}

pub fn handle_user(server: &mut Server, handle: Handle, msg: &Message) {
    let already_registered = server
        .connections
        .get(&handle)
        .map(|c| c.registration.is_registered())
        .unwrap_or(false);
    if already_registered {
        return;
    }
    if msg.params.len() < 4 {
        let client = client_display(server, handle);
        send(server, handle, response::err_needmoreparams(&server.name, &client, "USER"));
        return;
    }
    let user = msg.params[0].clone();
    let realname = msg.params[3].clone();
    if let Some(conn) = server.connections.get_mut(&handle) {
        conn.registration.set_user(user, realname);
    }
    try_complete_registration(server, handle);
}

pub fn handle_ping(server: &mut Server, handle: Handle, msg: &Message) {
    let reply = match msg.params.first() {
        Some(token) => Message::new("PONG", vec![token.clone()]),
        None => Message::new("PONG", Vec::new()),
    }
    .with_prefix(Prefix::Server(server.name.clone()));
    send(server, handle, reply);
}

pub fn handle_privmsg(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    if msg.params.is_empty() {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "PRIVMSG"));
        return;
    }
    if msg.params.len() == 1 {
        send(server, handle, response::err_norecipient(&server.name, &client, "PRIVMSG"));
        return;
    }
    let target = msg.params[0].clone();
    let text = msg.params[1].clone();
    if text.is_empty() {
        send(server, handle, response::err_notexttosend(&server.name, &client));
        return;
    }

    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();
    let line = Message::new("PRIVMSG", vec![target.clone(), text]).with_prefix(Prefix::parse(&prefix));

    if let Some(chan_name) = target.strip_prefix('#').map(|_| target.clone()) {
        let Some(chan) = server.channels.get(&chan_name) else {
            send(server, handle, response::err_nosuchchannel(&server.name, &client, &chan_name));
            return;
        };
        if !chan.members.contains(&handle) {
            send(server, handle, response::err_cannotsendtochan(&server.name, &client, &chan_name));
            return;
        }
        server.broadcast_to_channel(&chan_name, &line, Some(handle));
    } else {
        match server.nicks.lookup(&target) {
            Some(target_handle) => send(server, target_handle, line),
            None => send(server, handle, response::err_nosuchnick(&server.name, &client, &target)),
        }
    }
}

pub fn handle_join(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    let Some(name) = msg.params.first().cloned() else {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "JOIN"));
        return;
    };
    if !name.starts_with('#') || name.len() < 2 {
        send(server, handle, response::err_badchanname(&server.name, &client, &name));
        return;
    }
    let given_key = msg.params.get(1).cloned();

    let is_new = !server.channels.contains_key(&name);
    if !is_new {
        let chan = server.channels.get(&name).unwrap();
        if chan.members.contains(&handle) {
            return;
        }
        if chan.invite_only && !chan.invited.contains(&handle) {
            send(server, handle, response::err_inviteonlychan(&server.name, &client, &name));
            return;
        }
        if let Some(key) = &chan.key {
            if given_key.as_deref() != Some(key.as_str()) {
                send(server, handle, response::err_badchannelkey(&server.name, &client, &name));
                return;
            }
        }
        if let Some(limit) = chan.user_limit {
            if chan.members.len() >= limit {
                send(server, handle, response::err_channelisfull(&server.name, &client, &name));
                return;
            }
        }
    }

    let chan = server.channels.entry(name.clone()).or_insert_with(Channel::new);
    chan.invited.remove(&handle);
    chan.members.insert(handle);
    if is_new {
        chan.operators.insert(handle);
    }
    let topic = chan.topic.clone();
    let operators = chan.operators.clone();
    let members: Vec<Handle> = chan.members.iter().copied().collect();

    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();
    let join_line = Message::new("JOIN", vec![name.clone()]).with_prefix(Prefix::parse(&prefix));
    for &m in &members {
        send(server, m, join_line.clone());
    }

    if topic.is_empty() {
        send(server, handle, response::notopic(&server.name, &client, &name));
    } else {
        send(server, handle, response::topic(&server.name, &client, &name, &topic));
    }

    let names: Vec<String> = members
        .iter()
        .map(|m| {
            let nick = server
                .connections
                .get(m)
                .and_then(|c| c.registration.nick())
                .unwrap_or("")
                .to_string();
            if operators.contains(m) {
                format!("@{nick}")
            } else {
                nick
            }
        })
        .collect();
    send(server, handle, response::namreply(&server.name, &client, &name, &names.join(" ")));
    send(server, handle, response::endofnames(&server.name, &client, &name));
}

pub fn handle_topic(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    let Some(name) = msg.params.first().cloned() else {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "TOPIC"));
        return;
    };
    let Some(chan) = server.channels.get(&name) else {
        send(server, handle, response::err_nosuchchannel(&server.name, &client, &name));
        return;
    };
    if !chan.members.contains(&handle) {
        send(server, handle, response::err_notonchannel(&server.name, &client, &name));
        return;
    }

    if msg.params.len() < 2 {
        let topic = chan.topic.clone();
        if topic.is_empty() {
            send(server, handle, response::notopic(&server.name, &client, &name));
        } else {
            send(server, handle, response::topic(&server.name, &client, &name, &topic));
        }
        return;
    }

    if chan.topic_ops_only && !chan.is_operator(handle) {
        send(server, handle, response::err_chanoprivsneeded(&server.name, &client, &name));
        return;
    }

    let new_topic = msg.params[1].clone();
    server.channels.get_mut(&name).unwrap().topic = new_topic.clone();

    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();
    let line = Message::new("TOPIC", vec![name.clone(), new_topic]).with_prefix(Prefix::parse(&prefix));
    server.broadcast_to_channel(&name, &line, None);
}

pub fn handle_mode(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    let Some(name) = msg.params.first().cloned() else {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "MODE"));
        return;
    };
    if !server.channels.contains_key(&name) {
        send(server, handle, response::err_nosuchchannel(&server.name, &client, &name));
        return;
    }

    if msg.params.len() == 1 {
        let chan = &server.channels[&name];
        let (modes, params) = chan.mode_query();
        send(server, handle, response::channelmodeis(&server.name, &client, &name, &modes, params));
        return;
    }

    if !server.channels[&name].is_operator(handle) {
        send(server, handle, response::err_chanoprivsneeded(&server.name, &client, &name));
        return;
    }

    let mode_string = msg.params[1].clone();
    let extra: Vec<String> = msg.params[2..].to_vec();
    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();

    let mut chan = server.channels.remove(&name).unwrap();
    let result = mode::apply(server, &mut chan, &name, &mode_string, &extra, &prefix);
    server.channels.insert(name.clone(), chan);

    for err in result.errors {
        send(server, handle, err);
    }
    if let Some(broadcast_line) = result.broadcast {
        let line = Message::parse(&broadcast_line);
        server.broadcast_to_channel(&name, &line, None);
    }
}

pub fn handle_invite(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    if msg.params.len() < 2 {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "INVITE"));
        return;
    }
    let target_nick = msg.params[0].clone();
    let chan_name = msg.params[1].clone();

    let Some(chan) = server.channels.get(&chan_name) else {
        send(server, handle, response::err_nosuchchannel(&server.name, &client, &chan_name));
        return;
    };
    if !chan.members.contains(&handle) {
        send(server, handle, response::err_notonchannel(&server.name, &client, &chan_name));
        return;
    }
    if !chan.is_operator(handle) {
        send(server, handle, response::err_chanoprivsneeded(&server.name, &client, &chan_name));
        return;
    }
    let Some(target_handle) = server.nicks.lookup(&target_nick) else {
        send(server, handle, response::err_nosuchnick(&server.name, &client, &target_nick));
        return;
    };
    if chan.members.contains(&target_handle) {
        send(server, handle, response::err_useronchannel(&server.name, &client, &target_nick, &chan_name));
        return;
    }

    server.channels.get_mut(&chan_name).unwrap().invited.insert(target_handle);

    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();
    let invite_line = Message::new("INVITE", vec![target_nick.clone(), chan_name.clone()])
        .with_prefix(Prefix::parse(&prefix));
    send(server, target_handle, invite_line);
    send(server, handle, response::inviting(&server.name, &client, &target_nick, &chan_name));
}

pub fn handle_kick(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    if msg.params.len() < 2 {
        send(server, handle, response::err_needmoreparams(&server.name, &client, "KICK"));
        return;
    }
    let chan_name = msg.params[0].clone();
    let target_nick = msg.params[1].clone();
    let reason = msg.params.get(2).cloned().unwrap_or_else(|| "Kicked".to_string());

    let Some(chan) = server.channels.get(&chan_name) else {
        send(server, handle, response::err_nosuchchannel(&server.name, &client, &chan_name));
        return;
    };
    if !chan.members.contains(&handle) {
        send(server, handle, response::err_notonchannel(&server.name, &client, &chan_name));
        return;
    }
    if !chan.is_operator(handle) {
        send(server, handle, response::err_chanoprivsneeded(&server.name, &client, &chan_name));
        return;
    }
    let Some(target_handle) = server.nicks.lookup(&target_nick) else {
        send(server, handle, response::err_nosuchnick(&server.name, &client, &target_nick));
        return;
    };
    if !chan.members.contains(&target_handle) {
        send(server, handle, response::err_usernotinchannel(&server.name, &client, &target_nick, &chan_name));
        return;
    }

    let prefix = server
        .connections
        .get(&handle)
        .map(|c| c.display_prefix())
        .unwrap_or_default();
    let kick_line = Message::new("KICK", vec![chan_name.clone(), target_nick.clone(), reason])
        .with_prefix(Prefix::parse(&prefix));
    server.broadcast_to_channel(&chan_name, &kick_line, None);

    let mut promoted = None;
    if let Some(chan) = server.channels.get_mut(&chan_name) {
        chan.remove_member(target_handle);
        if chan.is_empty() {
            server.channels.remove(&chan_name);
            return;
        }
        promoted = chan.promote_if_needed();
    }
    if let Some(promoted_handle) = promoted {
        let promoted_nick = server
            .connections
            .get(&promoted_handle)
            .and_then(|c| c.registration.nick())
            .unwrap_or("")
            .to_string();
        let line = Message::new("MODE", vec![chan_name.clone(), "+o".to_string(), promoted_nick])
            .with_prefix(Prefix::Server(server.name.clone()));
        server.broadcast_to_channel(&chan_name, &line, None);
    }
}

pub fn handle_who(server: &mut Server, handle: Handle, msg: &Message) {
    let client = client_display(server, handle);
    let mask = msg.params.first().cloned().unwrap_or_else(|| "*".to_string());
    if let Some(chan_name) = mask.strip_prefix('#').map(|_| mask.clone()) {
        if let Some(chan) = server.channels.get(&chan_name) {
            let members: Vec<Handle> = chan.members.iter().copied().collect();
            for m in members {
                if let Some(conn) = server.connections.get(&m) {
                    let member_nick = conn.registration.nick().unwrap_or("").to_string();
                    let user = conn.registration.user().unwrap_or("user").to_string();
                    let realname = conn.registration.realname().filter(|r| !r.is_empty());
                    let realname = realname.unwrap_or(&member_nick).to_string();
                    send(server, handle, response::whoreply(&server.name, &client, &mask, &user, &member_nick, &realname));
                }
            }
        }
    }
    send(server, handle, response::endofwho(&server.name, &client, &mask));
}

pub fn handle_quit(server: &mut Server, handle: Handle, _msg: &Message) {
    if let Some(conn) = server.connections.get_mut(&handle) {
        conn.request_close();
    }
}

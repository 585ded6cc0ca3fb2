//! Per-connection state: the registration handshake, I/O buffers, and the
//! deferred-close flag.

use crate::message::Message;
use crate::server::Handle;

/// Registration progresses from `Pending` (any subset of `PASS`/`NICK`/
/// `USER` accepted, in whatever order the client sent them) to
/// `Registered` once all three are present. The transition is one-way:
/// once `Registered`, a connection never reverts.
///
/// A stricter linear variant (`Unauthed -> PassOk -> NickOk -> UserOk ->
/// Registered`) was considered, but the wire protocol accepts `PASS`,
/// `NICK`, and `USER` in any order, so the three sub-fields of `Pending`
/// fill independently rather than in a fixed sequence.
#[derive(Debug, Clone)]
pub enum RegistrationState {
    Pending {
        password_accepted: bool,
        nick: Option<String>,
        user: Option<(String, String)>,
    },
    Registered {
        nick: String,
        user: String,
        realname: String,
    },
}

impl Default for RegistrationState {
    fn default() -> Self {
        RegistrationState::Pending {
            password_accepted: false,
            nick: None,
            user: None,
        }
    }
}

impl RegistrationState {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationState::Registered { .. })
    }

    pub fn password_accepted(&self) -> bool {
        match self {
            RegistrationState::Pending { password_accepted, .. } => *password_accepted,
            RegistrationState::Registered { .. } => true,
        }
    }

    pub fn nick(&self) -> Option<&str> {
        match self {
            RegistrationState::Pending { nick, .. } => nick.as_deref(),
            RegistrationState::Registered { nick, .. } => Some(nick),
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            RegistrationState::Pending { user, .. } => user.as_ref().map(|(u, _)| u.as_str()),
            RegistrationState::Registered { user, .. } => Some(user),
        }
    }

    pub fn realname(&self) -> Option<&str> {
        match self {
            RegistrationState::Pending { user, .. } => user.as_ref().map(|(_, r)| r.as_str()),
            RegistrationState::Registered { realname, .. } => Some(realname),
        }
    }

    pub fn set_password_accepted(&mut self) {
        if let RegistrationState::Pending { password_accepted, .. } = self {
            *password_accepted = true;
        }
    }

    /// Sets the nickname, whether or not registration has completed yet —
    /// `NICK` is valid both before and after registration.
    pub fn set_nick(&mut self, new_nick: String) {
        match self {
            RegistrationState::Pending { nick, .. } => *nick = Some(new_nick),
            RegistrationState::Registered { nick, .. } => *nick = new_nick,
        }
    }

    pub fn set_user(&mut self, user: String, realname: String) {
        if let RegistrationState::Pending { user: slot, .. } = self {
            *slot = Some((user, realname));
        }
    }

    /// Transitions to `Registered` if every precondition is now met.
    /// Returns `true` exactly when the transition happened on this call.
    pub fn try_complete(&mut self) -> bool {
        if let RegistrationState::Pending {
            password_accepted: true,
            nick: Some(nick),
            user: Some((user, realname)),
        } = self
        {
            let nick = nick.clone();
            let user = user.clone();
            let realname = realname.clone();
            *self = RegistrationState::Registered {
                nick,
                user,
                realname,
            };
            true
        } else {
            false
        }
    }
}

/// A single accepted TCP client: registration progress, framing buffers,
/// and the deferred-close flag.
#[derive(Debug)]
pub struct Connection {
    pub handle: Handle,
    pub registration: RegistrationState,
    /// Set when the connection must be severed once `output` drains.
    pub closing: bool,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
    /// Whether the event loop currently has write-interest registered.
    pub write_interest: bool,
}

impl Connection {
    pub fn new(handle: Handle) -> Connection {
        Connection {
            handle,
            registration: RegistrationState::default(),
            closing: false,
            input: Vec::new(),
            output: Vec::new(),
            write_interest: false,
        }
    }

    /// Appends `message` plus a `\r\n` terminator to the output buffer.
    pub fn enqueue(&mut self, message: &Message) {
        self.output.extend_from_slice(message.to_string().as_bytes());
        self.output.extend_from_slice(b"\r\n");
    }

    /// Marks the connection for destruction once its output buffer drains
    /// (the deferred-close pattern). If the buffer is already empty, the
    /// caller should destroy it immediately instead of waiting on a flush
    /// that will never be triggered.
    pub fn request_close(&mut self) {
        self.closing = true;
    }

    /// The display name used in this connection's own synthesized prefix,
    /// `nick!user@localhost`, falling back to the literal `user` ident
    /// when none has been supplied yet.
    pub fn display_prefix(&self) -> String {
        let nick = self.registration.nick().unwrap_or("*");
        let user = self.registration.user().unwrap_or("user");
        user_prefix(nick, user)
    }
}

/// Synthesizes a client prefix string: `nick!user@localhost`.
pub fn user_prefix(nick: &str, user: &str) -> String {
    let user = if user.is_empty() { "user" } else { user };
    format!("{nick}!{user}@localhost")
}

//! Channel state: membership, operators, invites, topic, and mode flags.

use crate::server::Handle;
use std::collections::BTreeSet;

/// A named multi-party room. Created implicitly on first successful `JOIN`,
/// destroyed when its last member departs.
#[derive(Debug, Default)]
pub struct Channel {
    pub members: BTreeSet<Handle>,
    pub operators: BTreeSet<Handle>,
    pub invited: BTreeSet<Handle>,
    pub topic: String,
    pub invite_only: bool,
    pub topic_ops_only: bool,
    pub key: Option<String>,
    pub user_limit: Option<usize>,
}

impl Channel {
    pub fn new() -> Channel {
        Channel::default()
    }

    /// Removes `handle` from every per-member set. If an operator departs
    /// and members remain, the caller is responsible for invoking
    /// [`Channel::promote_if_needed`] afterward.
    pub fn remove_member(&mut self, handle: Handle) {
        self.members.remove(&handle);
        self.operators.remove(&handle);
        self.invited.remove(&handle);
    }

    /// If the channel has members but no operator, promotes the
    /// smallest-handle member and returns it. Returns `None` if no
    /// promotion was necessary (or no members remain).
    pub fn promote_if_needed(&mut self) -> Option<Handle> {
        if self.operators.is_empty() {
            if let Some(&smallest) = self.members.iter().next() {
                self.operators.insert(smallest);
                return Some(smallest);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_operator(&self, handle: Handle) -> bool {
        self.operators.contains(&handle)
    }

    /// The channel's current mode-flag string and any parameters, for the
    /// bare `MODE #chan` query reply: `+` followed by `i`, `t`, `l` as
    /// applicable, with the limit value (if set) appended as a parameter.
    pub fn mode_query(&self) -> (String, Vec<String>) {
        let mut modes = String::from("+");
        let mut params = Vec::new();
        if self.invite_only {
            modes.push('i');
        }
        if self.topic_ops_only {
            modes.push('t');
        }
        if let Some(limit) = self.user_limit {
            modes.push('l');
            params.push(limit.to_string());
        }
        (modes, params)
    }
}

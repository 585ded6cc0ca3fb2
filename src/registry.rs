//! Bidirectional nickname ↔ connection mapping.

use crate::server::Handle;
use std::collections::HashMap;

/// Outcome of attempting to claim a nickname.
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimResult {
    Ok,
    TakenByOther,
}

/// Maps nicknames to connection handles, injectively: no two connections
/// may hold the same nickname at once.
#[derive(Debug, Default)]
pub struct NickRegistry {
    by_nick: HashMap<String, Handle>,
}

impl NickRegistry {
    pub fn new() -> NickRegistry {
        NickRegistry::default()
    }

    /// Attempts to claim `nick` for `handle`. Claiming a nick already held
    /// by `handle` itself is a no-op success (re-claiming doesn't happen in
    /// practice since handlers release before claiming, but this keeps the
    /// operation total).
    pub fn claim(&mut self, nick: &str, handle: Handle) -> ClaimResult {
        match self.by_nick.get(nick) {
            Some(&owner) if owner != handle => ClaimResult::TakenByOther,
            _ => {
                self.by_nick.insert(nick.to_string(), handle);
                ClaimResult::Ok
            }
        }
    }

    pub fn release(&mut self, nick: &str) {
        self.by_nick.remove(nick);
    }

    pub fn lookup(&self, nick: &str) -> Option<Handle> {
        self.by_nick.get(nick).copied()
    }

    pub fn is_taken_by_other(&self, nick: &str, handle: Handle) -> bool {
        matches!(self.by_nick.get(nick), Some(&owner) if owner != handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_then_lookup_round_trips() {
        let mut reg = NickRegistry::new();
        assert_eq!(reg.claim("alice", 5), ClaimResult::Ok);
        assert_eq!(reg.lookup("alice"), Some(5));
    }

    #[test]
    fn claim_by_different_handle_is_rejected() {
        let mut reg = NickRegistry::new();
        reg.claim("bob", 1);
        assert_eq!(reg.claim("bob", 2), ClaimResult::TakenByOther);
        assert_eq!(reg.lookup("bob"), Some(1));
    }

    #[test]
    fn release_then_reclaim_by_another_handle_succeeds() {
        let mut reg = NickRegistry::new();
        reg.claim("carol", 1);
        reg.release("carol");
        assert_eq!(reg.claim("carol", 2), ClaimResult::Ok);
    }

    #[test]
    fn injective_across_distinct_nicks() {
        let mut reg = NickRegistry::new();
        reg.claim("a", 1);
        reg.claim("b", 2);
        assert_eq!(reg.lookup("a"), Some(1));
        assert_eq!(reg.lookup("b"), Some(2));
    }
}

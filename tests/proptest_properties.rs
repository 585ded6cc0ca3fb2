//! Property-based tests for message framing/parsing and mode application.

use proptest::prelude::*;
use slircd::channel::Channel;
use slircd::mode;
use slircd::server::Server;
use slircd::Message;

// =============================================================================
// STRATEGIES
// =============================================================================

fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]{1,12}").expect("valid regex")
}

fn trailing_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,100}").expect("valid regex")
}

fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("PRIVMSG".to_string()),
        Just("JOIN".to_string()),
        Just("NICK".to_string()),
        Just("TOPIC".to_string()),
        Just("PING".to_string()),
    ]
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (command_strategy(), prop::collection::vec(word_strategy(), 0..3), trailing_text_strategy()).prop_map(
        |(command, middles, trailing)| {
            let mut params = middles;
            params.push(trailing);
            Message::new(command, params)
        },
    )
}

fn mode_letter_strategy() -> impl Strategy<Value = char> {
    prop_oneof![Just('i'), Just('t'), Just('k'), Just('l'), Just('o')]
}

fn mode_string_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec((prop::bool::ANY, mode_letter_strategy()), 1..6).prop_map(|toggles| {
        toggles
            .into_iter()
            .map(|(plus, letter)| format!("{}{}", if plus { '+' } else { '-' }, letter))
            .collect::<Vec<_>>()
            .join("")
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Serializing a message and parsing it back yields the same command
    /// and parameter tuple, for any well-formed command/params combination.
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let serialized = msg.to_string();
        let reparsed = Message::parse(&serialized);
        prop_assert_eq!(msg.command, reparsed.command);
        prop_assert_eq!(msg.params, reparsed.params);
    }

    /// Parsing never panics, whatever bytes-as-text arrive on the wire.
    #[test]
    fn parse_never_panics_on_arbitrary_text(line in "[^\r\n]{0,200}") {
        let _ = Message::parse(&line);
    }

    /// Applying the same mode string twice in a row is idempotent: the
    /// second application reports no change.
    #[test]
    fn repeated_mode_application_is_idempotent(modes in mode_string_strategy()) {
        let server = Server::new("ircserv", "0.1", "unused");
        let mut chan = Channel::new();
        let _ = mode::apply(&server, &mut chan, "#dev", &modes, &[], "alice!a@localhost");
        let second = mode::apply(&server, &mut chan, "#dev", &modes, &[], "alice!a@localhost");
        prop_assert!(!second.any_change);
        prop_assert_eq!(second.applied_modes, String::new());
    }
}

//! Channel mode parsing and application.
//!
//! The five supported mode letters (`i`, `t`, `k`, `l`, `o`) and the engine
//! that applies a mode-change request to a [`crate::channel::Channel`],
//! producing the canonical "applied" mode string used for the broadcast.

use crate::channel::Channel;
use crate::response::{self, Response};
use crate::server::Server;

/// One of the five mode letters this server understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    InviteOnly,
    TopicOpsOnly,
    Key,
    Limit,
    Op,
}

impl ChannelMode {
    fn from_char(c: char) -> Option<ChannelMode> {
        match c {
            'i' => Some(ChannelMode::InviteOnly),
            't' => Some(ChannelMode::TopicOpsOnly),
            'k' => Some(ChannelMode::Key),
            'l' => Some(ChannelMode::Limit),
            'o' => Some(ChannelMode::Op),
            _ => None,
        }
    }

    fn letter(&self) -> char {
        match self {
            ChannelMode::InviteOnly => 'i',
            ChannelMode::TopicOpsOnly => 't',
            ChannelMode::Key => 'k',
            ChannelMode::Limit => 'l',
            ChannelMode::Op => 'o',
        }
    }
}

/// The outcome of applying a mode-change request.
#[derive(Debug, Default)]
pub struct ModeResult {
    pub any_change: bool,
    pub applied_modes: String,
    pub applied_params: Vec<String>,
    /// Numeric-reply messages to send back to the requester (errors
    /// encountered mid-scan do not abort the whole result).
    pub errors: Vec<crate::message::Message>,
    /// The broadcast line to fan out to the channel, if any change occurred.
    pub broadcast: Option<String>,
}

/// Parses a non-negative decimal integer with no sign, matching the
/// original implementation's hand-rolled digit scan: empty strings and any
/// non-digit character are rejected, and overflow is detected during the
/// multiply-and-add rather than relying on a library parse that might
/// accept a leading `+`.
fn parse_positive_usize(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    let mut value: usize = 0;
    for c in s.chars() {
        if !c.is_ascii_digit() {
            return None;
        }
        let digit = (c as u8 - b'0') as usize;
        value = value.checked_mul(10)?.checked_add(digit)?;
    }
    Some(value)
}

fn append_mode_char(out: &mut String, current_sign: &mut Option<char>, adding: bool, letter: char) {
    let sign = if adding { '+' } else { '-' };
    if out.is_empty() || *current_sign != Some(sign) {
        out.push(sign);
        *current_sign = Some(sign);
    }
    out.push(letter);
}

/// Applies `mode_string` (with any trailing params in `extra`) to `channel`,
/// on behalf of `requester_nick`/`requester_display` (used only to address
/// numeric-reply errors, never for authorization — the caller already
/// checked operator status before calling in).
pub fn apply(
    server: &Server,
    channel: &mut Channel,
    chan_name: &str,
    mode_string: &str,
    extra: &[String],
    client_display: &str,
) -> ModeResult {
    let mut result = ModeResult::default();
    let mut adding = true;
    let mut current_sign: Option<char> = None;
    let mut argi = 0usize;

    for m in mode_string.chars() {
        match m {
            '+' => {
                adding = true;
                continue;
            }
            '-' => {
                adding = false;
                continue;
            }
            _ => {}
        }

        let Some(mode) = ChannelMode::from_char(m) else {
            result
                .errors
                .push(response::err_unknownmode(&server.name, client_display, m));
            continue;
        };

        match mode {
            ChannelMode::InviteOnly => {
                if channel.invite_only != adding {
                    channel.invite_only = adding;
                    append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'i');
                    result.any_change = true;
                }
            }
            ChannelMode::TopicOpsOnly => {
                if channel.topic_ops_only != adding {
                    channel.topic_ops_only = adding;
                    append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 't');
                    result.any_change = true;
                }
            }
            ChannelMode::Key => {
                if adding {
                    if argi >= extra.len() {
                        result.errors.push(response::err_needmoreparams(
                            &server.name,
                            client_display,
                            "MODE",
                        ));
                        break;
                    }
                    let new_key = extra[argi].clone();
                    argi += 1;
                    let changed = channel.key.as_deref() != Some(new_key.as_str());
                    channel.key = Some(new_key);
                    if changed {
                        append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'k');
                        result.any_change = true;
                    }
                } else if channel.key.is_some() {
                    channel.key = None;
                    append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'k');
                    result.any_change = true;
                }
            }
            ChannelMode::Limit => {
                if adding {
                    if argi >= extra.len() {
                        result.errors.push(response::err_needmoreparams(
                            &server.name,
                            client_display,
                            "MODE",
                        ));
                        break;
                    }
                    let lim_str = extra[argi].clone();
                    argi += 1;
                    let Some(limit) = parse_positive_usize(&lim_str) else {
                        result.errors.push(response::err_needmoreparams(
                            &server.name,
                            client_display,
                            "MODE",
                        ));
                        continue;
                    };
                    let changed = channel.user_limit != Some(limit);
                    channel.user_limit = Some(limit);
                    if changed {
                        append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'l');
                        result.applied_params.push(lim_str);
                        result.any_change = true;
                    }
                } else if channel.user_limit.is_some() {
                    channel.user_limit = None;
                    append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'l');
                    result.any_change = true;
                }
            }
            ChannelMode::Op => {
                if argi >= extra.len() {
                    result.errors.push(response::err_needmoreparams(
                        &server.name,
                        client_display,
                        "MODE",
                    ));
                    break;
                }
                let nick_arg = extra[argi].clone();
                argi += 1;
                let Some(target_handle) = server.nicks.lookup(&nick_arg) else {
                    result
                        .errors
                        .push(response::err_nosuchnick(&server.name, client_display, &nick_arg));
                    continue;
                };
                if !channel.members.contains(&target_handle) {
                    result.errors.push(response::err_usernotinchannel(
                        &server.name,
                        client_display,
                        &nick_arg,
                        chan_name,
                    ));
                    continue;
                }
                let changed = if adding {
                    channel.operators.insert(target_handle)
                } else {
                    channel.operators.remove(&target_handle)
                };
                if changed {
                    append_mode_char(&mut result.applied_modes, &mut current_sign, adding, 'o');
                    result.applied_params.push(nick_arg);
                    result.any_change = true;
                }
            }
        }
    }

    if result.any_change {
        let mut line = format!(":{client_display} MODE {chan_name} {}", result.applied_modes);
        for p in &result.applied_params {
            line.push(' ');
            line.push_str(p);
        }
        result.broadcast = Some(line);
    }

    result
}

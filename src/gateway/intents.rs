use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::GatewayError;

/// All valid intent names, in bit order.
pub const ALL_INTENTS: &[&str] = &[
    "spaces",
    "moderation",
    "emojis",
    "voice_states",
    "messages",
    "message_reactions",
    "message_typing",
    "direct_messages",
    "dm_reactions",
    "dm_typing",
    "scheduled_events",
    // Privileged
    "members",
    "presences",
    "message_content",
];

pub const PRIVILEGED_INTENTS: &[&str] = &["members", "presences", "message_content"];

/// Bitmask of subscribed event categories. Bit `n` is `ALL_INTENTS[n]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Intents(u32);

impl Intents {
    pub const NONE: Intents = Intents(0);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Mask from raw bits; bits with no known intent are rejected.
    pub fn from_bits(bits: u32) -> Result<Self, GatewayError> {
        let known = Self::all().0;
        if bits & !known != 0 {
            return Err(GatewayError::Configuration(format!(
                "unknown intent bits: {:#x}",
                bits & !known
            )));
        }
        Ok(Self(bits))
    }

    pub fn all() -> Self {
        Self((1u32 << ALL_INTENTS.len()) - 1)
    }

    /// Every intent that does not need to be enabled server-side.
    pub fn non_privileged() -> Self {
        let privileged = Self::from_names(PRIVILEGED_INTENTS).unwrap_or_default();
        Self(Self::all().0 & !privileged.0)
    }

    pub fn named(name: &str) -> Option<Self> {
        ALL_INTENTS
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name.trim()))
            .map(|idx| Self(1 << idx))
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, GatewayError> {
        let mut intents = Self::NONE;
        for name in names {
            let name = name.as_ref();
            intents |= Self::named(name).ok_or_else(|| {
                GatewayError::Configuration(format!("unknown intent: {name}"))
            })?;
        }
        Ok(intents)
    }

    pub fn contains(&self, other: Intents) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_privileged(&self) -> bool {
        PRIVILEGED_INTENTS
            .iter()
            .filter_map(|name| Self::named(name))
            .any(|i| self.contains(i))
    }

    /// Names in bit order, as IDENTIFY carries them.
    pub fn names(&self) -> Vec<String> {
        ALL_INTENTS
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.0 & (1 << idx) != 0)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

impl BitOr for Intents {
    type Output = Intents;

    fn bitor(self, rhs: Self) -> Self::Output {
        Intents(self.0 | rhs.0)
    }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

/// Map an event type to its required intent.
pub fn intent_for_event(event_type: &str) -> Option<&'static str> {
    match event_type {
        "message.create" | "message.update" | "message.delete" | "message.delete_bulk" => {
            Some("messages")
        }
        "member.join" | "member.leave" | "member.update" | "member.chunk" => Some("members"),
        "space.create" | "space.update" | "space.delete" => Some("spaces"),
        "channel.create" | "channel.update" | "channel.delete" | "channel.pins_update" => {
            Some("spaces")
        }
        "role.create" | "role.update" | "role.delete" => Some("spaces"),
        "reaction.add" | "reaction.remove" | "reaction.clear" | "reaction.clear_emoji" => {
            Some("message_reactions")
        }
        "typing.start" => Some("message_typing"),
        "presence.update" => Some("presences"),
        "voice.state_update" | "voice.server_update" => Some("voice_states"),
        "ban.create" | "ban.delete" => Some("moderation"),
        "invite.create" | "invite.delete" => Some("spaces"),
        "emoji.update" => Some("emojis"),
        _ => None,
    }
}

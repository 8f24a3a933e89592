use {
    serde::{Deserialize, Serialize},
    std::{cmp::Ordering, fmt, str::FromStr},
};

use crate::error::Error;

/// Rank of a user within a chat.
///
/// Ranks compare by [`weight`](Self::weight), not by declaration order, so a
/// new rank can be slotted between existing ones by choosing its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Banned,
    #[default]
    Newcomer,
    Familiar,
    Trusted,
    Moderator,
    Admin,
}

impl AccessLevel {
    pub const ALL: &'static [AccessLevel] = &[
        Self::Banned,
        Self::Newcomer,
        Self::Familiar,
        Self::Trusted,
        Self::Moderator,
        Self::Admin,
    ];

    #[must_use]
    pub const fn weight(self) -> i32 {
        match self {
            Self::Banned => -1,
            Self::Newcomer => 0,
            Self::Familiar => 1,
            Self::Trusted => 5,
            Self::Moderator => 7,
            Self::Admin => 10,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Banned => "banned",
            Self::Newcomer => "newcomer",
            Self::Familiar => "familiar",
            Self::Trusted => "trusted",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Whether a user holding `self` may use something that requires `required`.
    #[must_use]
    pub const fn permits(self, required: AccessLevel) -> bool {
        self.weight() >= required.weight()
    }

    #[must_use]
    pub const fn is_banned(self) -> bool {
        matches!(self, Self::Banned)
    }
}

impl PartialOrd for AccessLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccessLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight().cmp(&other.weight())
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccessLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| Error::unknown_access_level(s))
    }
}

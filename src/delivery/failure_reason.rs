use serde::{Deserialize, Serialize};
use std::fmt;

/// Predefined non-delivery reasons, numbered as the driver hears them
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RecipientAbsent,
    NoSafePlace,
    AccessDenied,
    AddressIncorrect,
    RecipientRefused,
    /// Requires a free-text detail
    Other,
}

impl FailureReason {
    pub const ALL: [Self; 6] = [
        Self::RecipientAbsent,
        Self::NoSafePlace,
        Self::AccessDenied,
        Self::AddressIncorrect,
        Self::RecipientRefused,
        Self::Other,
    ];

    /// Look up a reason by its spoken number (1..=6)
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::RecipientAbsent),
            2 => Some(Self::NoSafePlace),
            3 => Some(Self::AccessDenied),
            4 => Some(Self::AddressIncorrect),
            5 => Some(Self::RecipientRefused),
            6 => Some(Self::Other),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::RecipientAbsent => 1,
            Self::NoSafePlace => 2,
            Self::AccessDenied => 3,
            Self::AddressIncorrect => 4,
            Self::RecipientRefused => 5,
            Self::Other => 6,
        }
    }

    /// Human-readable description
    pub fn text(self) -> &'static str {
        match self {
            Self::RecipientAbsent => "the recipient was absent",
            Self::NoSafePlace => "no safe place to leave the package",
            Self::AccessDenied => "access not possible (closed door, intercom, secured building)",
            Self::AddressIncorrect => "address not found or incorrect",
            Self::RecipientRefused => "the recipient refused the delivery",
            Self::Other => "another reason",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

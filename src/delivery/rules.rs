use std::collections::BTreeSet;

use super::failure_reason::FailureReason;

/// Business rules for closing a delivery. No state of its own beyond the configured set
/// of reasons that need photo proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRules {
    photo_required: BTreeSet<FailureReason>,
}

impl DeliveryRules {
    pub fn new(photo_required: impl IntoIterator<Item = FailureReason>) -> Self {
        Self {
            photo_required: photo_required.into_iter().collect(),
        }
    }

    /// Does this failure reason require a photo?
    pub fn requires_photo(&self, reason: FailureReason) -> bool {
        self.photo_required.contains(&reason)
    }

    /// Does this reason need a free-text detail? Only "other" does.
    pub fn requires_detail(reason: FailureReason) -> bool {
        reason == FailureReason::Other
    }

    pub fn photo_required_reasons(&self) -> impl Iterator<Item = FailureReason> + '_ {
        self.photo_required.iter().copied()
    }
}

impl Default for DeliveryRules {
    /// Only an absent recipient needs photo proof of where the package was left
    fn default() -> Self {
        Self::new([FailureReason::RecipientAbsent])
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::failure_reason::FailureReason;
use super::rules::DeliveryRules;

/// What the app reported after asking the driver for a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoOutcome {
    Taken,
    NotTaken,
}

/// Final classification reported when a treatment finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryOutcome {
    Completed,
    CompletedWithPhoto,
    Failed,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithPhoto)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "COMPLETED"),
            Self::CompletedWithPhoto => write!(f, "COMPLETED_WITH_PHOTO"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Data collected while one delivery treatment is in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryContext {
    pub trip_id: String,
    pub address: String,
    pub completed: bool,
    pub failure_reason: Option<FailureReason>,
    /// Free-text detail, only for [`FailureReason::Other`]
    pub detail: Option<String>,
    pub photo: Option<PhotoOutcome>,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl DeliveryContext {
    pub fn new(trip_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            address: address.into(),
            completed: false,
            failure_reason: None,
            detail: None,
            photo: None,
            created_at: Utc::now(),
            finalized_at: None,
        }
    }

    /// Placeholder context held while no treatment has been started
    pub fn idle() -> Self {
        Self::new("", "")
    }

    pub fn outcome(&self) -> DeliveryOutcome {
        if self.completed {
            DeliveryOutcome::Completed
        } else if self.photo == Some(PhotoOutcome::Taken) {
            DeliveryOutcome::CompletedWithPhoto
        } else {
            DeliveryOutcome::Failed
        }
    }

    /// Detail text when given, otherwise the reason's fixed text
    pub fn failure_description(&self) -> Option<String> {
        self.detail
            .clone()
            .or_else(|| self.failure_reason.map(|reason| reason.text().to_string()))
    }

    /// Verify the context is consistent with the rules it was collected under
    pub fn check_invariants(&self, rules: &DeliveryRules) -> Result<(), String> {
        if self.completed
            && (self.failure_reason.is_some() || self.detail.is_some() || self.photo.is_some())
        {
            return Err(format!(
                "trip {} is marked completed but carries failure data",
                self.trip_id
            ));
        }

        if let Some(detail) = &self.detail {
            if self.failure_reason != Some(FailureReason::Other) {
                return Err(format!(
                    "detail text present for reason {:?}",
                    self.failure_reason
                ));
            }
            if detail.trim().is_empty() {
                return Err("detail text is blank".to_string());
            }
        }

        if self.photo.is_some() {
            match self.failure_reason {
                Some(reason) if rules.requires_photo(reason) => {}
                other => {
                    return Err(format!(
                        "photo outcome recorded for reason {other:?} which needs no photo"
                    ))
                }
            }
        }

        Ok(())
    }
}

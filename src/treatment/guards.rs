use std::sync::Arc;

use crate::delivery::{DeliveryContext, DeliveryRules, FailureReason};
use crate::state_machine::StateGuard;

use super::events::TreatmentEvent;

/// Reason carried by a `ReasonCode` event, if the code is in range
fn reason_of(event: &TreatmentEvent) -> Option<FailureReason> {
    match event {
        TreatmentEvent::ReasonCode(code) => FailureReason::from_code(*code),
        _ => None,
    }
}

fn detail_of(event: &TreatmentEvent) -> Option<&str> {
    match event {
        TreatmentEvent::ReasonDetailText(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

/// Guard for reason 6, which always asks for a detail before anything else
pub struct ReasonNeedsDetailGuard;

impl StateGuard<DeliveryContext, TreatmentEvent> for ReasonNeedsDetailGuard {
    fn check(&self, _context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        reason_of(event).is_some_and(DeliveryRules::requires_detail)
    }

    fn description(&self) -> &'static str {
        "Reason must require a free-text detail"
    }
}

/// Guard for an in-range reason that needs photo proof
pub struct ReasonNeedsPhotoGuard {
    rules: Arc<DeliveryRules>,
}

impl ReasonNeedsPhotoGuard {
    pub fn new(rules: Arc<DeliveryRules>) -> Self {
        Self { rules }
    }
}

impl StateGuard<DeliveryContext, TreatmentEvent> for ReasonNeedsPhotoGuard {
    fn check(&self, _context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        reason_of(event).is_some_and(|reason| {
            !DeliveryRules::requires_detail(reason) && self.rules.requires_photo(reason)
        })
    }

    fn description(&self) -> &'static str {
        "Reason must require a photo"
    }
}

/// Guard for an in-range reason that closes the treatment straight away
pub struct ReasonClosesGuard {
    rules: Arc<DeliveryRules>,
}

impl ReasonClosesGuard {
    pub fn new(rules: Arc<DeliveryRules>) -> Self {
        Self { rules }
    }
}

impl StateGuard<DeliveryContext, TreatmentEvent> for ReasonClosesGuard {
    fn check(&self, _context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        reason_of(event).is_some_and(|reason| {
            !DeliveryRules::requires_detail(reason) && !self.rules.requires_photo(reason)
        })
    }

    fn description(&self) -> &'static str {
        "Reason must need neither detail nor photo"
    }
}

/// Guard for a non-empty detail when the stored reason needs a photo
pub struct DetailNeedsPhotoGuard {
    rules: Arc<DeliveryRules>,
}

impl DetailNeedsPhotoGuard {
    pub fn new(rules: Arc<DeliveryRules>) -> Self {
        Self { rules }
    }
}

impl StateGuard<DeliveryContext, TreatmentEvent> for DetailNeedsPhotoGuard {
    fn check(&self, context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        detail_of(event).is_some()
            && context
                .failure_reason
                .is_some_and(|reason| self.rules.requires_photo(reason))
    }

    fn description(&self) -> &'static str {
        "Detail must be non-empty and the reason must require a photo"
    }
}

/// Guard for a non-empty detail
pub struct DetailProvidedGuard;

impl StateGuard<DeliveryContext, TreatmentEvent> for DetailProvidedGuard {
    fn check(&self, _context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        detail_of(event).is_some()
    }

    fn description(&self) -> &'static str {
        "Detail must be non-empty"
    }
}

/// Guard rejecting photo signals for any trip other than the active one
pub struct SignalMatchesTripGuard;

impl StateGuard<DeliveryContext, TreatmentEvent> for SignalMatchesTripGuard {
    fn check(&self, context: &DeliveryContext, event: &TreatmentEvent) -> bool {
        event
            .signal_trip_id()
            .is_some_and(|trip_id| !trip_id.is_empty() && trip_id == context.trip_id)
    }

    fn description(&self) -> &'static str {
        "Signal must belong to the active trip"
    }
}

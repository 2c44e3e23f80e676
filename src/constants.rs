//! # System Constants
//!
//! Fixed prompt texts and message type names shared by the treatment workflow and the
//! session layer.

/// Engine instance name used in logs
pub const TREATMENT_MACHINE_NAME: &str = "DeliveryTreatmentFSM";

/// Exact texts spoken to the driver. Reprompts repeat these verbatim.
pub mod prompts {
    pub const ASK_DELIVERY_COMPLETION: &str =
        "You have arrived. Is the delivery completed? Please answer yes or no.";

    pub const ASK_NON_DELIVERY_REASON: &str = "Okay. Please choose a reason by number. \
        1. Recipient absent. \
        2. No safe place. \
        3. Access not possible. \
        4. Address not found. \
        5. Recipient refused. \
        6. Other reason.";

    pub const ASK_REASON_DETAIL: &str = "Please describe the reason for non-delivery.";

    pub const ASK_PHOTO: &str = "Please take a photo of the package.";

    pub const DELIVERY_CONFIRMED: &str = "The delivery is confirmed.";

    pub const DELIVERY_CONFIRMED_WITH_PHOTO: &str = "Photo received. The delivery is confirmed.";

    pub const DELIVERY_NOT_COMPLETED: &str =
        "The delivery has been marked as not completed. Reason noted.";
}

/// `type` values of the JSON messages sent to the companion app
pub mod message_types {
    pub const ASK_PHOTO_EVENT: &str = "ask_photo_event";
    pub const DELIVERY_CONFIRMED: &str = "delivery_confirmed";
    pub const DELIVERY_TREATMENT_FINISHED: &str = "delivery_treatment_finished";
    pub const TRIP_COMPLETED_EVENT: &str = "trip_completed_event";
    pub const TRIP_CANCELLED_EVENT: &str = "trip_cancelled_event";
}

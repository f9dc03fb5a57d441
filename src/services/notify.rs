use tracing::{debug, info};

use crate::models::trip::Trip;

/// Announces newly recorded trips. Delivery is left to whatever tails the log;
/// the service only decides who is addressed and what is said.
#[derive(Clone, Debug)]
pub struct NotificationService {
    recipient: Option<String>,
    template: String,
}

impl NotificationService {
    pub fn new(recipient: Option<String>, template: impl Into<String>) -> Self {
        Self {
            recipient,
            template: template.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.recipient.is_some()
    }

    /// Returns the message that went out, if anyone was configured to receive it.
    pub fn send_new_trip_notification(&self, trip: &Trip) -> Option<String> {
        let Some(recipient) = self.recipient.as_deref() else {
            debug!(trip_id = %trip.id, "notification skipped, no recipient");
            return None;
        };
        let message = self.render_template(trip);
        info!(%recipient, trip_id = %trip.id, message = %message, "trip notification sent");
        Some(message)
    }

    pub fn render_template(&self, trip: &Trip) -> String {
        let mut message = self.template.clone();
        message = message.replace("{patient}", &trip.patient_name);
        message = message.replace("{origin}", &trip.origin_city);
        message = message.replace("{destination}", &trip.destination_city);
        message = message.replace("{status}", &trip.patient_status);
        message = message.replace("{ambulance}", trip.ambulance_label());
        message = message.replace(
            "{timestamp}",
            &trip.created_at.format("%d.%m.%Y %H:%M").to_string(),
        );
        message
    }
}

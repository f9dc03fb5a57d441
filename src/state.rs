use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::AppError,
    models::trip::{NewTrip, Trip},
    services::{git::GitService, notify::NotificationService, store::TripStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TripStore>,
    pub notifier: NotificationService,
    pub git: Option<GitService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TripStore>,
        notifier: NotificationService,
        git: Option<GitService>,
    ) -> Self {
        Self {
            store,
            notifier,
            git,
        }
    }

    pub async fn trips(&self) -> Result<Vec<Trip>, AppError> {
        self.store.list_trips().await
    }

    /// Validates and stores a submitted trip, then notifies and syncs.
    /// Notification and sync failures are logged, never returned.
    pub async fn record_trip(&self, input: NewTrip) -> Result<Trip, AppError> {
        let trip = Trip::create(input)?;
        let saved = self.store.insert_trip(trip).await?;
        info!(trip_id = %saved.id, patient = %saved.patient_name, "trip recorded");

        self.notifier.send_new_trip_notification(&saved);
        self.sync(&format!(
            "trip: {} {} → {}",
            saved.patient_name, saved.origin_city, saved.destination_city
        ));
        Ok(saved)
    }

    pub async fn delete_trip(&self, id: &str) -> Result<Trip, AppError> {
        let removed = self.store.remove_trip(id).await?;
        info!(trip_id = %removed.id, "trip removed");
        self.sync(&format!("trip removed: {}", removed.id));
        Ok(removed)
    }

    fn sync(&self, message: &str) {
        let Some(git) = &self.git else {
            return;
        };
        if let Err(err) = git.commit_data_changes(message) {
            warn!("git sync of trip data failed: {err}");
        }
    }
}

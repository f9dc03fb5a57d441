use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use crate::{error::AppError, models::trip::Trip, services::store::TripStore};

const TRIPS_FILE: &str = "trips.json";
const TRIPS_TEMP_FILE: &str = "trips.json.tmp";

/// Trips kept as one pretty-printed JSON array on disk, oldest first.
///
/// Readers share the lock and writers hold it exclusively, so a listing
/// never observes a half-written file. The file itself is replaced by
/// rename, which leaves the previous ledger intact if a write dies midway.
#[derive(Clone)]
pub struct StorageService {
    root: Arc<PathBuf>,
    lock: Arc<RwLock<()>>,
}

impl StorageService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trips_path(&self) -> PathBuf {
        self.root().join(TRIPS_FILE)
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    pub async fn load_trips(&self) -> Result<Vec<Trip>, AppError> {
        let _guard = self.lock.read().await;
        self.read_trips().await
    }

    async fn read_trips(&self) -> Result<Vec<Trip>, AppError> {
        let path = self.trips_path();
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let raw = fs::read(&path).await?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let trips: Vec<Trip> =
            serde_json::from_slice(&raw).map_err(|err| AppError::Other(err.into()))?;
        Ok(trips)
    }

    async fn write_trips(&self, trips: &[Trip]) -> Result<(), AppError> {
        self.ensure_structure().await?;
        let data = serde_json::to_vec_pretty(trips).map_err(|err| AppError::Other(err.into()))?;
        let temp = self.root().join(TRIPS_TEMP_FILE);
        fs::write(&temp, data).await?;
        fs::rename(&temp, self.trips_path()).await?;
        debug!(count = trips.len(), path = %self.trips_path().display(), "trips written");
        Ok(())
    }
}

#[async_trait]
impl TripStore for StorageService {
    async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        self.load_trips().await
    }

    async fn find_trip(&self, id: &str) -> Result<Option<Trip>, AppError> {
        let trips = self.load_trips().await?;
        Ok(trips.into_iter().find(|trip| trip.id == id))
    }

    async fn insert_trip(&self, trip: Trip) -> Result<Trip, AppError> {
        let _guard = self.lock.write().await;
        let mut trips = self.read_trips().await?;
        if trips.iter().any(|existing| existing.id == trip.id) {
            return Err(AppError::validation(format!(
                "trip {} already exists",
                trip.id
            )));
        }
        trips.push(trip.clone());
        self.write_trips(&trips).await?;
        Ok(trip)
    }

    async fn remove_trip(&self, id: &str) -> Result<Trip, AppError> {
        let _guard = self.lock.write().await;
        let mut trips = self.read_trips().await?;
        let position = trips
            .iter()
            .position(|trip| trip.id == id)
            .ok_or(AppError::NotFound)?;
        let removed = trips.remove(position);
        self.write_trips(&trips).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::NewTrip;
    use tempfile::TempDir;

    fn new_trip(name: &str) -> Trip {
        Trip::create(NewTrip {
            patient_name: name.into(),
            origin_city: "Pune".into(),
            destination_city: "Mumbai".into(),
            amount_charged: Some(1200.0.into()),
            ..NewTrip::default()
        })
        .unwrap()
    }

    fn storage(root: &TempDir) -> StorageService {
        StorageService::new(root.path().join("data"))
    }

    #[tokio::test]
    async fn missing_or_blank_file_reads_as_empty() {
        let root = TempDir::new().unwrap();
        let storage = storage(&root);
        assert!(storage.list_trips().await.unwrap().is_empty());

        storage.ensure_structure().await.unwrap();
        fs::write(storage.trips_path(), " \n\t ").await.unwrap();
        assert!(storage.list_trips().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_oldest_first() {
        let root = TempDir::new().unwrap();
        let storage = storage(&root);
        let first = storage.insert_trip(new_trip("Asha")).await.unwrap();
        let second = storage.insert_trip(new_trip("Ravi")).await.unwrap();

        let ids: Vec<_> = storage
            .list_trips()
            .await
            .unwrap()
            .into_iter()
            .map(|trip| trip.id)
            .collect();
        assert_eq!(ids, vec![first.id.clone(), second.id]);
        assert_eq!(
            storage.find_trip(&first.id).await.unwrap().unwrap().patient_name,
            "Asha"
        );
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_and_removal_reports_missing() {
        let root = TempDir::new().unwrap();
        let storage = storage(&root);
        let trip = storage.insert_trip(new_trip("Asha")).await.unwrap();
        assert!(matches!(
            storage.insert_trip(trip.clone()).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(storage.list_trips().await.unwrap().len(), 1);

        assert!(matches!(
            storage.remove_trip("no-such-trip").await,
            Err(AppError::NotFound)
        ));
        let removed = storage.remove_trip(&trip.id).await.unwrap();
        assert_eq!(removed.id, trip.id);
        assert!(storage.find_trip(&trip.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_status_in_file_falls_back_to_completed() {
        let root = TempDir::new().unwrap();
        let storage = storage(&root);
        storage.ensure_structure().await.unwrap();
        let raw = r#"[{"id": "t1", "patient_name": "Asha", "origin_city": "Pune",
            "destination_city": "Mumbai", "amount_charged": "n/a", "status": "Pending",
            "created_at": "2024-01-05T09:30:00Z"}]"#;
        fs::write(storage.trips_path(), raw).await.unwrap();

        let trips = storage.list_trips().await.unwrap();
        assert_eq!(trips.len(), 1);
        assert!(trips[0].is_completed());
        assert_eq!(trips[0].income(), 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_during_writes_see_every_stored_trip() {
        let root = TempDir::new().unwrap();
        let storage = storage(&root);
        for n in 0..50 {
            storage.insert_trip(new_trip(&format!("seed {n}"))).await.unwrap();
        }

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for n in 0..100 {
                    storage.insert_trip(new_trip(&format!("late {n}"))).await.unwrap();
                }
            })
        };

        let mut previous = 50;
        while !writer.is_finished() {
            let seen = storage.list_trips().await.unwrap().len();
            assert!(seen >= previous, "listing shrank from {previous} to {seen}");
            previous = seen;
        }
        writer.await.unwrap();
        assert_eq!(storage.list_trips().await.unwrap().len(), 150);
    }
}

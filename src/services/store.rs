use async_trait::async_trait;

use crate::{error::AppError, models::trip::Trip};

/// Where trips live. Implementations serialise their own writes.
///
/// `list_trips` returns trips in insertion order, oldest first; the
/// aggregator's first-seen tie-breaks depend on that order.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn list_trips(&self) -> Result<Vec<Trip>, AppError>;

    async fn find_trip(&self, id: &str) -> Result<Option<Trip>, AppError>;

    /// Fails with a validation error when the id is already taken.
    async fn insert_trip(&self, trip: Trip) -> Result<Trip, AppError>;

    /// Returns the removed trip, or `NotFound`.
    async fn remove_trip(&self, id: &str) -> Result<Trip, AppError>;
}

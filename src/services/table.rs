use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{Expenses, Trip, TripStatus},
    services::store::TripStore,
};

// Numeric columns are cast on the way out: SQLite keeps a value that does not
// look like a number as TEXT even in a REAL column, and such values count as 0.
const SELECT_TRIPS: &str = r#"SELECT id, patient_name, patient_details, patient_status, status_description,
    origin_city, origin_hospital, destination_city, destination_hospital, driver_name, nursing_staff,
    ambulance_number,
    COALESCE(CAST(distance_km AS REAL), 0.0) AS distance_km,
    CAST(charge_per_km AS REAL) AS charge_per_km,
    COALESCE(CAST(amount_charged AS REAL), 0.0) AS amount_charged,
    COALESCE(CAST(driver_expense AS REAL), 0.0) AS driver_expense,
    COALESCE(CAST(fuel_expense AS REAL), 0.0) AS fuel_expense,
    COALESCE(CAST(maintenance_expense AS REAL), 0.0) AS maintenance_expense,
    COALESCE(CAST(miscellaneous_expense AS REAL), 0.0) AS miscellaneous_expense,
    COALESCE(CAST(nursing_expense AS REAL), 0.0) AS nursing_expense,
    status, created_at FROM trips"#;

/// Trips kept in the `trips` SQLite table.
#[derive(Clone)]
pub struct TripTable {
    db: DbPool,
}

impl TripTable {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TripStore for TripTable {
    async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        let rows = sqlx::query(&format!("{SELECT_TRIPS} ORDER BY seq"))
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(trip_from_row).collect()
    }

    async fn find_trip(&self, id: &str) -> Result<Option<Trip>, AppError> {
        let row = sqlx::query(&format!("{SELECT_TRIPS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(trip_from_row).transpose()
    }

    async fn insert_trip(&self, trip: Trip) -> Result<Trip, AppError> {
        let result = sqlx::query(
            r#"INSERT INTO trips (id, patient_name, patient_details, patient_status, status_description,
                origin_city, origin_hospital, destination_city, destination_hospital, driver_name,
                nursing_staff, ambulance_number, distance_km, charge_per_km, amount_charged,
                driver_expense, fuel_expense, maintenance_expense, miscellaneous_expense,
                nursing_expense, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"#,
        )
        .bind(&trip.id)
        .bind(&trip.patient_name)
        .bind(&trip.patient_details)
        .bind(&trip.patient_status)
        .bind(&trip.status_description)
        .bind(&trip.origin_city)
        .bind(&trip.origin_hospital)
        .bind(&trip.destination_city)
        .bind(&trip.destination_hospital)
        .bind(&trip.driver_name)
        .bind(&trip.nursing_staff)
        .bind(&trip.ambulance_number)
        .bind(trip.distance_km)
        .bind(trip.charge_per_km)
        .bind(trip.amount_charged)
        .bind(trip.expenses.driver)
        .bind(trip.expenses.fuel)
        .bind(trip.expenses.maintenance)
        .bind(trip.expenses.miscellaneous)
        .bind(trip.expenses.nursing)
        .bind(trip.status.as_str())
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                debug!(trip_id = %trip.id, "trip row inserted");
                Ok(trip)
            }
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(
                AppError::validation(format!("trip {} already exists", trip.id)),
            ),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_trip(&self, id: &str) -> Result<Trip, AppError> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query(&format!("{SELECT_TRIPS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(AppError::NotFound);
        };
        let trip = trip_from_row(&row)?;
        sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(trip)
    }
}

fn trip_from_row(row: &SqliteRow) -> Result<Trip, AppError> {
    let raw_created: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&raw_created)
        .map_err(|err| AppError::Other(err.into()))?
        .with_timezone(&Utc);
    let raw_status: String = row.try_get("status")?;

    Ok(Trip {
        id: row.try_get("id")?,
        patient_name: row.try_get("patient_name")?,
        patient_details: row.try_get("patient_details")?,
        patient_status: row.try_get("patient_status")?,
        status_description: row.try_get("status_description")?,
        origin_city: row.try_get("origin_city")?,
        origin_hospital: row.try_get("origin_hospital")?,
        destination_city: row.try_get("destination_city")?,
        destination_hospital: row.try_get("destination_hospital")?,
        driver_name: row.try_get("driver_name")?,
        nursing_staff: row.try_get("nursing_staff")?,
        ambulance_number: row.try_get("ambulance_number")?,
        distance_km: row.try_get("distance_km")?,
        charge_per_km: row.try_get("charge_per_km")?,
        amount_charged: row.try_get("amount_charged")?,
        expenses: Expenses {
            driver: row.try_get("driver_expense")?,
            fuel: row.try_get("fuel_expense")?,
            maintenance: row.try_get("maintenance_expense")?,
            miscellaneous: row.try_get("miscellaneous_expense")?,
            nursing: row.try_get("nursing_expense")?,
        },
        status: TripStatus::parse(&raw_status).unwrap_or_default(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::models::trip::NewTrip;
    use sqlx::sqlite::SqlitePoolOptions;

    // An in-memory database lives only as long as its single connection.
    async fn table() -> TripTable {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        TripTable::new(pool)
    }

    fn new_trip(name: &str) -> Trip {
        Trip::create(NewTrip {
            patient_name: name.into(),
            origin_city: "Pune".into(),
            destination_city: "Mumbai".into(),
            amount_charged: Some(1500.0.into()),
            fuel_expense: Some(200.0.into()),
            ambulance_number: Some("MH-12-A".into()),
            ..NewTrip::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn rows_round_trip_in_insertion_order() {
        let table = table().await;
        let first = table.insert_trip(new_trip("Asha")).await.unwrap();
        let second = table.insert_trip(new_trip("Ravi")).await.unwrap();

        let trips = table.list_trips().await.unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].id, first.id);
        assert_eq!(trips[1].id, second.id);
        assert_eq!(trips[0].expenditure(), 200.0);
        assert_eq!(trips[0].ambulance_number.as_deref(), Some("MH-12-A"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_and_removal_reports_missing() {
        let table = table().await;
        let trip = table.insert_trip(new_trip("Asha")).await.unwrap();
        assert!(matches!(
            table.insert_trip(trip.clone()).await,
            Err(AppError::Validation(_))
        ));

        let removed = table.remove_trip(&trip.id).await.unwrap();
        assert_eq!(removed.id, trip.id);
        assert!(table.find_trip(&trip.id).await.unwrap().is_none());
        assert!(matches!(
            table.remove_trip(&trip.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn non_numeric_columns_read_as_zero() {
        let table = table().await;
        sqlx::query(
            r#"INSERT INTO trips (id, patient_name, origin_city, destination_city, distance_km,
                amount_charged, fuel_expense, status, created_at)
            VALUES ('t1', 'Asha', 'Pune', 'Mumbai', 'far', 'n/a', '350', 'Pending',
                '2024-01-05T09:30:00+00:00')"#,
        )
        .execute(&table.db)
        .await
        .unwrap();

        let trips = table.list_trips().await.unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].distance_km, 0.0);
        assert_eq!(trips[0].income(), 0.0);
        assert_eq!(trips[0].expenditure(), 350.0);
        assert!(trips[0].is_completed());
        assert!(trips[0].charge_per_km.is_none());
    }
}

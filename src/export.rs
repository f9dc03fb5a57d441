use crate::{error::AppError, models::trip::Trip};

const HEADER: [&str; 23] = [
    "id",
    "created_at",
    "patient_name",
    "patient_details",
    "patient_status",
    "status_description",
    "origin_city",
    "origin_hospital",
    "destination_city",
    "destination_hospital",
    "driver_name",
    "nursing_staff",
    "ambulance_number",
    "distance_km",
    "charge_per_km",
    "amount_charged",
    "driver_expense",
    "fuel_expense",
    "maintenance_expense",
    "miscellaneous_expense",
    "nursing_expense",
    "expenditure",
    "status",
];

/// One CSV row per trip, columns in trip field order.
pub fn trips_to_csv(trips: &[Trip]) -> Result<Vec<u8>, AppError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADER)?;

    for trip in trips {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        wtr.write_record([
            trip.id.clone(),
            trip.created_at.to_rfc3339(),
            trip.patient_name.clone(),
            text(&trip.patient_details),
            trip.patient_status.clone(),
            text(&trip.status_description),
            trip.origin_city.clone(),
            text(&trip.origin_hospital),
            trip.destination_city.clone(),
            text(&trip.destination_hospital),
            text(&trip.driver_name),
            text(&trip.nursing_staff),
            text(&trip.ambulance_number),
            format!("{:.2}", trip.distance()),
            trip.charge_per_km
                .map(|rate| format!("{rate:.2}"))
                .unwrap_or_default(),
            format!("{:.2}", trip.income()),
            format!("{:.2}", trip.expenses.driver),
            format!("{:.2}", trip.expenses.fuel),
            format!("{:.2}", trip.expenses.maintenance),
            format!("{:.2}", trip.expenses.miscellaneous),
            format!("{:.2}", trip.expenses.nursing),
            format!("{:.2}", trip.expenditure()),
            trip.status.to_string(),
        ])?;
    }

    wtr.into_inner()
        .map_err(|err| AppError::Io(err.into_error()))
}

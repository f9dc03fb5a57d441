use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TripStatus {
    #[default]
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => Some(TripStatus::Completed),
            "cancelled" | "canceled" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Driver,
    Fuel,
    Maintenance,
    Miscellaneous,
    Nursing,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Driver,
        ExpenseCategory::Fuel,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Miscellaneous,
        ExpenseCategory::Nursing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Driver => "driver",
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Miscellaneous => "miscellaneous",
            ExpenseCategory::Nursing => "nursing",
        }
    }
}

/// Per-trip costs. The trip's total expenditure is always the sum of these.
///
/// Stored values are read leniently: a missing, null or non-numeric entry
/// becomes zero instead of failing the whole collection.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Expenses {
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub driver: f64,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub fuel: f64,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub maintenance: f64,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub miscellaneous: f64,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub nursing: f64,
}

impl Expenses {
    pub fn get(&self, category: ExpenseCategory) -> f64 {
        let raw = match category {
            ExpenseCategory::Driver => self.driver,
            ExpenseCategory::Fuel => self.fuel,
            ExpenseCategory::Maintenance => self.maintenance,
            ExpenseCategory::Miscellaneous => self.miscellaneous,
            ExpenseCategory::Nursing => self.nursing,
        };
        finite_or_zero(raw)
    }

    pub fn total(&self) -> f64 {
        ExpenseCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: String,
    pub patient_name: String,
    #[serde(default)]
    pub patient_details: Option<String>,
    #[serde(default)]
    pub patient_status: String,
    #[serde(default)]
    pub status_description: Option<String>,
    #[serde(default)]
    pub origin_city: String,
    #[serde(default)]
    pub origin_hospital: Option<String>,
    #[serde(default)]
    pub destination_city: String,
    #[serde(default)]
    pub destination_hospital: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub nursing_staff: Option<String>,
    #[serde(default)]
    pub ambulance_number: Option<String>,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub distance_km: f64,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub charge_per_km: Option<f64>,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub amount_charged: f64,
    #[serde(default)]
    pub expenses: Expenses,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn create(input: NewTrip) -> Result<Self, AppError> {
        input.into_trip(Utc::now())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TripStatus::Completed
    }

    pub fn income(&self) -> f64 {
        finite_or_zero(self.amount_charged)
    }

    pub fn expenditure(&self) -> f64 {
        self.expenses.total()
    }

    pub fn distance(&self) -> f64 {
        finite_or_zero(self.distance_km)
    }

    pub fn route_label(&self) -> String {
        format!("{} → {}", self.origin_city, self.destination_city)
    }

    pub fn ambulance_label(&self) -> &str {
        self.ambulance_number.as_deref().unwrap_or("unassigned")
    }

    /// Priority score shown next to each trip in the ledger.
    pub fn lead_score(&self) -> u32 {
        let distance = self.distance();
        let distance_score = if distance > 100.0 {
            10
        } else if distance > 50.0 {
            5
        } else {
            2
        };

        let status_score = match self.patient_status.trim().to_ascii_lowercase().as_str() {
            "critical" => 15,
            "unstable" => 10,
            _ => 5,
        };

        let amount = self.income();
        let amount_score = if amount > 10_000.0 {
            20
        } else if amount > 5_000.0 {
            10
        } else {
            5
        };

        distance_score + status_score + amount_score
    }
}

/// A numeric form field: either a JSON number or the raw text of an HTML input.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumberInput {
    fn from(value: f64) -> Self {
        NumberInput::Number(value)
    }
}

/// A submitted trip, before validation.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewTrip {
    #[serde(default)]
    pub patient_name: String,
    pub patient_details: Option<String>,
    pub patient_status: Option<String>,
    pub status_description: Option<String>,
    #[serde(default)]
    pub origin_city: String,
    pub origin_hospital: Option<String>,
    #[serde(default)]
    pub destination_city: String,
    pub destination_hospital: Option<String>,
    pub driver_name: Option<String>,
    pub nursing_staff: Option<String>,
    pub ambulance_number: Option<String>,
    pub distance_km: Option<NumberInput>,
    pub charge_per_km: Option<NumberInput>,
    pub amount_charged: Option<NumberInput>,
    pub driver_expense: Option<NumberInput>,
    pub fuel_expense: Option<NumberInput>,
    pub maintenance_expense: Option<NumberInput>,
    pub miscellaneous_expense: Option<NumberInput>,
    pub nursing_expense: Option<NumberInput>,
    pub status: Option<String>,
}

impl NewTrip {
    pub fn into_trip(self, created_at: DateTime<Utc>) -> Result<Trip, AppError> {
        let patient_name = require_text("patient_name", &self.patient_name)?;
        let origin_city = require_text("origin_city", &self.origin_city)?;
        let destination_city = require_text("destination_city", &self.destination_city)?;

        let distance_km = parse_amount("distance_km", self.distance_km.as_ref())?.unwrap_or(0.0);
        let charge_per_km = parse_amount("charge_per_km", self.charge_per_km.as_ref())?;
        let amount_charged = match (
            parse_amount("amount_charged", self.amount_charged.as_ref())?,
            charge_per_km,
        ) {
            (Some(amount), _) => amount,
            (None, Some(rate)) => distance_km * rate,
            (None, None) => {
                return Err(AppError::validation(
                    "amount_charged is required unless charge_per_km is given",
                ))
            }
        };

        let expenses = Expenses {
            driver: parse_amount("driver_expense", self.driver_expense.as_ref())?.unwrap_or(0.0),
            fuel: parse_amount("fuel_expense", self.fuel_expense.as_ref())?.unwrap_or(0.0),
            maintenance: parse_amount("maintenance_expense", self.maintenance_expense.as_ref())?
                .unwrap_or(0.0),
            miscellaneous: parse_amount(
                "miscellaneous_expense",
                self.miscellaneous_expense.as_ref(),
            )?
            .unwrap_or(0.0),
            nursing: parse_amount("nursing_expense", self.nursing_expense.as_ref())?
                .unwrap_or(0.0),
        };

        let status = match normalize_optional(self.status) {
            None => TripStatus::Completed,
            Some(raw) => TripStatus::parse(&raw)
                .ok_or_else(|| AppError::validation(format!("unknown trip status: {raw}")))?,
        };

        Ok(Trip {
            id: Uuid::new_v4().to_string(),
            patient_name,
            patient_details: normalize_optional(self.patient_details),
            patient_status: normalize_optional(self.patient_status)
                .unwrap_or_else(|| "unknown".into()),
            status_description: normalize_optional(self.status_description),
            origin_city,
            origin_hospital: normalize_optional(self.origin_hospital),
            destination_city,
            destination_hospital: normalize_optional(self.destination_hospital),
            driver_name: normalize_optional(self.driver_name),
            nursing_staff: normalize_optional(self.nursing_staff),
            ambulance_number: normalize_optional(self.ambulance_number),
            distance_km,
            charge_per_km,
            amount_charged,
            expenses,
            status,
            created_at,
        })
    }
}

fn require_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Blank input counts as absent; anything else must be a finite, non-negative number.
fn parse_amount(field: &str, input: Option<&NumberInput>) -> Result<Option<f64>, AppError> {
    let value = match input {
        None => return Ok(None),
        Some(NumberInput::Number(value)) => *value,
        Some(NumberInput::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| AppError::validation(format!("{field} must be a number")))?
        }
    };
    if !value.is_finite() {
        return Err(AppError::validation(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(AppError::validation(format!("{field} must not be negative")));
    }
    Ok(Some(value))
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form() -> NewTrip {
        NewTrip {
            patient_name: " Asha ".into(),
            origin_city: "Pune".into(),
            destination_city: "Mumbai".into(),
            amount_charged: Some(NumberInput::Text("1200".into())),
            driver_expense: Some(300.0.into()),
            fuel_expense: Some(NumberInput::Text("150.5".into())),
            nursing_expense: Some(NumberInput::Text("".into())),
            ..NewTrip::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()
    }

    #[test]
    fn valid_form_becomes_trip_with_derived_expenditure() {
        let trip = form().into_trip(now()).unwrap();
        assert_eq!(trip.patient_name, "Asha");
        assert_eq!(trip.amount_charged, 1200.0);
        assert_eq!(trip.expenditure(), 450.5);
        assert_eq!(trip.expenses.nursing, 0.0);
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.patient_status, "unknown");
        assert_eq!(trip.created_at, now());
    }

    #[test]
    fn missing_patient_name_is_rejected() {
        let mut input = form();
        input.patient_name = "   ".into();
        let err = input.into_trip(now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("patient_name")));
    }

    #[test]
    fn negative_and_garbage_amounts_are_rejected() {
        let mut input = form();
        input.amount_charged = Some((-5.0).into());
        assert!(matches!(input.into_trip(now()), Err(AppError::Validation(_))));

        let mut input = form();
        input.fuel_expense = Some(NumberInput::Text("lots".into()));
        assert!(matches!(input.into_trip(now()), Err(AppError::Validation(_))));

        let mut input = form();
        input.distance_km = Some(NumberInput::Text("NaN".into()));
        assert!(matches!(input.into_trip(now()), Err(AppError::Validation(_))));
    }

    #[test]
    fn amount_falls_back_to_per_km_rate() {
        let mut input = form();
        input.amount_charged = None;
        input.distance_km = Some(40.0.into());
        input.charge_per_km = Some(NumberInput::Text("25".into()));
        let trip = input.into_trip(now()).unwrap();
        assert_eq!(trip.amount_charged, 1000.0);

        let mut input = form();
        input.amount_charged = Some(NumberInput::Text(" ".into()));
        assert!(matches!(input.into_trip(now()), Err(AppError::Validation(_))));
    }

    #[test]
    fn unknown_status_is_rejected_and_cancelled_is_accepted() {
        let mut input = form();
        input.status = Some("cancelled".into());
        assert_eq!(input.into_trip(now()).unwrap().status, TripStatus::Cancelled);

        let mut input = form();
        input.status = Some("lost".into());
        assert!(matches!(input.into_trip(now()), Err(AppError::Validation(_))));
    }

    #[test]
    fn stored_records_degrade_malformed_numbers_to_zero() {
        let raw = r#"{
            "id": "t-1",
            "patient_name": "Ravi",
            "origin_city": "Pune",
            "destination_city": "Nashik",
            "distance_km": "oops",
            "amount_charged": "800",
            "expenses": { "driver": null, "fuel": "120" },
            "created_at": "2024-02-10T08:30:00Z"
        }"#;
        let trip: Trip = serde_json::from_str(raw).unwrap();
        assert_eq!(trip.distance_km, 0.0);
        assert_eq!(trip.amount_charged, 800.0);
        assert_eq!(trip.expenses.driver, 0.0);
        assert_eq!(trip.expenses.fuel, 120.0);
        assert_eq!(trip.status, TripStatus::Completed);
    }

    #[test]
    fn lead_score_weights_distance_status_and_amount() {
        let mut trip = form().into_trip(now()).unwrap();
        trip.distance_km = 120.0;
        trip.patient_status = "Critical".into();
        trip.amount_charged = 12_000.0;
        assert_eq!(trip.lead_score(), 45);

        trip.distance_km = 60.0;
        trip.patient_status = "unstable".into();
        trip.amount_charged = 6_000.0;
        assert_eq!(trip.lead_score(), 25);

        trip.distance_km = 10.0;
        trip.patient_status = "stable".into();
        trip.amount_charged = 100.0;
        assert_eq!(trip.lead_score(), 12);
    }
}

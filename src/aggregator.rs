//! Derived views over a trip collection.
//!
//! Everything here is a pure function of the trips handed in: nothing reads
//! the store, nothing keeps state between calls. Malformed stored numbers are
//! already read as zero by the model, so sums never see NaN.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{
        report::DateRange,
        trip::{ExpenseCategory, Trip, TripStatus},
    },
};

/// Number of most recent trips the demand estimate looks at, spread over as many days.
pub const DEMAND_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Totals {
    pub income: f64,
    pub expenditure: f64,
    pub profit: f64,
}

/// Income and expenditure over completed trips; cancelled trips earn and cost nothing.
pub fn totals(trips: &[Trip]) -> Totals {
    let (income, expenditure) = trips
        .iter()
        .filter(|trip| trip.is_completed())
        .fold((0.0, 0.0), |(income, expenditure), trip| {
            (income + trip.income(), expenditure + trip.expenditure())
        });
    Totals {
        income,
        expenditure,
        profit: income - expenditure,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ExpenditureBreakdown {
    pub driver: f64,
    pub fuel: f64,
    pub maintenance: f64,
    pub miscellaneous: f64,
    pub nursing: f64,
}

impl ExpenditureBreakdown {
    pub fn get(&self, category: ExpenseCategory) -> f64 {
        match category {
            ExpenseCategory::Driver => self.driver,
            ExpenseCategory::Fuel => self.fuel,
            ExpenseCategory::Maintenance => self.maintenance,
            ExpenseCategory::Miscellaneous => self.miscellaneous,
            ExpenseCategory::Nursing => self.nursing,
        }
    }

    pub fn total(&self) -> f64 {
        ExpenseCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn entries(&self) -> Vec<(ExpenseCategory, f64)> {
        ExpenseCategory::ALL
            .iter()
            .map(|c| (*c, self.get(*c)))
            .collect()
    }
}

pub fn expenditure_breakdown(trips: &[Trip]) -> ExpenditureBreakdown {
    trips
        .iter()
        .filter(|trip| trip.is_completed())
        .fold(ExpenditureBreakdown::default(), |mut acc, trip| {
            let expenses = &trip.expenses;
            acc.driver += expenses.get(ExpenseCategory::Driver);
            acc.fuel += expenses.get(ExpenseCategory::Fuel);
            acc.maintenance += expenses.get(ExpenseCategory::Maintenance);
            acc.miscellaneous += expenses.get(ExpenseCategory::Miscellaneous);
            acc.nursing += expenses.get(ExpenseCategory::Nursing);
            acc
        })
}

/// How a group of trips is reduced to a single number.
#[derive(Clone, Copy)]
pub enum Measure {
    Count,
    Sum(fn(&Trip) -> f64),
}

impl Measure {
    fn of(&self, trip: &Trip) -> f64 {
        match self {
            Measure::Count => 1.0,
            Measure::Sum(field) => field(trip),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Group<K> {
    pub key: K,
    pub value: f64,
}

/// Groups keep the order in which their key was first seen.
pub fn group_by_key<K, F>(trips: &[Trip], key_fn: F, measure: Measure) -> Vec<Group<K>>
where
    K: Eq + Hash + Clone,
    F: Fn(&Trip) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<K>> = Vec::new();
    for trip in trips {
        let key = key_fn(trip);
        let value = measure.of(trip);
        match index.get(&key) {
            Some(&slot) => groups[slot].value += value,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group { key, value });
            }
        }
    }
    groups
}

/// Highest value wins; on a tie the group seen first in the input wins.
pub fn most_frequent<K>(groups: &[Group<K>]) -> Option<&Group<K>> {
    groups.iter().fold(None, |best: Option<&Group<K>>, group| match best {
        Some(current) if current.value >= group.value => Some(current),
        _ => Some(group),
    })
}

/// Descending by value, stable so ties keep first-seen order.
pub fn ranked<K: Clone>(groups: &[Group<K>]) -> Vec<Group<K>> {
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
    sorted
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub income: f64,
    pub expenditure: f64,
    pub trips: usize,
}

/// Every trip is counted in exactly one bucket; money comes from completed trips only,
/// so the bucket sums add up to [`totals`].
pub fn time_series<F>(trips: &[Trip], bucket_fn: F) -> Vec<SeriesPoint>
where
    F: Fn(&DateTime<Utc>) -> String,
{
    let mut buckets: BTreeMap<String, SeriesPoint> = BTreeMap::new();
    for trip in trips {
        let label = bucket_fn(&trip.created_at);
        let point = buckets
            .entry(label.clone())
            .or_insert_with(|| SeriesPoint {
                label,
                income: 0.0,
                expenditure: 0.0,
                trips: 0,
            });
        point.trips += 1;
        if trip.is_completed() {
            point.income += trip.income();
            point.expenditure += trip.expenditure();
        }
    }
    buckets.into_values().collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Day,
    Month,
}

impl Bucket {
    pub fn label(&self, ts: &DateTime<Utc>) -> String {
        match self {
            Bucket::Day => day_bucket(ts),
            Bucket::Month => month_bucket(ts),
        }
    }
}

pub fn day_bucket(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn month_bucket(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// Trips whose UTC creation date falls inside the range, bounds included.
pub fn trips_in_range(trips: &[Trip], range: &DateRange) -> Vec<Trip> {
    if range.is_empty() {
        return Vec::new();
    }
    trips
        .iter()
        .filter(|trip| range.contains(trip.created_at.date_naive()))
        .cloned()
        .collect()
}

pub fn filter_by_date_range(
    trips: &[Trip],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<Trip>, AppError> {
    let range = DateRange::parse(start, end)?;
    Ok(trips_in_range(trips, &range))
}

pub fn average_distance(trips: &[Trip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    trips.iter().map(Trip::distance).sum::<f64>() / trips.len() as f64
}

/// Expected trips per day, from the most recent [`DEMAND_WINDOW`] trips over as many days.
pub fn predict_demand(trips: &[Trip]) -> f64 {
    trips.len().min(DEMAND_WINDOW) as f64 / DEMAND_WINDOW as f64
}

pub fn count_by<F>(trips: &[Trip], key_fn: F) -> Vec<Group<String>>
where
    F: Fn(&Trip) -> String,
{
    group_by_key(trips, key_fn, Measure::Count)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportPayload {
    pub range: DateRange,
    pub trip_count: usize,
    pub totals: Totals,
    pub expenditure_breakdown: ExpenditureBreakdown,
    pub trip_status_distribution: Vec<Group<String>>,
    pub patient_status_distribution: Vec<Group<String>>,
    pub most_visited_locations: Vec<Group<String>>,
    pub most_visited_location: Option<String>,
    pub most_frequent_route: Option<String>,
    pub trips_per_ambulance: Vec<Group<String>>,
    pub average_distance_km: f64,
    pub trips: Vec<Trip>,
}

pub fn build_report(
    trips: &[Trip],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<ReportPayload, AppError> {
    let range = DateRange::parse(start, end)?;
    Ok(build_report_for(trips, range))
}

pub fn build_report_for(trips: &[Trip], range: DateRange) -> ReportPayload {
    let selected = trips_in_range(trips, &range);

    let destinations = count_by(&selected, |trip| trip.destination_city.clone());
    let routes = count_by(&selected, Trip::route_label);

    ReportPayload {
        range,
        trip_count: selected.len(),
        totals: totals(&selected),
        expenditure_breakdown: expenditure_breakdown(&selected),
        trip_status_distribution: count_by(&selected, |trip| trip.status.to_string()),
        patient_status_distribution: count_by(&selected, |trip| trip.patient_status.clone()),
        most_visited_location: most_frequent(&destinations).map(|g| g.key.clone()),
        most_visited_locations: ranked(&destinations),
        most_frequent_route: most_frequent(&routes).map(|g| g.key.clone()),
        trips_per_ambulance: count_by(&selected, |trip| trip.ambulance_label().to_string()),
        average_distance_km: average_distance(&selected),
        trips: selected,
    }
}

pub fn status_count(trips: &[Trip], status: TripStatus) -> usize {
    trips.iter().filter(|trip| trip.status == status).count()
}

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    aggregator::{
        self, Bucket, ExpenditureBreakdown, Group, Measure, ReportPayload, SeriesPoint, Totals,
    },
    error::AppError,
    export,
    models::{
        report::{ReportKind, ReportRequest},
        trip::{NewTrip, Trip},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(trips_list).post(trip_create))
        .route("/trips/:id", get(trip_detail).delete(trip_delete))
        .route("/export.csv", get(trips_export))
        .route("/stats/totals", get(stats_totals))
        .route("/stats/expenditures", get(stats_expenditures))
        .route("/stats/series", get(stats_series))
        .route("/stats/groups", get(stats_groups))
        .route("/stats/demand", get(stats_demand))
        .route("/reports", get(report))
}

async fn trips_list(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    Ok(Json(state.trips().await?))
}

async fn trip_create(
    State(state): State<AppState>,
    Json(input): Json<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let trip = state.record_trip(input).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn trip_detail(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .store
        .find_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(trip))
}

async fn trip_delete(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.delete_trip(&trip_id).await?))
}

async fn trips_export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let trips = state.trips().await?;
    let body = export::trips_to_csv(&trips)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"trips.csv\""),
        ],
        body,
    ))
}

async fn stats_totals(State(state): State<AppState>) -> Result<Json<Totals>, AppError> {
    Ok(Json(aggregator::totals(&state.trips().await?)))
}

async fn stats_expenditures(
    State(state): State<AppState>,
) -> Result<Json<ExpenditureBreakdown>, AppError> {
    Ok(Json(aggregator::expenditure_breakdown(&state.trips().await?)))
}

#[derive(Deserialize)]
struct SeriesQuery {
    #[serde(default)]
    bucket: Bucket,
}

async fn stats_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<SeriesPoint>>, AppError> {
    let trips = state.trips().await?;
    Ok(Json(aggregator::time_series(&trips, |ts| query.bucket.label(ts))))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GroupBy {
    Origin,
    Destination,
    PatientStatus,
    Status,
    Ambulance,
    Route,
}

impl GroupBy {
    fn key(&self, trip: &Trip) -> String {
        match self {
            GroupBy::Origin => trip.origin_city.clone(),
            GroupBy::Destination => trip.destination_city.clone(),
            GroupBy::PatientStatus => trip.patient_status.clone(),
            GroupBy::Status => trip.status.to_string(),
            GroupBy::Ambulance => trip.ambulance_label().to_string(),
            GroupBy::Route => trip.route_label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum MeasureKind {
    #[default]
    Count,
    Income,
    Expenditure,
    Distance,
}

impl From<MeasureKind> for Measure {
    fn from(kind: MeasureKind) -> Self {
        match kind {
            MeasureKind::Count => Measure::Count,
            MeasureKind::Income => Measure::Sum(Trip::income),
            MeasureKind::Expenditure => Measure::Sum(Trip::expenditure),
            MeasureKind::Distance => Measure::Sum(Trip::distance),
        }
    }
}

#[derive(Deserialize)]
struct GroupQuery {
    by: GroupBy,
    #[serde(default)]
    measure: MeasureKind,
}

#[derive(Serialize)]
struct GroupsResponse {
    groups: Vec<Group<String>>,
    top: Option<Group<String>>,
}

async fn stats_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
) -> Result<Json<GroupsResponse>, AppError> {
    let trips = state.trips().await?;
    let groups =
        aggregator::group_by_key(&trips, |trip| query.by.key(trip), query.measure.into());
    let top = aggregator::most_frequent(&groups).cloned();
    Ok(Json(GroupsResponse { groups, top }))
}

#[derive(Serialize)]
struct DemandResponse {
    trips_per_day: f64,
    window: usize,
}

async fn stats_demand(State(state): State<AppState>) -> Result<Json<DemandResponse>, AppError> {
    let trips = state.trips().await?;
    Ok(Json(DemandResponse {
        trips_per_day: aggregator::predict_demand(&trips),
        window: aggregator::DEMAND_WINDOW,
    }))
}

#[derive(Serialize)]
struct ReportResponse {
    kind: ReportKind,
    #[serde(flatten)]
    report: ReportPayload,
}

async fn report(
    State(state): State<AppState>,
    Query(request): Query<ReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let range = request.resolve(Utc::now().date_naive())?;
    let trips = state.trips().await?;
    Ok(Json(ReportResponse {
        kind: request.kind,
        report: aggregator::build_report_for(&trips, range),
    }))
}

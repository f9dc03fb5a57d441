use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{DateTime, Local, Utc};

use crate::{
    aggregator::{self, Group},
    error::AppError,
    models::{
        report::ReportRequest,
        trip::{NewTrip, Trip, TripStatus},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/trips/new", post(trip_new_submit))
        .route("/trips/:id/delete", post(trip_delete))
        .route("/report", get(report_page))
}

#[derive(Clone)]
struct TripRow {
    id: String,
    created_at: String,
    patient_name: String,
    patient_status: String,
    origin_city: String,
    destination_city: String,
    ambulance: String,
    distance: String,
    amount_charged: String,
    expenditure: String,
    status: String,
    lead_score: u32,
}

impl From<&Trip> for TripRow {
    fn from(trip: &Trip) -> Self {
        Self {
            id: trip.id.clone(),
            created_at: format_timestamp(trip.created_at),
            patient_name: trip.patient_name.clone(),
            patient_status: trip.patient_status.clone(),
            origin_city: trip.origin_city.clone(),
            destination_city: trip.destination_city.clone(),
            ambulance: trip.ambulance_label().to_string(),
            distance: format!("{:.1} km", trip.distance()),
            amount_charged: money(trip.income()),
            expenditure: money(trip.expenditure()),
            status: trip.status.to_string(),
            lead_score: trip.lead_score(),
        }
    }
}

#[derive(Clone)]
struct AmountRow {
    label: String,
    amount: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    show_error: bool,
    error_message: String,
    income: String,
    expenditure: String,
    profit: String,
    completed: usize,
    cancelled: usize,
    demand: String,
    breakdown: Vec<AmountRow>,
    trips: Vec<TripRow>,
}

async fn dashboard(State(state): State<AppState>) -> Result<Response, AppError> {
    render_dashboard(&state, None, StatusCode::OK).await
}

async fn render_dashboard(
    state: &AppState,
    error: Option<String>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let trips = state.trips().await?;
    let totals = aggregator::totals(&trips);
    let breakdown = aggregator::expenditure_breakdown(&trips)
        .entries()
        .into_iter()
        .map(|(category, amount)| AmountRow {
            label: category.as_str().to_string(),
            amount: money(amount),
        })
        .collect();

    let template = DashboardTemplate {
        show_error: error.is_some(),
        error_message: error.unwrap_or_default(),
        income: money(totals.income),
        expenditure: money(totals.expenditure),
        profit: money(totals.profit),
        completed: aggregator::status_count(&trips, TripStatus::Completed),
        cancelled: aggregator::status_count(&trips, TripStatus::Cancelled),
        demand: format!("{:.2}", aggregator::predict_demand(&trips)),
        breakdown,
        trips: trips.iter().rev().map(TripRow::from).collect(),
    };
    Ok((status, AskamaTemplateResponse::into_response(template)).into_response())
}

async fn trip_new_submit(
    State(state): State<AppState>,
    Form(form): Form<NewTrip>,
) -> Result<Response, AppError> {
    match state.record_trip(form).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(AppError::Validation(msg)) => {
            render_dashboard(&state, Some(msg), StatusCode::BAD_REQUEST).await
        }
        Err(err) => Err(err),
    }
}

async fn trip_delete(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Redirect, AppError> {
    state.delete_trip(&trip_id).await?;
    Ok(Redirect::to("/"))
}

#[derive(Clone)]
struct CountRow {
    label: String,
    count: String,
}

impl From<&Group<String>> for CountRow {
    fn from(group: &Group<String>) -> Self {
        Self {
            label: group.key.clone(),
            count: format!("{}", group.value),
        }
    }
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    kind: String,
    start: String,
    end: String,
    trip_count: usize,
    income: String,
    expenditure: String,
    profit: String,
    average_distance: String,
    most_visited: String,
    most_frequent_route: String,
    breakdown: Vec<AmountRow>,
    patient_statuses: Vec<CountRow>,
    locations: Vec<CountRow>,
    ambulances: Vec<CountRow>,
    trips: Vec<TripRow>,
}

async fn report_page(
    State(state): State<AppState>,
    Query(request): Query<ReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let range = request.resolve(Utc::now().date_naive())?;
    let trips = state.trips().await?;
    let report = aggregator::build_report_for(&trips, range);

    Ok(AskamaTemplateResponse::into_response(ReportTemplate {
        kind: request.kind.to_string(),
        start: report.range.start.to_string(),
        end: report.range.end.to_string(),
        trip_count: report.trip_count,
        income: money(report.totals.income),
        expenditure: money(report.totals.expenditure),
        profit: money(report.totals.profit),
        average_distance: format!("{:.1} km", report.average_distance_km),
        most_visited: report
            .most_visited_location
            .clone()
            .unwrap_or_else(|| "–".into()),
        most_frequent_route: report
            .most_frequent_route
            .clone()
            .unwrap_or_else(|| "–".into()),
        breakdown: report
            .expenditure_breakdown
            .entries()
            .into_iter()
            .map(|(category, amount)| AmountRow {
                label: category.as_str().to_string(),
                amount: money(amount),
            })
            .collect(),
        patient_statuses: report
            .patient_status_distribution
            .iter()
            .map(CountRow::from)
            .collect(),
        locations: report
            .most_visited_locations
            .iter()
            .map(CountRow::from)
            .collect(),
        ambulances: report
            .trips_per_ambulance
            .iter()
            .map(CountRow::from)
            .collect(),
        trips: report.trips.iter().map(TripRow::from).collect(),
    }))
}

fn money(amount: f64) -> String {
    format!("₹{amount:.2}")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%d.%m.%Y %H:%M")
        .to_string()
}

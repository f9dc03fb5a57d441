pub mod api;
pub mod dashboard;

use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(dashboard::router())
        .nest("/api", api::router())
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::services::{notify::NotificationService, storage::StorageService};

    fn app(root: &TempDir) -> Router {
        let state = AppState::new(
            Arc::new(StorageService::new(root.path().join("data"))),
            NotificationService::new(None, "{patient}"),
            None,
        );
        create_router(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn create_then_aggregate_over_json_api() {
        let root = TempDir::new().unwrap();
        let app = app(&root);

        let (status, body) = send(
            &app,
            post_json(
                "/api/trips",
                json!({
                    "patient_name": "Asha",
                    "origin_city": "Pune",
                    "destination_city": "Mumbai",
                    "amount_charged": 1000,
                    "fuel_expense": "400"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body).unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get("/api/stats/totals")).await;
        assert_eq!(status, StatusCode::OK);
        let totals: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(totals, json!({"income": 1000.0, "expenditure": 400.0, "profit": 600.0}));

        let (status, body) = send(&app, get("/api/stats/groups?by=origin")).await;
        assert_eq!(status, StatusCode::OK);
        let groups: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(groups["top"]["key"], "Pune");

        let (status, body) = send(&app, get("/api/export.csv")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains(&id));

        let request = Request::delete(format!("/api/trips/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get(&format!("/api/trips/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_input_and_ranges_are_bad_requests() {
        let root = TempDir::new().unwrap();
        let app = app(&root);

        let (status, body) = send(
            &app,
            post_json(
                "/api/trips",
                json!({
                    "patient_name": "Asha",
                    "origin_city": "Pune",
                    "destination_city": "Mumbai",
                    "amount_charged": -1
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("amount_charged"));

        let (status, _) = send(&app, get("/api/reports?kind=custom&start=2024-01-01")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = "/api/reports?kind=custom&start=2024-01-01&end=2024-01-31";
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        let report: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["kind"], "custom");
        assert_eq!(report["trip_count"], 0);
        assert_eq!(report["average_distance_km"], 0.0);
    }

    #[tokio::test]
    async fn form_submission_redirects_and_dashboard_renders() {
        let root = TempDir::new().unwrap();
        let app = app(&root);

        let form = concat!(
            "patient_name=Ravi&origin_city=Pune&destination_city=Nashik",
            "&amount_charged=750&distance_km=&driver_expense=100",
        );
        let request = Request::post("/trips/new")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, body) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let page = String::from_utf8(body).unwrap();
        assert!(page.contains("Ravi"));
        assert!(page.contains("₹750.00"));

        let (status, body) = send(&app, get("/report?kind=yearly")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Nashik"));
    }
}

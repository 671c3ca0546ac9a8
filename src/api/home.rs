use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::forms::take_flash;
use crate::engine::{authorize, permits, Action, Caller, Ownership};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardCounts {
    pub flights: i64,
    pub passengers: i64,
    pub bookings: i64,
    pub active_bookings: i64,
    pub feedbacks: i64,
}

/// Landing page. Administrators go straight to the dashboard.
pub async fn index(caller: Option<Caller>, jar: CookieJar) -> Response {
    if caller
        .as_ref()
        .is_some_and(|c| permits(c.role, Action::ViewDashboard, Ownership::NotApplicable))
    {
        return Redirect::to("/admin-dashboard").into_response();
    }

    let (jar, flash) = take_flash(jar);
    let body = json!({
        "title": "Airdesk",
        "signed_in_as": caller.as_ref().map(|c| c.email.clone()),
        "flash": flash,
    });
    (jar, Json(body)).into_response()
}

pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<DashboardCounts>, ApiError> {
    authorize(&caller, Action::ViewDashboard, Ownership::NotApplicable)?;

    let (flights, passengers, bookings, active_bookings, feedbacks): (i64, i64, i64, i64, i64) =
        sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM flights),
                (SELECT COUNT(*) FROM passengers),
                (SELECT COUNT(*) FROM bookings),
                (SELECT COUNT(*) FROM bookings WHERE status <> 'Cancelled'),
                (SELECT COUNT(*) FROM feedbacks)
            "#,
        )
        .fetch_one(&state.db)
        .await?;

    Ok(Json(DashboardCounts {
        flights,
        passengers,
        bookings,
        active_bookings,
        feedbacks,
    }))
}

/// Generic error document with an id to quote in support requests
pub async fn error_page() -> impl IntoResponse {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(request_id = %request_id, "Served error page");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "An error occurred while processing your request.",
            "request_id": request_id,
        })),
    )
}

pub async fn health_check() -> &'static str {
    "OK"
}

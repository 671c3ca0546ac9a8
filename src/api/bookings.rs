use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::forms::{split_validation, FormBody, FormRejected};
use crate::db::{BookingDetail, CreateBookingForm, EditBookingForm, SeatMap, TakenSeats};
use crate::engine::bookings::{self, BookingForm, CreateOutcome};
use crate::engine::{flights, Caller};
use crate::notifications;
use crate::AppState;

const REGISTER_PATH: &str = "/passengers/register";

#[derive(Debug, Deserialize)]
pub struct CreateFormQuery {
    pub flight_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TakenSeatsQuery {
    #[serde(rename = "flightId")]
    pub flight_id: i64,
}

/// List bookings visible to the caller
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<BookingDetail>>, ApiError> {
    Ok(Json(bookings::list_bookings(&state.db, &caller).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<BookingDetail>, ApiError> {
    Ok(Json(bookings::get_booking(&state.db, &caller, id).await?))
}

/// Booking form data, or a redirect to passenger registration
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<CreateFormQuery>,
) -> Result<Response, ApiError> {
    match bookings::create_form(&state.db, &caller, Utc::now(), query.flight_id, None).await? {
        BookingForm::Ready(options) => Ok(Json(json!({ "options": options })).into_response()),
        BookingForm::NeedsPassengerProfile => Ok(Redirect::to(REGISTER_PATH).into_response()),
    }
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    WithRejection(Form(form), _): FormBody<CreateBookingForm>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let result = bookings::create_booking(&state.db, &caller, &form, now).await;

    match split_validation(result)? {
        Ok(CreateOutcome::Created {
            booking,
            flight,
            passenger,
        }) => {
            notifications::notify_booking_confirmed(
                state.notifier.clone(),
                &passenger,
                &flight,
                &booking,
            );
            Ok(Redirect::to("/bookings").into_response())
        }
        Ok(CreateOutcome::NeedsPassengerProfile) => Ok(Redirect::to(REGISTER_PATH).into_response()),
        Err(errors) => {
            let options = match bookings::create_form(
                &state.db,
                &caller,
                now,
                form.flight_id,
                form.passenger_id,
            )
            .await?
            {
                BookingForm::Ready(options) => options,
                BookingForm::NeedsPassengerProfile => {
                    return Ok(Redirect::to(REGISTER_PATH).into_response())
                }
            };
            Ok(FormRejected::new(errors, form, options).into_response())
        }
    }
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (booking, options) = bookings::edit_form(&state.db, &caller, id).await?;
    Ok(Json(json!({ "booking": booking, "options": options })))
}

pub async fn edit_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    WithRejection(Form(form), _): FormBody<EditBookingForm>,
) -> Result<Response, ApiError> {
    let result = bookings::edit_booking(&state.db, &caller, id, &form).await;

    match split_validation(result)? {
        Ok(_) => Ok(Redirect::to("/bookings").into_response()),
        Err(errors) => {
            let options =
                bookings::edit_options(&state.db, form.flight_id, form.passenger_id).await?;
            Ok(FormRejected::new(errors, form, options).into_response())
        }
    }
}

/// Confirmation data shown before deleting
pub async fn delete_confirmation(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<BookingDetail>, ApiError> {
    Ok(Json(bookings::delete_confirmation(&state.db, &caller, id).await?))
}

/// Delete a booking; unknown ids redirect the same way
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    bookings::delete_booking(&state.db, &caller, id).await?;
    Ok(Redirect::to("/bookings"))
}

/// Seats held on a flight, for the seat picker
pub async fn taken_seats(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Query(query): Query<TakenSeatsQuery>,
) -> Result<Json<TakenSeats>, ApiError> {
    Ok(Json(flights::taken_seats(&state.db, query.flight_id).await?))
}

pub async fn seat_map(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<SeatMap>, ApiError> {
    Ok(Json(flights::seat_map(&state.db, id).await?))
}

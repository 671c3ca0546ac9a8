use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::forms::{split_validation, FormBody, FormRejected};
use crate::db::{Passenger, PassengerForm, PassengerWithBookingCount};
use crate::engine::passengers::{self, Registration};
use crate::engine::{authorize, Action, Caller, Ownership};
use crate::notifications;
use crate::AppState;

/// Where a new passenger continues after creating a profile
const AFTER_CREATE_PATH: &str = "/bookings/create";

fn require_manage(caller: &Caller) -> Result<(), ApiError> {
    authorize(caller, Action::ManagePassengers, Ownership::NotApplicable)?;
    Ok(())
}

pub async fn list_passengers(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<PassengerWithBookingCount>>, ApiError> {
    require_manage(&caller)?;
    Ok(Json(passengers::list_passengers(&state.db).await?))
}

pub async fn get_passenger(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Passenger>, ApiError> {
    require_manage(&caller)?;
    Ok(Json(passengers::get_passenger(&state.db, id).await?))
}

/// Empty create form
pub async fn create_form(caller: Caller) -> Result<Json<serde_json::Value>, ApiError> {
    require_manage(&caller)?;
    Ok(Json(json!({
        "form": {
            "full_name": "",
            "passport_number": "",
            "contact_email": "",
            "phone_number": "",
        }
    })))
}

pub async fn create_passenger(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    WithRejection(Form(form), _): FormBody<PassengerForm>,
) -> Result<Response, ApiError> {
    require_manage(&caller)?;

    match split_validation(passengers::create_passenger(&state.db, &form).await)? {
        Ok(passenger) => {
            notifications::notify_passenger_welcome(state.notifier.clone(), &passenger);
            Ok(Redirect::to(AFTER_CREATE_PATH).into_response())
        }
        Err(errors) => Ok(FormRejected::new(errors, form, json!({})).into_response()),
    }
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Passenger>, ApiError> {
    require_manage(&caller)?;
    Ok(Json(passengers::get_passenger(&state.db, id).await?))
}

pub async fn edit_passenger(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    WithRejection(Form(form), _): FormBody<PassengerForm>,
) -> Result<Response, ApiError> {
    require_manage(&caller)?;

    match split_validation(passengers::update_passenger(&state.db, id, &form).await)? {
        Ok(_) => Ok(Redirect::to("/passengers").into_response()),
        Err(errors) => Ok(FormRejected::new(errors, form, json!({})).into_response()),
    }
}

pub async fn delete_passenger(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    require_manage(&caller)?;
    passengers::delete_passenger(&state.db, id).await?;
    Ok(Redirect::to("/passengers"))
}

/// Self-registration form, pre-filled from the caller's identity
pub async fn register_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, ApiError> {
    if passengers::find_by_email(&state.db, &caller.email).await?.is_some() {
        return Ok(Redirect::to(AFTER_CREATE_PATH).into_response());
    }

    Ok(Json(json!({
        "form": {
            "full_name": caller.name,
            "passport_number": "",
            "contact_email": caller.email,
            "phone_number": "",
        }
    }))
    .into_response())
}

pub async fn register_passenger(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    WithRejection(Form(form), _): FormBody<PassengerForm>,
) -> Result<Response, ApiError> {
    match split_validation(passengers::register_passenger(&state.db, &caller, &form).await)? {
        Ok(Registration::Created(passenger)) => {
            notifications::notify_passenger_welcome(state.notifier.clone(), &passenger);
            Ok(Redirect::to(AFTER_CREATE_PATH).into_response())
        }
        Ok(Registration::AlreadyRegistered(_)) => {
            Ok(Redirect::to(AFTER_CREATE_PATH).into_response())
        }
        Err(errors) => {
            let mut form = form;
            form.contact_email = caller.email.clone();
            Ok(FormRejected::new(errors, form, json!({})).into_response())
        }
    }
}

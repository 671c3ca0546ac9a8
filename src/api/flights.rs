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
use crate::db::{Flight, FlightForm};
use crate::engine::{authorize, flights, Action, Caller, Ownership};
use crate::AppState;

pub async fn list_flights(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Result<Json<Vec<Flight>>, ApiError> {
    Ok(Json(flights::list_flights(&state.db).await?))
}

pub async fn get_flight(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Flight>, ApiError> {
    Ok(Json(flights::get_flight(&state.db, id).await?))
}

pub async fn create_flight(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    WithRejection(Form(form), _): FormBody<FlightForm>,
) -> Result<Response, ApiError> {
    authorize(&caller, Action::ManageFlights, Ownership::NotApplicable)?;

    match split_validation(flights::create_flight(&state.db, &form).await)? {
        Ok(_) => Ok(Redirect::to("/flights").into_response()),
        Err(errors) => Ok(FormRejected::new(errors, form, json!({})).into_response()),
    }
}

pub async fn edit_flight(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    WithRejection(Form(form), _): FormBody<FlightForm>,
) -> Result<Response, ApiError> {
    authorize(&caller, Action::ManageFlights, Ownership::NotApplicable)?;

    match split_validation(flights::update_flight(&state.db, id, &form).await)? {
        Ok(_) => Ok(Redirect::to("/flights").into_response()),
        Err(errors) => Ok(FormRejected::new(errors, form, json!({})).into_response()),
    }
}

pub async fn delete_flight(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    authorize(&caller, Action::ManageFlights, Ownership::NotApplicable)?;
    flights::delete_flight(&state.db, id).await?;
    Ok(Redirect::to("/flights"))
}

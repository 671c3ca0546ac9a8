use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::forms::{flash_redirect, split_validation, FormBody, FormRejected};
use crate::db::{CreateFeedbackForm, EditFeedbackForm, FeedbackDetail};
use crate::engine::feedback::{self, FeedbackForm, FeedbackOutcome, NOT_ELIGIBLE_MESSAGE};
use crate::engine::{authorize, Action, Caller, Ownership};
use crate::AppState;

pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FeedbackDetail>>, ApiError> {
    Ok(Json(feedback::list_feedback(&state.db).await?))
}

pub async fn get_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackDetail>, ApiError> {
    Ok(Json(feedback::get_feedback(&state.db, id).await?))
}

/// Review form for the caller's completed flights
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    match feedback::create_form(&state.db, &caller, Utc::now(), None).await? {
        FeedbackForm::Ready(options) => Ok(Json(json!({ "options": options })).into_response()),
        FeedbackForm::NotEligible => {
            Ok(flash_redirect(jar, NOT_ELIGIBLE_MESSAGE, "/").into_response())
        }
    }
}

pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    jar: CookieJar,
    WithRejection(Form(form), _): FormBody<CreateFeedbackForm>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let result = feedback::create_feedback(&state.db, &caller, &form, now).await;

    match split_validation(result)? {
        Ok(FeedbackOutcome::Created(_)) => Ok(Redirect::to("/").into_response()),
        Ok(FeedbackOutcome::NotEligible) => {
            Ok(flash_redirect(jar, NOT_ELIGIBLE_MESSAGE, "/").into_response())
        }
        Err(errors) => {
            match feedback::create_form(&state.db, &caller, now, form.flight_id).await? {
                FeedbackForm::Ready(options) => {
                    Ok(FormRejected::new(errors, form, options).into_response())
                }
                FeedbackForm::NotEligible => {
                    Ok(flash_redirect(jar, NOT_ELIGIBLE_MESSAGE, "/").into_response())
                }
            }
        }
    }
}

/// Administrator edit form
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackDetail>, ApiError> {
    authorize(&caller, Action::EditFeedback, Ownership::NotApplicable)?;
    Ok(Json(feedback::get_feedback(&state.db, id).await?))
}

pub async fn edit_feedback(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    WithRejection(Form(form), _): FormBody<EditFeedbackForm>,
) -> Result<Response, ApiError> {
    let result = feedback::update_feedback(&state.db, &caller, id, &form).await;

    match split_validation(result)? {
        Ok(_) => Ok(Redirect::to("/feedbacks").into_response()),
        Err(errors) => Ok(FormRejected::new(errors, form, json!({})).into_response()),
    }
}

pub async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    feedback::delete_feedback(&state.db, &caller, id).await?;
    Ok(Redirect::to("/feedbacks"))
}

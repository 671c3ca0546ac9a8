//! Feedback ledger.
//!
//! A caller may review a flight only when they hold an active booking on it
//! and it departed before `now`. Eligibility is evaluated both when the form
//! is prepared and again when it is submitted.

use chrono::{DateTime, Utc};
use tracing::info;

use super::flights::{self, review_label};
use super::passengers::find_by_email;
use super::policy::{authorize, Action, Caller, Ownership};
use super::validation::{
    normalize_email, validate_comments, validate_rating, validate_required, FieldErrors,
};
use super::{EngineError, EngineResult};
use crate::db::{
    timestamp, CreateFeedbackForm, EditFeedbackForm, Feedback, FeedbackDetail,
    FeedbackFormOptions, Flight,
};
use crate::DbPool;

/// Message shown when a caller has nothing to review
pub const NOT_ELIGIBLE_MESSAGE: &str = "You can only review flights you have already completed.";

const DETAIL_QUERY: &str = r#"
    SELECT fb.id, fb.customer_name, fb.comments, fb.rating, fb.flight_id,
           f.flight_number, f.origin, f.destination
    FROM feedbacks fb
    JOIN flights f ON f.id = fb.flight_id
"#;

#[derive(Debug)]
pub enum FeedbackForm {
    Ready(FeedbackFormOptions),
    NotEligible,
}

#[derive(Debug)]
pub enum FeedbackOutcome {
    Created(Feedback),
    NotEligible,
}

pub async fn list_feedback(pool: &DbPool) -> EngineResult<Vec<FeedbackDetail>> {
    let feedback =
        sqlx::query_as::<_, FeedbackDetail>(&format!("{} ORDER BY fb.id DESC", DETAIL_QUERY))
            .fetch_all(pool)
            .await?;
    Ok(feedback)
}

pub async fn get_feedback(pool: &DbPool, id: i64) -> EngineResult<FeedbackDetail> {
    sqlx::query_as::<_, FeedbackDetail>(&format!("{} WHERE fb.id = ?", DETAIL_QUERY))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound("Feedback"))
}

/// Completed flights the caller holds an active booking on
pub async fn eligible_flights(
    pool: &DbPool,
    caller: &Caller,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Flight>> {
    let flights = sqlx::query_as::<_, Flight>(
        r#"
        SELECT DISTINCT f.*
        FROM flights f
        JOIN bookings b ON b.flight_id = f.id
        JOIN passengers p ON p.id = b.passenger_id
        WHERE p.contact_email = ?
          AND b.status <> 'Cancelled'
          AND f.departure_time < ?
        ORDER BY f.departure_time DESC, f.id
        "#,
    )
    .bind(normalize_email(&caller.email))
    .bind(timestamp(now))
    .fetch_all(pool)
    .await?;
    Ok(flights)
}

/// Name pre-filled on the form: the passenger's full name, else the login email
async fn default_customer_name(pool: &DbPool, caller: &Caller) -> EngineResult<String> {
    Ok(find_by_email(pool, &caller.email)
        .await?
        .map(|p| p.full_name)
        .unwrap_or_else(|| caller.email.clone()))
}

pub async fn create_form(
    pool: &DbPool,
    caller: &Caller,
    now: DateTime<Utc>,
    selected_flight: Option<i64>,
) -> EngineResult<FeedbackForm> {
    authorize(caller, Action::CreateFeedback, Ownership::NotApplicable)?;

    let eligible = eligible_flights(pool, caller, now).await?;
    if eligible.is_empty() {
        return Ok(FeedbackForm::NotEligible);
    }

    Ok(FeedbackForm::Ready(FeedbackFormOptions {
        flights: flights::options(&eligible, review_label, selected_flight),
        customer_name: default_customer_name(pool, caller).await?,
    }))
}

fn validate_review(customer_name: &str, comments: &str, rating: Option<i64>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check("customer_name", validate_required(customer_name, "Name", 100));
    errors.check("comments", validate_comments(comments));
    match rating {
        Some(rating) => {
            errors.check("rating", validate_rating(rating));
        }
        None => {
            errors.add("rating", "Rating is required");
        }
    }
    errors
}

pub async fn create_feedback(
    pool: &DbPool,
    caller: &Caller,
    form: &CreateFeedbackForm,
    now: DateTime<Utc>,
) -> EngineResult<FeedbackOutcome> {
    authorize(caller, Action::CreateFeedback, Ownership::NotApplicable)?;

    let eligible = eligible_flights(pool, caller, now).await?;
    if eligible.is_empty() {
        return Ok(FeedbackOutcome::NotEligible);
    }

    let mut errors = validate_review(&form.customer_name, &form.comments, form.rating);
    match form.flight_id {
        None => {
            errors.add("flight_id", "Flight is required");
        }
        Some(id) if !eligible.iter().any(|f| f.id == id) => {
            errors.add("flight_id", "You can only review a flight you have completed");
        }
        Some(_) => {}
    }
    errors.finish()?;
    let (Some(flight_id), Some(rating)) = (form.flight_id, form.rating) else {
        return Err(EngineError::invalid("flight_id", "Flight is required"));
    };

    let result = sqlx::query(
        "INSERT INTO feedbacks (customer_name, comments, rating, flight_id) VALUES (?, ?, ?, ?)",
    )
    .bind(form.customer_name.trim())
    .bind(form.comments.trim())
    .bind(rating)
    .bind(flight_id)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    info!(feedback_id = id, flight_id, rating, "Feedback created");

    Ok(FeedbackOutcome::Created(Feedback {
        id,
        customer_name: form.customer_name.trim().to_string(),
        comments: form.comments.trim().to_string(),
        rating,
        flight_id,
    }))
}

pub async fn update_feedback(
    pool: &DbPool,
    caller: &Caller,
    path_id: i64,
    form: &EditFeedbackForm,
) -> EngineResult<FeedbackDetail> {
    authorize(caller, Action::EditFeedback, Ownership::NotApplicable)?;
    if path_id != form.id {
        return Err(EngineError::NotFound("Feedback"));
    }
    validate_review(&form.customer_name, &form.comments, form.rating).finish()?;
    let Some(rating) = form.rating else {
        return Err(EngineError::invalid("rating", "Rating is required"));
    };

    let result = sqlx::query(
        "UPDATE feedbacks SET customer_name = ?, comments = ?, rating = ? WHERE id = ?",
    )
    .bind(form.customer_name.trim())
    .bind(form.comments.trim())
    .bind(rating)
    .bind(path_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound("Feedback"));
    }

    info!(feedback_id = path_id, "Feedback updated");
    get_feedback(pool, path_id).await
}

/// Delete a review. Absent ids are not an error.
pub async fn delete_feedback(pool: &DbPool, caller: &Caller, id: i64) -> EngineResult<bool> {
    authorize(caller, Action::DeleteFeedback, Ownership::NotApplicable)?;

    let result = sqlx::query("DELETE FROM feedbacks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(feedback_id = id, "Feedback deleted");
    }
    Ok(deleted)
}

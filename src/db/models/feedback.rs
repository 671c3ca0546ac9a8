//! Customer feedback models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::form::SelectOption;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub customer_name: String,
    pub comments: String,
    pub rating: i64,
    pub flight_id: i64,
}

/// Feedback joined with the reviewed flight
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackDetail {
    pub id: i64,
    pub customer_name: String,
    pub comments: String,
    pub rating: i64,
    pub flight_id: i64,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackForm {
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub flight_id: Option<i64>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub rating: Option<i64>,
}

/// Administrator edit form; the reviewed flight cannot change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFeedbackForm {
    pub id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub rating: Option<i64>,
}

/// Dropdown data for the feedback form
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackFormOptions {
    pub flights: Vec<SelectOption>,
    pub customer_name: String,
}

//! Passenger directory models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Passenger {
    pub id: i64,
    pub full_name: String,
    pub passport_number: String,
    /// Correlates the record with a login identity
    pub contact_email: String,
    pub phone_number: String,
}

/// Create/edit form for a passenger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerForm {
    #[serde(default, deserialize_with = "super::form::empty_string_as_none")]
    pub id: Option<i64>,
    pub full_name: String,
    pub passport_number: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Passenger count summary for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct PassengerWithBookingCount {
    #[serde(flatten)]
    pub passenger: Passenger,
    pub booking_count: i64,
}

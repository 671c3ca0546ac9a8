//! Booking models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::form::SelectOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Seat reserved; every booking starts here
    Confirmed,
    CheckedIn,
    /// Seat released
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still holds its seat
    pub fn holds_seat(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "Confirmed"),
            Self::CheckedIn => write!(f, "CheckedIn"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "booked" => Ok(Self::Confirmed),
            "checkedin" | "checked_in" | "checked-in" => Ok(Self::CheckedIn),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub flight_id: i64,
    pub passenger_id: i64,
    pub seat_number: String,
    pub booking_date: String,
    pub status: String,
    /// Bumped on every edit; stale edits are refused
    pub version: i64,
}

/// Booking joined with its flight and passenger for list and detail views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingDetail {
    pub id: i64,
    pub flight_id: i64,
    pub passenger_id: i64,
    pub seat_number: String,
    pub booking_date: String,
    pub status: String,
    pub version: i64,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub passenger_name: String,
    pub passenger_email: String,
}

/// Booking creation form.
///
/// `status` and `booking_date` are accepted so that old clients keep
/// working, but the server always assigns both itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingForm {
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub flight_id: Option<i64>,
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub passenger_id: Option<i64>,
    #[serde(default)]
    pub seat_number: String,
    #[serde(default, deserialize_with = "super::form::blank_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "super::form::blank_as_none")]
    pub booking_date: Option<String>,
}

/// Administrator edit form for a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditBookingForm {
    pub id: i64,
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub flight_id: Option<i64>,
    #[serde(default, deserialize_with = "super::form::lenient_number")]
    pub passenger_id: Option<i64>,
    #[serde(default)]
    pub seat_number: String,
    pub status: String,
    pub version: i64,
    #[serde(default, deserialize_with = "super::form::blank_as_none")]
    pub booking_date: Option<String>,
}

/// Who the booking is for, as offered by the create form
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PassengerChoice {
    /// Customers always book for themselves
    Fixed { passenger_id: i64 },
    /// Administrators pick any passenger
    List { passengers: Vec<SelectOption> },
}

/// Dropdown data for the booking create/edit forms
#[derive(Debug, Clone, Serialize)]
pub struct BookingFormOptions {
    pub flights: Vec<SelectOption>,
    pub passenger: PassengerChoice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_display() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::CheckedIn,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<BookingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!("Booked".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert_eq!("checked-in".parse::<BookingStatus>().unwrap(), BookingStatus::CheckedIn);
        assert_eq!("canceled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("lost".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_only_cancelled_releases_seat() {
        assert!(BookingStatus::Confirmed.holds_seat());
        assert!(BookingStatus::CheckedIn.holds_seat());
        assert!(!BookingStatus::Cancelled.holds_seat());
    }
}

//! Flight catalog models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Capacity assumed for flights whose stored seat count is unknown (0 or less)
pub const DEFAULT_SEAT_CAPACITY: i64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Flight {
    pub id: i64,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub aircraft_type: String,
    pub total_seats: i64,
}

impl Flight {
    /// Seat capacity with the legacy-row fallback applied
    pub fn capacity(&self) -> i64 {
        effective_capacity(Some(self.total_seats))
    }

    /// Departure date for dropdown labels
    pub fn departure_date(&self) -> String {
        crate::db::parse_timestamp(&self.departure_time)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.departure_time.clone())
    }
}

/// Resolve the usable capacity of a flight, `None` meaning the flight is unknown
pub fn effective_capacity(stored: Option<i64>) -> i64 {
    match stored {
        Some(seats) if seats > 0 => seats,
        _ => DEFAULT_SEAT_CAPACITY,
    }
}

/// Create/edit form for a flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightForm {
    #[serde(default, deserialize_with = "super::form::empty_string_as_none")]
    pub id: Option<i64>,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    #[serde(default)]
    pub aircraft_type: String,
    #[serde(default)]
    pub total_seats: i64,
}

/// Seat map of one flight: capacity and the labels held by active bookings
#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub flight_id: i64,
    pub capacity: i64,
    pub taken: Vec<String>,
    pub remaining: i64,
}

impl SeatMap {
    pub fn new(flight_id: i64, capacity: i64, taken: Vec<String>) -> Self {
        let remaining = (capacity - taken.len() as i64).max(0);
        Self {
            flight_id,
            capacity,
            taken,
            remaining,
        }
    }

    pub fn is_taken(&self, seat_number: &str) -> bool {
        self.taken.iter().any(|s| s == seat_number)
    }

    pub fn is_full(&self) -> bool {
        self.remaining == 0
    }
}

/// Payload of `GET /bookings/taken-seats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakenSeats {
    pub taken: Vec<String>,
    pub capacity: i64,
}

impl From<SeatMap> for TakenSeats {
    fn from(map: SeatMap) -> Self {
        Self {
            taken: map.taken,
            capacity: map.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_fallback() {
        assert_eq!(effective_capacity(Some(0)), 20);
        assert_eq!(effective_capacity(Some(-3)), 20);
        assert_eq!(effective_capacity(None), 20);
        assert_eq!(effective_capacity(Some(150)), 150);
    }

    #[test]
    fn test_seat_map_remaining_never_negative() {
        let map = SeatMap::new(1, 1, vec!["1A".to_string(), "1B".to_string()]);
        assert_eq!(map.remaining, 0);
        assert!(map.is_full());
        assert!(map.is_taken("1B"));
        assert!(!map.is_taken("2A"));
    }
}

//! Flight catalog operations and seat availability.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use super::validation::{validate_flight_number, validate_optional, validate_required, FieldErrors};
use super::{is_unique_violation, EngineError, EngineResult};
use crate::db::{
    effective_capacity, parse_timestamp, timestamp, Flight, FlightForm, SeatMap, SelectOption,
    TakenSeats,
};
use crate::DbPool;

/// Flight form after validation and normalization
#[derive(Debug, Clone)]
struct ValidFlight {
    flight_number: String,
    origin: String,
    destination: String,
    departure_time: String,
    arrival_time: String,
    aircraft_type: String,
    total_seats: i64,
}

fn validate_flight_form(form: &FlightForm) -> EngineResult<ValidFlight> {
    let mut errors = FieldErrors::new();

    let flight_number = form.flight_number.trim().to_uppercase();
    errors.check("flight_number", validate_flight_number(&flight_number));
    errors.check("origin", validate_required(&form.origin, "Origin", 100));
    errors.check("destination", validate_required(&form.destination, "Destination", 100));
    errors.check("aircraft_type", validate_optional(&form.aircraft_type, "Aircraft type", 50));

    if form.total_seats < 0 {
        errors.add("total_seats", "Seat capacity cannot be negative");
    }

    let departure = parse_timestamp(&form.departure_time);
    let arrival = parse_timestamp(&form.arrival_time);
    if departure.is_none() {
        errors.add("departure_time", "Departure time must be an RFC 3339 timestamp");
    }
    if arrival.is_none() {
        errors.add("arrival_time", "Arrival time must be an RFC 3339 timestamp");
    }
    if let (Some(departure), Some(arrival)) = (departure, arrival) {
        if arrival <= departure {
            errors.add("arrival_time", "Arrival must be after departure");
        }
    }

    errors.finish()?;

    // Both parsed successfully once errors are empty
    let (Some(departure), Some(arrival)) = (departure, arrival) else {
        return Err(EngineError::invalid("departure_time", "Invalid timestamps"));
    };

    Ok(ValidFlight {
        flight_number,
        origin: form.origin.trim().to_string(),
        destination: form.destination.trim().to_string(),
        departure_time: timestamp(departure),
        arrival_time: timestamp(arrival),
        aircraft_type: form.aircraft_type.trim().to_string(),
        total_seats: form.total_seats,
    })
}

fn duplicate_flight_number(number: &str) -> EngineError {
    EngineError::invalid(
        "flight_number",
        format!("Flight number {} already exists", number),
    )
}

/// Whether the flight departs strictly after `now`
pub fn departs_after(flight: &Flight, now: DateTime<Utc>) -> bool {
    parse_timestamp(&flight.departure_time).is_some_and(|t| t > now)
}

/// All flights ordered by departure
pub async fn list_flights(pool: &DbPool) -> EngineResult<Vec<Flight>> {
    let flights = sqlx::query_as::<_, Flight>("SELECT * FROM flights ORDER BY departure_time, id")
        .fetch_all(pool)
        .await?;
    Ok(flights)
}

/// Flights that have not departed yet
pub async fn future_flights(pool: &DbPool, now: DateTime<Utc>) -> EngineResult<Vec<Flight>> {
    let flights = sqlx::query_as::<_, Flight>(
        "SELECT * FROM flights WHERE departure_time > ? ORDER BY departure_time, id",
    )
    .bind(timestamp(now))
    .fetch_all(pool)
    .await?;
    Ok(flights)
}

pub(crate) async fn fetch_flight(
    conn: &mut SqliteConnection,
    id: i64,
) -> EngineResult<Option<Flight>> {
    let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flights WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(flight)
}

pub async fn get_flight(pool: &DbPool, id: i64) -> EngineResult<Flight> {
    sqlx::query_as::<_, Flight>("SELECT * FROM flights WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound("Flight"))
}

pub async fn create_flight(pool: &DbPool, form: &FlightForm) -> EngineResult<Flight> {
    let valid = validate_flight_form(form)?;

    let result = sqlx::query(
        r#"
        INSERT INTO flights
            (flight_number, origin, destination, departure_time, arrival_time,
             aircraft_type, total_seats)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&valid.flight_number)
    .bind(&valid.origin)
    .bind(&valid.destination)
    .bind(&valid.departure_time)
    .bind(&valid.arrival_time)
    .bind(&valid.aircraft_type)
    .bind(valid.total_seats)
    .execute(pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            return Err(duplicate_flight_number(&valid.flight_number))
        }
        Err(e) => return Err(e.into()),
    };

    info!(flight_id = id, flight_number = %valid.flight_number, "Flight created");
    get_flight(pool, id).await
}

pub async fn update_flight(pool: &DbPool, path_id: i64, form: &FlightForm) -> EngineResult<Flight> {
    if form.id != Some(path_id) {
        return Err(EngineError::NotFound("Flight"));
    }
    let valid = validate_flight_form(form)?;

    let result = sqlx::query(
        r#"
        UPDATE flights
        SET flight_number = ?, origin = ?, destination = ?, departure_time = ?,
            arrival_time = ?, aircraft_type = ?, total_seats = ?
        WHERE id = ?
        "#,
    )
    .bind(&valid.flight_number)
    .bind(&valid.origin)
    .bind(&valid.destination)
    .bind(&valid.departure_time)
    .bind(&valid.arrival_time)
    .bind(&valid.aircraft_type)
    .bind(valid.total_seats)
    .bind(path_id)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => return Err(EngineError::NotFound("Flight")),
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(duplicate_flight_number(&valid.flight_number))
        }
        Err(e) => return Err(e.into()),
    }

    info!(flight_id = path_id, "Flight updated");
    get_flight(pool, path_id).await
}

/// Delete a flight and, by cascade, its bookings and feedback.
/// Returns whether a row was removed; an absent id is not an error.
pub async fn delete_flight(pool: &DbPool, id: i64) -> EngineResult<bool> {
    let result = sqlx::query("DELETE FROM flights WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(flight_id = id, "Flight deleted");
    }
    Ok(deleted)
}

/// Seat labels held by active bookings on a flight, optionally ignoring one booking
pub(crate) async fn active_seats(
    conn: &mut SqliteConnection,
    flight_id: i64,
    except_booking: Option<i64>,
) -> EngineResult<Vec<String>> {
    let seats: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT seat_number FROM bookings
        WHERE flight_id = ? AND status <> 'Cancelled' AND id <> ?
        ORDER BY seat_number
        "#,
    )
    .bind(flight_id)
    .bind(except_booking.unwrap_or(-1))
    .fetch_all(&mut *conn)
    .await?;

    Ok(seats.into_iter().map(|(s,)| s).collect())
}

/// Capacity and taken seats of an existing flight
pub async fn seat_map(pool: &DbPool, flight_id: i64) -> EngineResult<SeatMap> {
    let mut conn = pool.acquire().await?;
    let flight = fetch_flight(&mut conn, flight_id)
        .await?
        .ok_or(EngineError::NotFound("Flight"))?;
    let taken = active_seats(&mut conn, flight_id, None).await?;
    Ok(SeatMap::new(flight.id, flight.capacity(), taken))
}

/// Seat picker data. Unknown flights report no taken seats and the default capacity.
pub async fn taken_seats(pool: &DbPool, flight_id: i64) -> EngineResult<TakenSeats> {
    let mut conn = pool.acquire().await?;
    let flight = fetch_flight(&mut conn, flight_id).await?;
    let taken = active_seats(&mut conn, flight_id, None).await?;
    let capacity = effective_capacity(flight.map(|f| f.total_seats));
    Ok(SeatMap::new(flight_id, capacity, taken).into())
}

/// Dropdown label used by the booking form
pub fn booking_label(flight: &Flight) -> String {
    format!(
        "{}: {} ➝ {} ({})",
        flight.flight_number,
        flight.origin,
        flight.destination,
        flight.departure_date()
    )
}

/// Dropdown label used by the feedback form
pub fn review_label(flight: &Flight) -> String {
    format!(
        "{} ({} -> {}) - {}",
        flight.flight_number,
        flight.origin,
        flight.destination,
        flight.departure_date()
    )
}

pub fn options(
    flights: &[Flight],
    label: fn(&Flight) -> String,
    selected: Option<i64>,
) -> Vec<SelectOption> {
    flights
        .iter()
        .map(|f| SelectOption::new(f.id, label(f), selected))
        .collect()
}

//! Booking engine.
//!
//! Seat reservations are checked and written inside one transaction, backed
//! by the `idx_bookings_active_seat` partial unique index. A booking's status
//! and date are always assigned by the server on creation.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use super::flights::{self, active_seats, booking_label, departs_after, fetch_flight};
use super::passengers::{find_by_email, passenger_options};
use super::policy::{authorize, Action, BookingScope, Caller, Ownership};
use super::validation::{normalize_seat, validate_seat_number, FieldErrors};
use super::{is_unique_violation, EngineError, EngineResult};
use crate::db::{
    begin_write, timestamp, Booking, BookingDetail, BookingFormOptions, BookingStatus,
    CreateBookingForm, EditBookingForm, Flight, Passenger, PassengerChoice, SeatMap,
};
use crate::DbPool;

const DETAIL_QUERY: &str = r#"
    SELECT b.id, b.flight_id, b.passenger_id, b.seat_number, b.booking_date, b.status, b.version,
           f.flight_number, f.origin, f.destination, f.departure_time,
           p.full_name AS passenger_name, p.contact_email AS passenger_email
    FROM bookings b
    JOIN flights f ON f.id = b.flight_id
    JOIN passengers p ON p.id = b.passenger_id
"#;

/// Result of preparing the booking form
#[derive(Debug)]
pub enum BookingForm {
    Ready(BookingFormOptions),
    /// The caller must register a passenger profile first
    NeedsPassengerProfile,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created {
        booking: Booking,
        flight: Flight,
        passenger: Passenger,
    },
    NeedsPassengerProfile,
}

fn seat_taken(seat: &str) -> String {
    format!("Seat {} is already taken on this flight", seat)
}

/// Bookings visible to the caller, newest first
pub async fn list_bookings(pool: &DbPool, caller: &Caller) -> EngineResult<Vec<BookingDetail>> {
    let bookings = match BookingScope::for_caller(caller) {
        BookingScope::All => {
            sqlx::query_as::<_, BookingDetail>(&format!(
                "{} ORDER BY b.booking_date DESC, b.id DESC",
                DETAIL_QUERY
            ))
            .fetch_all(pool)
            .await?
        }
        BookingScope::Contact(email) => {
            sqlx::query_as::<_, BookingDetail>(&format!(
                "{} WHERE p.contact_email = ? ORDER BY b.booking_date DESC, b.id DESC",
                DETAIL_QUERY
            ))
            .bind(email)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(bookings)
}

async fn fetch_detail(pool: &DbPool, id: i64) -> EngineResult<Option<BookingDetail>> {
    let detail = sqlx::query_as::<_, BookingDetail>(&format!("{} WHERE b.id = ?", DETAIL_QUERY))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(detail)
}

async fn fetch_booking(conn: &mut SqliteConnection, id: i64) -> EngineResult<Option<Booking>> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(booking)
}

async fn passenger_exists(conn: &mut SqliteConnection, id: i64) -> EngineResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM passengers WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

pub async fn get_booking(pool: &DbPool, caller: &Caller, id: i64) -> EngineResult<BookingDetail> {
    let detail = fetch_detail(pool, id)
        .await?
        .ok_or(EngineError::NotFound("Booking"))?;
    authorize(caller, Action::ViewBooking, caller.ownership_of(&detail.passenger_email))?;
    Ok(detail)
}

/// Booking shown on the delete confirmation page
pub async fn delete_confirmation(
    pool: &DbPool,
    caller: &Caller,
    id: i64,
) -> EngineResult<BookingDetail> {
    let detail = fetch_detail(pool, id)
        .await?
        .ok_or(EngineError::NotFound("Booking"))?;
    authorize(caller, Action::DeleteBooking, caller.ownership_of(&detail.passenger_email))?;
    Ok(detail)
}

/// Dropdown data for the create form: upcoming flights, and either every
/// passenger (admins) or the caller's own profile.
pub async fn create_form(
    pool: &DbPool,
    caller: &Caller,
    now: DateTime<Utc>,
    selected_flight: Option<i64>,
    selected_passenger: Option<i64>,
) -> EngineResult<BookingForm> {
    authorize(caller, Action::CreateBooking, Ownership::NotApplicable)?;

    let passenger = match BookingScope::for_caller(caller) {
        BookingScope::All => PassengerChoice::List {
            passengers: passenger_options(pool, selected_passenger).await?,
        },
        BookingScope::Contact(email) => match find_by_email(pool, &email).await? {
            Some(p) => PassengerChoice::Fixed { passenger_id: p.id },
            None => return Ok(BookingForm::NeedsPassengerProfile),
        },
    };

    let upcoming = flights::future_flights(pool, now).await?;
    Ok(BookingForm::Ready(BookingFormOptions {
        flights: flights::options(&upcoming, booking_label, selected_flight),
        passenger,
    }))
}

/// Resolve who a new booking is for. Callers scoped to their own contact
/// email always book for themselves.
async fn resolve_passenger(
    pool: &DbPool,
    scope: &BookingScope,
    form: &CreateBookingForm,
) -> EngineResult<Option<Passenger>> {
    if let BookingScope::Contact(email) = scope {
        return find_by_email(pool, email).await;
    }

    let Some(passenger_id) = form.passenger_id else {
        return Err(EngineError::invalid("passenger_id", "Passenger is required"));
    };
    let passenger = sqlx::query_as::<_, Passenger>("SELECT * FROM passengers WHERE id = ?")
        .bind(passenger_id)
        .fetch_optional(pool)
        .await?;
    match passenger {
        Some(p) => Ok(Some(p)),
        None => Err(EngineError::invalid("passenger_id", "Passenger does not exist")),
    }
}

/// Reserve a seat.
///
/// The flight's departure, the seat's availability and the flight's
/// capacity are all checked against the state inside the insert
/// transaction, with `now` as the reference instant.
pub async fn create_booking(
    pool: &DbPool,
    caller: &Caller,
    form: &CreateBookingForm,
    now: DateTime<Utc>,
) -> EngineResult<CreateOutcome> {
    let scope = BookingScope::for_caller(caller);
    let Some(passenger) = resolve_passenger(pool, &scope, form).await? else {
        return Ok(CreateOutcome::NeedsPassengerProfile);
    };
    authorize(
        caller,
        Action::CreateBooking,
        scope.ownership_of(&passenger.contact_email),
    )?;

    let seat = normalize_seat(&form.seat_number);
    let mut errors = FieldErrors::new();
    errors.check("seat_number", validate_seat_number(&seat));

    let mut tx = begin_write(pool).await?;

    let flight = match form.flight_id {
        Some(id) => fetch_flight(&mut tx, id).await?,
        None => None,
    };
    match &flight {
        None if form.flight_id.is_none() => {
            errors.add("flight_id", "Flight is required");
        }
        None => {
            errors.add("flight_id", "Flight does not exist");
        }
        Some(f) if !departs_after(f, now) => {
            errors.add("flight_id", "This flight has already departed");
        }
        Some(f) if errors.is_empty() => {
            let taken = active_seats(&mut tx, f.id, None).await?;
            let seats = SeatMap::new(f.id, f.capacity(), taken);
            if seats.is_taken(&seat) {
                errors.add("seat_number", seat_taken(&seat));
            } else if seats.is_full() {
                errors.add("flight_id", "This flight is fully booked");
            }
        }
        Some(_) => {}
    }
    errors.finish()?;
    let Some(flight) = flight else {
        return Err(EngineError::invalid("flight_id", "Flight does not exist"));
    };

    let status = BookingStatus::Confirmed.to_string();
    let booking_date = timestamp(now);

    let result = sqlx::query(
        r#"
        INSERT INTO bookings (flight_id, passenger_id, seat_number, booking_date, status, version)
        VALUES (?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(flight.id)
    .bind(passenger.id)
    .bind(&seat)
    .bind(&booking_date)
    .bind(&status)
    .execute(&mut *tx)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            return Err(EngineError::invalid("seat_number", seat_taken(&seat)))
        }
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;

    info!(
        booking_id = id,
        flight_id = flight.id,
        passenger_id = passenger.id,
        seat = %seat,
        "Booking created"
    );

    Ok(CreateOutcome::Created {
        booking: Booking {
            id,
            flight_id: flight.id,
            passenger_id: passenger.id,
            seat_number: seat,
            booking_date,
            status,
            version: 1,
        },
        flight,
        passenger,
    })
}

/// Dropdown data for the administrator edit form
pub async fn edit_options(
    pool: &DbPool,
    selected_flight: Option<i64>,
    selected_passenger: Option<i64>,
) -> EngineResult<BookingFormOptions> {
    let all_flights = flights::list_flights(pool).await?;
    Ok(BookingFormOptions {
        flights: flights::options(&all_flights, |f| f.flight_number.clone(), selected_flight),
        passenger: PassengerChoice::List {
            passengers: passenger_options(pool, selected_passenger).await?,
        },
    })
}

/// Booking and dropdown data for the administrator edit form
pub async fn edit_form(
    pool: &DbPool,
    caller: &Caller,
    id: i64,
) -> EngineResult<(Booking, BookingFormOptions)> {
    authorize(caller, Action::EditBooking, Ownership::NotApplicable)?;

    let booking = {
        let mut conn = pool.acquire().await?;
        fetch_booking(&mut conn, id)
            .await?
            .ok_or(EngineError::NotFound("Booking"))?
    };

    let options =
        edit_options(pool, Some(booking.flight_id), Some(booking.passenger_id)).await?;
    Ok((booking, options))
}

/// Administrator edit of a booking.
///
/// The form must carry the version it was rendered from; if the row changed
/// since, the edit is refused with [`EngineError::Conflict`]. The booking
/// date is never changed here.
pub async fn edit_booking(
    pool: &DbPool,
    caller: &Caller,
    path_id: i64,
    form: &EditBookingForm,
) -> EngineResult<Booking> {
    authorize(caller, Action::EditBooking, Ownership::NotApplicable)?;
    if path_id != form.id {
        return Err(EngineError::NotFound("Booking"));
    }

    let seat = normalize_seat(&form.seat_number);
    let mut errors = FieldErrors::new();
    errors.check("seat_number", validate_seat_number(&seat));
    let status = match form.status.parse::<BookingStatus>() {
        Ok(status) => Some(status),
        Err(message) => {
            errors.add("status", message);
            None
        }
    };

    let mut tx = begin_write(pool).await?;

    match form.passenger_id {
        None => {
            errors.add("passenger_id", "Passenger is required");
        }
        Some(id) => {
            if !passenger_exists(&mut tx, id).await? {
                errors.add("passenger_id", "Passenger does not exist");
            }
        }
    }
    let flight = match form.flight_id {
        Some(id) => fetch_flight(&mut tx, id).await?,
        None => None,
    };
    match &flight {
        None if form.flight_id.is_none() => {
            errors.add("flight_id", "Flight is required");
        }
        None => {
            errors.add("flight_id", "Flight does not exist");
        }
        Some(f) if errors.is_empty() && status.is_some_and(|s| s.holds_seat()) => {
            let taken = active_seats(&mut tx, f.id, Some(path_id)).await?;
            let seats = SeatMap::new(f.id, f.capacity(), taken);
            if seats.is_taken(&seat) {
                errors.add("seat_number", seat_taken(&seat));
            } else if seats.is_full() {
                errors.add("flight_id", "This flight is fully booked");
            }
        }
        Some(_) => {}
    }
    errors.finish()?;
    let (Some(status), Some(flight), Some(passenger_id)) = (status, flight, form.passenger_id)
    else {
        return Err(EngineError::invalid("status", "Unknown booking status"));
    };

    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET flight_id = ?, passenger_id = ?, seat_number = ?, status = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(flight.id)
    .bind(passenger_id)
    .bind(&seat)
    .bind(status.to_string())
    .bind(path_id)
    .bind(form.version)
    .execute(&mut *tx)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            return match fetch_booking(&mut tx, path_id).await? {
                None => Err(EngineError::NotFound("Booking")),
                Some(_) => Err(EngineError::Conflict("Booking")),
            };
        }
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(EngineError::invalid("seat_number", seat_taken(&seat)))
        }
        Err(e) => return Err(e.into()),
    }

    let booking = fetch_booking(&mut tx, path_id)
        .await?
        .ok_or(EngineError::NotFound("Booking"))?;
    tx.commit().await?;

    info!(booking_id = path_id, status = %status, version = booking.version, "Booking updated");
    Ok(booking)
}

/// Delete a booking. Absent ids succeed without doing anything.
pub async fn delete_booking(pool: &DbPool, caller: &Caller, id: i64) -> EngineResult<bool> {
    let Some(detail) = fetch_detail(pool, id).await? else {
        return Ok(false);
    };
    authorize(caller, Action::DeleteBooking, caller.ownership_of(&detail.passenger_email))?;

    let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(booking_id = id, user_id = %caller.user_id, "Booking deleted");
    }
    Ok(deleted)
}

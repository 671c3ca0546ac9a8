//! Passenger directory.
//!
//! A passenger record is tied to a login identity through its contact email,
//! which is stored lower-cased and unique.

use tracing::info;

use super::policy::Caller;
use super::validation::{
    normalize_email, validate_email, validate_optional, validate_required, FieldErrors,
};
use super::{is_unique_violation, EngineError, EngineResult};
use crate::db::{Passenger, PassengerForm, PassengerWithBookingCount, SelectOption};
use crate::DbPool;

/// Outcome of a customer registering their own passenger profile
#[derive(Debug)]
pub enum Registration {
    Created(Passenger),
    /// The caller already has a profile; nothing was written
    AlreadyRegistered(Passenger),
}

struct ValidPassenger {
    full_name: String,
    passport_number: String,
    contact_email: String,
    phone_number: String,
}

fn validate_passenger_form(form: &PassengerForm) -> EngineResult<ValidPassenger> {
    let contact_email = normalize_email(&form.contact_email);

    let mut errors = FieldErrors::new();
    errors.check("full_name", validate_required(&form.full_name, "Full name", 100));
    errors.check(
        "passport_number",
        validate_required(&form.passport_number, "Passport number", 20),
    );
    errors.check("contact_email", validate_email(&contact_email));
    errors.check("phone_number", validate_optional(&form.phone_number, "Phone number", 30));
    errors.finish()?;

    Ok(ValidPassenger {
        full_name: form.full_name.trim().to_string(),
        passport_number: form.passport_number.trim().to_string(),
        contact_email,
        phone_number: form.phone_number.trim().to_string(),
    })
}

fn duplicate_email(email: &str) -> EngineError {
    EngineError::invalid(
        "contact_email",
        format!("A passenger with email {} already exists", email),
    )
}

/// All passengers with their number of bookings, ordered by name
pub async fn list_passengers(pool: &DbPool) -> EngineResult<Vec<PassengerWithBookingCount>> {
    let rows: Vec<(i64, String, String, String, String, i64)> = sqlx::query_as(
        r#"
        SELECT p.id, p.full_name, p.passport_number, p.contact_email, p.phone_number,
               COUNT(b.id) AS booking_count
        FROM passengers p
        LEFT JOIN bookings b ON b.passenger_id = p.id
        GROUP BY p.id
        ORDER BY p.full_name, p.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, full_name, passport_number, contact_email, phone_number, booking_count)| {
                PassengerWithBookingCount {
                    passenger: Passenger {
                        id,
                        full_name,
                        passport_number,
                        contact_email,
                        phone_number,
                    },
                    booking_count,
                }
            },
        )
        .collect())
}

pub async fn get_passenger(pool: &DbPool, id: i64) -> EngineResult<Passenger> {
    sqlx::query_as::<_, Passenger>("SELECT * FROM passengers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound("Passenger"))
}

/// Passenger record linked to an identity email, if any
pub async fn find_by_email(pool: &DbPool, email: &str) -> EngineResult<Option<Passenger>> {
    let passenger =
        sqlx::query_as::<_, Passenger>("SELECT * FROM passengers WHERE contact_email = ?")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;
    Ok(passenger)
}

pub async fn create_passenger(pool: &DbPool, form: &PassengerForm) -> EngineResult<Passenger> {
    let valid = validate_passenger_form(form)?;

    let result = sqlx::query(
        r#"
        INSERT INTO passengers (full_name, passport_number, contact_email, phone_number)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&valid.full_name)
    .bind(&valid.passport_number)
    .bind(&valid.contact_email)
    .bind(&valid.phone_number)
    .execute(pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => return Err(duplicate_email(&valid.contact_email)),
        Err(e) => return Err(e.into()),
    };

    info!(passenger_id = id, "Passenger created");
    get_passenger(pool, id).await
}

/// Create the caller's own passenger profile.
///
/// The contact email is always the caller's identity email, whatever the
/// form carried.
pub async fn register_passenger(
    pool: &DbPool,
    caller: &Caller,
    form: &PassengerForm,
) -> EngineResult<Registration> {
    if let Some(existing) = find_by_email(pool, &caller.email).await? {
        return Ok(Registration::AlreadyRegistered(existing));
    }

    let mut form = form.clone();
    form.id = None;
    form.contact_email = caller.email.clone();

    create_passenger(pool, &form).await.map(Registration::Created)
}

pub async fn update_passenger(
    pool: &DbPool,
    path_id: i64,
    form: &PassengerForm,
) -> EngineResult<Passenger> {
    if form.id != Some(path_id) {
        return Err(EngineError::NotFound("Passenger"));
    }
    let valid = validate_passenger_form(form)?;

    let result = sqlx::query(
        r#"
        UPDATE passengers
        SET full_name = ?, passport_number = ?, contact_email = ?, phone_number = ?
        WHERE id = ?
        "#,
    )
    .bind(&valid.full_name)
    .bind(&valid.passport_number)
    .bind(&valid.contact_email)
    .bind(&valid.phone_number)
    .bind(path_id)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => return Err(EngineError::NotFound("Passenger")),
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(duplicate_email(&valid.contact_email)),
        Err(e) => return Err(e.into()),
    }

    info!(passenger_id = path_id, "Passenger updated");
    get_passenger(pool, path_id).await
}

/// Delete a passenger and their bookings. Absent ids are not an error.
pub async fn delete_passenger(pool: &DbPool, id: i64) -> EngineResult<bool> {
    let result = sqlx::query("DELETE FROM passengers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(passenger_id = id, "Passenger deleted");
    }
    Ok(deleted)
}

/// Passenger dropdown, labelled "Full Name (email)"
pub async fn passenger_options(
    pool: &DbPool,
    selected: Option<i64>,
) -> EngineResult<Vec<SelectOption>> {
    let passengers = sqlx::query_as::<_, Passenger>(
        "SELECT * FROM passengers ORDER BY full_name, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(passengers
        .iter()
        .map(|p| {
            SelectOption::new(
                p.id,
                format!("{} ({})", p.full_name, p.contact_email),
                selected,
            )
        })
        .collect())
}

//! Business rules for the flight catalog, passenger directory, booking
//! engine and feedback ledger.
//!
//! Every operation takes the database pool, the acting [`Caller`] where
//! visibility matters, and the server clock reading `now` so that rules
//! depending on departure times are evaluated against one instant.

pub mod bookings;
pub mod feedback;
pub mod flights;
pub mod passengers;
pub mod policy;
pub mod validation;

pub use policy::{authorize, permits, Action, BookingScope, Caller, Ownership};
pub use validation::FieldErrors;

use thiserror::Error;

/// Errors produced by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("{0} was modified by another request")]
    Conflict(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        EngineError::Validation(errors)
    }
}

/// Whether a database error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

//! Input validation for submitted forms.
//!
//! Individual checks return `Result<(), String>` with a human readable
//! message; [`FieldErrors`] collects them per field and turns a non-empty
//! collection into [`EngineError::Validation`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::EngineError;

/// Maximum length of a feedback comment
pub const MAX_COMMENT_LENGTH: usize = 500;

lazy_static! {
    /// Loose email shape: something@something.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Seat labels: row 1-999 with an optional seat letter (14A, 3, 120K)
    static ref SEAT_REGEX: Regex = Regex::new(r"^[1-9][0-9]{0,2}[A-K]?$").unwrap();

    /// Flight designators after upper-casing (BA117, U21234)
    static ref FLIGHT_NUMBER_REGEX: Regex = Regex::new(r"^[A-Z0-9]{2,10}$").unwrap();
}

/// Field-level validation errors, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.0.entry(field.into()).or_default().push(message.into());
        self
    }

    /// Record the error of a single check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    /// Return Ok(()) if no errors were collected
    pub fn finish(self) -> Result<(), EngineError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self))
        }
    }

    pub fn into_map(self) -> HashMap<String, Vec<String>> {
        self.0.into_iter().collect()
    }
}

/// Validate a required free-text field with a maximum length
pub fn validate_required(value: &str, label: &str, max_len: usize) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} is too long (max {} characters)", label, max_len));
    }
    Ok(())
}

/// Validate an optional free-text field with a maximum length
pub fn validate_optional(value: &str, label: &str, max_len: usize) -> Result<(), String> {
    if value.trim().chars().count() > max_len {
        return Err(format!("{} is too long (max {} characters)", label, max_len));
    }
    Ok(())
}

/// Validate a contact email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Contact email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Contact email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Canonical form of an email used as the identity correlation key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Canonical form of a seat label
pub fn normalize_seat(seat: &str) -> String {
    seat.trim().to_uppercase()
}

/// Validate a (normalized) seat label
pub fn validate_seat_number(seat: &str) -> Result<(), String> {
    if seat.is_empty() {
        return Err("Seat number is required".to_string());
    }
    if !SEAT_REGEX.is_match(seat) {
        return Err(
            "Seat number must look like 14A (row 1-999, optional seat letter A-K)".to_string(),
        );
    }
    Ok(())
}

/// Validate a (normalized) flight number
pub fn validate_flight_number(number: &str) -> Result<(), String> {
    if number.is_empty() {
        return Err("Flight number is required".to_string());
    }
    if !FLIGHT_NUMBER_REGEX.is_match(number) {
        return Err("Flight number must be 2-10 letters or digits".to_string());
    }
    Ok(())
}

/// Validate a review rating
pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(1..=5).contains(&rating) {
        return Err("Rating must be between 1 and 5".to_string());
    }
    Ok(())
}

/// Validate review comments
pub fn validate_comments(comments: &str) -> Result<(), String> {
    validate_required(comments, "Comments", MAX_COMMENT_LENGTH)
}

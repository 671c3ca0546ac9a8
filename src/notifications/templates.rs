//! Email bodies. Every interpolated value is HTML-escaped.

use lazy_static::lazy_static;
use regex::Regex;

use super::OutboundEmail;
use crate::db::{parse_timestamp, Booking, Flight, Passenger};

lazy_static! {
    static ref BLOCK_END: Regex = Regex::new(r"(?i)</(p|h[1-6]|div)>|<br\s*/?>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n+").unwrap();
}

pub fn booking_confirmation(
    passenger: &Passenger,
    flight: &Flight,
    booking: &Booking,
) -> OutboundEmail {
    let departure = parse_timestamp(&flight.departure_time)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| flight.departure_time.clone());

    let html_body = format!(
        r#"<h1>Booking Confirmed!</h1>
<p>Dear {name},</p>
<p>You are booked on <b>{flight_number}</b> from {origin} to {destination}.</p>
<p><b>Date:</b> {departure}</p>
<p><b>Seat:</b> {seat}</p>
<p>Have a safe trip!</p>"#,
        name = html_escape(&passenger.full_name),
        flight_number = html_escape(&flight.flight_number),
        origin = html_escape(&flight.origin),
        destination = html_escape(&flight.destination),
        departure = html_escape(&departure),
        seat = html_escape(&booking.seat_number),
    );

    OutboundEmail {
        to: passenger.contact_email.clone(),
        subject: format!("Booking Confirmation - Flight {}", flight.flight_number),
        html_body,
    }
}

pub fn passenger_welcome(passenger: &Passenger) -> OutboundEmail {
    OutboundEmail {
        to: passenger.contact_email.clone(),
        subject: "Welcome to Our Airline!".to_string(),
        html_body: format!(
            "<h3>Welcome, {}!</h3><p>Your passenger profile has been created successfully.</p>",
            html_escape(&passenger.full_name)
        ),
    }
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Plain-text alternative of a simple HTML body
pub fn html_to_text(html: &str) -> String {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = TAG.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n");
    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

//! Outbound email notifications.
//!
//! Handlers hand a message to [`dispatch`], which sends it on a background
//! task with a single attempt. Failures are logged and never reach the
//! request that caused them.

mod memory;
mod smtp;
pub mod templates;

pub use memory::MemoryNotifier;
pub use smtp::SmtpNotifier;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::EmailConfig;
use crate::db::{Booking, Flight, Passenger};

/// Email transport
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one HTML email
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// A rendered message waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Send an email in the background.
///
/// The returned handle only exists for tests; callers normally drop it.
pub fn dispatch(notifier: Arc<dyn Notifier>, email: OutboundEmail) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier
            .send_email(&email.to, &email.subject, &email.html_body)
            .await
        {
            tracing::warn!(
                to = %email.to,
                subject = %email.subject,
                "Failed to send email: {:#}",
                e
            );
        }
    })
}

/// Used when SMTP is not configured
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_email(&self, to: &str, subject: &str, _html_body: &str) -> Result<()> {
        tracing::debug!(to = %to, subject = %subject, "Email not configured, skipping");
        Ok(())
    }
}

/// Pick the transport for the configured email settings
pub fn from_config(config: &EmailConfig) -> Arc<dyn Notifier> {
    if config.is_configured() {
        tracing::info!(
            host = config.smtp_host.as_deref().unwrap_or_default(),
            port = config.smtp_port,
            "SMTP notifications enabled"
        );
        Arc::new(SmtpNotifier::new(config.clone()))
    } else {
        tracing::warn!("SMTP is not configured; outbound email is disabled");
        Arc::new(DisabledNotifier)
    }
}

pub fn notify_booking_confirmed(
    notifier: Arc<dyn Notifier>,
    passenger: &Passenger,
    flight: &Flight,
    booking: &Booking,
) -> JoinHandle<()> {
    dispatch(notifier, templates::booking_confirmation(passenger, flight, booking))
}

pub fn notify_passenger_welcome(
    notifier: Arc<dyn Notifier>,
    passenger: &Passenger,
) -> JoinHandle<()> {
    dispatch(notifier, templates::passenger_welcome(passenger))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger() -> Passenger {
        Passenger {
            id: 1,
            full_name: "Ada Lovelace".to_string(),
            passport_number: "P1".to_string(),
            contact_email: "ada@example.com".to_string(),
            phone_number: String::new(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_message() {
        let memory = Arc::new(MemoryNotifier::new());
        notify_passenger_welcome(memory.clone(), &passenger())
            .await
            .unwrap();

        let sent = memory.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");
        assert_eq!(sent[0].subject, "Welcome to Our Airline!");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let failing = Arc::new(MemoryNotifier::failing());
        let email = OutboundEmail {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hi</p>".to_string(),
        };
        // The task completes normally even though the send failed
        dispatch(failing.clone(), email).await.unwrap();
        assert_eq!(failing.attempts(), 1);
        assert!(failing.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_email_is_disabled() {
        let notifier = from_config(&EmailConfig::default());
        assert!(notifier
            .send_email("ada@example.com", "Subject", "<p>Body</p>")
            .await
            .is_ok());
    }
}

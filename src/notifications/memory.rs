use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Notifier, OutboundEmail};

/// Records messages instead of sending them
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("mail relay unavailable");
        }
        self.sent.lock().push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_counts_attempts() {
        let notifier = MemoryNotifier::new();
        tokio_test::block_on(notifier.send_email("ada@example.com", "Hi", "<p>Hi</p>")).unwrap();
        assert_eq!(notifier.attempts(), 1);
        assert_eq!(notifier.sent()[0].subject, "Hi");

        let failing = MemoryNotifier::failing();
        assert!(tokio_test::block_on(failing.send_email("ada@example.com", "Hi", "")).is_err());
        assert_eq!(failing.attempts(), 1);
    }
}

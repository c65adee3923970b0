//! Operator notifications.
//!
//! Delivery is best effort: the engine logs a failed notification and moves
//! on.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::NotifyError;

/// Sends a subject and body to an operator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    /// Create a notifier addressed to `recipient`.
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("operator")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(recipient = %self.recipient, subject = %subject, body = %body, "Notification");
        Ok(())
    }
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// Records notifications in memory; optionally fails every delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Notifier that records every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose deliveries all fail. Attempts are still recorded.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    /// Messages received so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Notification {
                subject: subject.to_string(),
                body: body.to_string(),
            });

        if self.fail {
            warn!(subject = %subject, "Recording notifier configured to fail");
            return Err(NotifyError {
                recipient: "recording".to_string(),
                reason: "delivery disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_keeps_messages() {
        let notifier = RecordingNotifier::new();
        notifier.notify("Trade placed", "3 legs").await.unwrap();
        assert_eq!(notifier.sent()[0].subject, "Trade placed");

        let failing = RecordingNotifier::failing();
        assert!(failing.notify("Alert", "x").await.is_err());
        assert_eq!(failing.sent().len(), 1);
    }
}

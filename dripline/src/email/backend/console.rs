//! Console transport for development and dry runs.
//!
//! Logs outgoing emails instead of sending them, so worker configurations
//! without real provider credentials still exercise the delivery path.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::email::{Email, EmailError, EmailTransport};

/// Log-only email transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleBackend {
    verbose: bool,
}

impl ConsoleBackend {
    /// Create a console transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console transport that also logs message bodies.
    #[must_use]
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl EmailTransport for ConsoleBackend {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        email.validate()?;

        let from = email.from.as_deref().ok_or(EmailError::NoSender)?;
        let subject = email.subject.as_deref().ok_or(EmailError::NoSubject)?;

        info!(
            from = %from,
            to = ?email.to,
            subject = %subject,
            reference = ?email.reference,
            "console email sent"
        );

        if self.verbose {
            if let Some(text) = &email.text {
                debug!(text = %text, "email text content");
            }
            if let Some(html) = &email.html {
                debug!(html = %html, "email html content");
            }
        }

        Ok(())
    }

    async fn verify(&self) -> Result<bool, EmailError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_send() {
        let backend = ConsoleBackend::new();

        let email = Email::new()
            .to("user@example.com")
            .from("noreply@myapp.com")
            .subject("Test Email")
            .text("This is a test email");

        assert!(backend.send(email).await.is_ok());
    }

    #[tokio::test]
    async fn test_console_rejects_invalid_email() {
        let backend = ConsoleBackend::verbose();
        let email = Email::new().from("noreply@myapp.com").subject("Test");

        assert!(backend.send(email).await.is_err());
    }

    #[tokio::test]
    async fn test_console_always_verifies() {
        assert!(ConsoleBackend::new().verify().await.unwrap());
    }
}

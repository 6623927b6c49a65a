//! SMTP backend over `lettre`.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::build_message;
use crate::email::{Email, EmailError, EmailTransport};

/// SMTP provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (587 for STARTTLS).
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Require STARTTLS.
    pub use_tls: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            use_tls: true,
        }
    }
}

/// SMTP email transport.
///
/// A fresh lettre transport is built for every send; nothing is cached
/// across calls.
#[derive(Debug, Clone)]
pub struct SmtpBackend {
    settings: SmtpSettings,
}

impl SmtpBackend {
    /// Create a backend with the given settings.
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let credentials = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );

        let mut builder = if self.settings.use_tls {
            let tls_parameters = TlsParameters::new(self.settings.host.clone())
                .map_err(|e| EmailError::smtp(format!("TLS parameters error: {e}")))?;

            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
                .map_err(|e| EmailError::smtp(e.to_string()))?
                .credentials(credentials)
                .tls(Tls::Required(tls_parameters))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.settings.host)
                .credentials(credentials)
        };

        builder = builder.port(self.settings.port);

        Ok(builder.build())
    }
}

#[async_trait]
impl EmailTransport for SmtpBackend {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        let message = build_message(&email)?;
        let transport = self.transport()?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| EmailError::smtp(e.to_string()))?;

        debug!(
            code = %response.code(),
            id = ?response.first_word(),
            "smtp server accepted message"
        );

        Ok(())
    }

    async fn verify(&self) -> Result<bool, EmailError> {
        let transport = self.transport()?;

        match transport.test_connection().await {
            Ok(ok) => Ok(ok),
            Err(err) => {
                warn!(host = %self.settings.host, error = %err, "smtp verification failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = SmtpSettings::default();
        assert_eq!(settings.port, 587);
        assert!(settings.use_tls);
    }

    #[tokio::test]
    async fn test_transport_builds_from_settings() {
        let backend = SmtpBackend::new(SmtpSettings {
            host: "smtp.example.com".to_string(),
            username: "user@example.com".to_string(),
            password: "password123".to_string(),
            ..SmtpSettings::default()
        });

        assert!(backend.transport().is_ok());
    }

    #[tokio::test]
    async fn test_verify_unreachable_host_is_false_not_error() {
        let backend = SmtpBackend::new(SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            use_tls: false,
            ..SmtpSettings::default()
        });

        assert!(!backend.verify().await.unwrap());
    }
}

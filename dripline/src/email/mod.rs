//! Email message type, transport abstraction, and provider backends.
//!
//! A transport is a configured channel capable of sending one email: plain
//! SMTP with stored credentials, Gmail behind an OAuth2 refresh-token
//! exchange, or a log-only console transport for development. Transports are
//! resolved per send from a [`TransportRegistry`] keyed by the sender
//! account identifier.

pub mod backend;
pub mod registry;
pub mod sender;

pub use backend::{ConsoleBackend, GmailBackend, GmailSettings, SmtpBackend, SmtpSettings};
pub use registry::{ProviderSettings, TransportRegistry, DEFAULT_ACCOUNT};
pub use sender::{EmailTransport, TransportResolver};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building, validating, or sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// The email has no recipients.
    #[error("email has no recipients")]
    NoRecipients,

    /// The email has no sender address.
    #[error("email has no sender address")]
    NoSender,

    /// The email has no subject.
    #[error("email has no subject")]
    NoSubject,

    /// The email has neither text nor HTML content.
    #[error("email has no content")]
    NoContent,

    /// An address could not be parsed.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// No provider is configured for the account and no default exists.
    #[error("no provider configured for account {0:?} and no default provider exists")]
    UnknownProvider(String),

    /// A provider failed its verification handshake during registration.
    #[error("provider {0:?} failed verification")]
    VerificationFailed(String),

    /// Provider configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// The SMTP transport reported an error.
    #[error("smtp error: {0}")]
    Smtp(String),

    /// The OAuth2 token refresh failed.
    #[error("oauth error: {0}")]
    OAuth(String),
}

impl EmailError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an SMTP error.
    pub fn smtp(msg: impl Into<String>) -> Self {
        Self::Smtp(msg.into())
    }

    /// Create an OAuth error.
    pub fn oauth(msg: impl Into<String>) -> Self {
        Self::OAuth(msg.into())
    }
}

/// An email message under construction.
///
/// # Examples
///
/// ```rust
/// use dripline::email::Email;
///
/// let email = Email::new()
///     .to("prospect@example.com")
///     .from("sales@myapp.com")
///     .subject("Quick question")
///     .html("<p>Hello!</p>");
///
/// assert!(email.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Sender address.
    pub from: Option<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub html: Option<String>,
    /// Uniqueness reference carried as the message id, for idempotency and
    /// tracing at the provider level.
    pub reference: Option<String>,
}

impl Email {
    /// Create an empty email.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set the sender address.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Set the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the plain-text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Set the HTML body.
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    /// Set the uniqueness reference.
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Check the email is sendable: at least one plausible recipient, a
    /// sender, a subject, and some content.
    pub fn validate(&self) -> Result<(), EmailError> {
        if self.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }
        for address in &self.to {
            if !address.contains('@') {
                return Err(EmailError::InvalidAddress(address.clone()));
            }
        }
        match &self.from {
            None => return Err(EmailError::NoSender),
            Some(from) if !from.contains('@') => {
                return Err(EmailError::InvalidAddress(from.clone()));
            }
            Some(_) => {}
        }
        if self.subject.is_none() {
            return Err(EmailError::NoSubject);
        }
        if self.text.is_none() && self.html.is_none() {
            return Err(EmailError::NoContent);
        }
        Ok(())
    }
}

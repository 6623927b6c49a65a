//! Transport trait abstractions.
//!
//! [`EmailTransport`] is implemented by every backend; [`TransportResolver`]
//! is the seam through which job handlers obtain a transport for a sender
//! account without knowing how providers are configured.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Email, EmailError};

/// A configured channel capable of sending one email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Send an email.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the email is invalid or the transport's send
    /// operation fails.
    async fn send(&self, email: Email) -> Result<(), EmailError>;

    /// Run the provider's verification handshake.
    ///
    /// Connection-level failures are reported as `Ok(false)` rather than an
    /// error; `Err` is reserved for configuration problems that make the
    /// handshake impossible to attempt.
    async fn verify(&self) -> Result<bool, EmailError>;
}

/// Resolves a sender account identifier to a transport.
pub trait TransportResolver: Send + Sync {
    /// Resolve the transport for a sender account.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::UnknownProvider` if no provider matches the
    /// account and no default provider is configured.
    fn resolve(&self, account: &str) -> Result<Arc<dyn EmailTransport>, EmailError>;
}

//! Provider registry: account identifier to transport settings.
//!
//! The registry is an explicit value owned by the composition root and
//! injected into job handlers through the job context, never a module-level
//! singleton. Resolution builds a fresh transport on every call; unknown
//! accounts fall back to the `default` provider. Runtime registration is
//! gated on the provider's verification handshake and is process-local: a
//! restart reloads only the configured providers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::backend::{ConsoleBackend, GmailBackend, GmailSettings, SmtpBackend, SmtpSettings};
use super::sender::{EmailTransport, TransportResolver};
use super::EmailError;

/// Account identifier used when no provider matches the requested account.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Settings for one named provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderSettings {
    /// Plain SMTP with stored credentials.
    Smtp(SmtpSettings),
    /// Gmail behind an OAuth2 refresh-token exchange.
    Gmail(GmailSettings),
    /// Log-only console transport.
    Console,
}

impl ProviderSettings {
    /// Short name of the provider kind, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Gmail(_) => "gmail",
            Self::Console => "console",
        }
    }
}

fn build_transport(settings: &ProviderSettings) -> Arc<dyn EmailTransport> {
    match settings {
        ProviderSettings::Smtp(smtp) => Arc::new(SmtpBackend::new(smtp.clone())),
        ProviderSettings::Gmail(gmail) => Arc::new(GmailBackend::new(gmail.clone())),
        ProviderSettings::Console => Arc::new(ConsoleBackend::new()),
    }
}

/// Registry of sender accounts and their transport settings.
#[derive(Debug, Default)]
pub struct TransportRegistry {
    providers: RwLock<HashMap<String, ProviderSettings>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from configured providers, without verification.
    /// Configured providers are trusted at startup; only runtime
    /// registration runs the handshake.
    #[must_use]
    pub fn from_providers(providers: HashMap<String, ProviderSettings>) -> Self {
        for (account, settings) in &providers {
            info!(account = %account, kind = settings.kind(), "email provider loaded");
        }
        Self {
            providers: RwLock::new(providers),
        }
    }

    /// Whether an account has its own provider entry.
    #[must_use]
    pub fn has_account(&self, account: &str) -> bool {
        self.providers.read().contains_key(account)
    }

    /// All registered account identifiers.
    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }

    /// Register a provider at runtime after a successful verification
    /// handshake. Providers that fail verification are not registered.
    pub async fn register(
        &self,
        account: &str,
        settings: ProviderSettings,
    ) -> Result<(), EmailError> {
        let transport = build_transport(&settings);
        self.register_verified(account, settings, transport.as_ref())
            .await
    }

    async fn register_verified(
        &self,
        account: &str,
        settings: ProviderSettings,
        transport: &dyn EmailTransport,
    ) -> Result<(), EmailError> {
        match transport.verify().await {
            Ok(true) => {
                info!(account = %account, kind = settings.kind(), "email provider registered");
                self.providers.write().insert(account.to_string(), settings);
                Ok(())
            }
            Ok(false) => {
                warn!(account = %account, "provider refused: verification failed");
                Err(EmailError::VerificationFailed(account.to_string()))
            }
            Err(err) => {
                warn!(account = %account, error = %err, "provider refused: verification errored");
                Err(err)
            }
        }
    }
}

impl TransportResolver for TransportRegistry {
    fn resolve(&self, account: &str) -> Result<Arc<dyn EmailTransport>, EmailError> {
        let providers = self.providers.read();
        let settings = providers
            .get(account)
            .or_else(|| providers.get(DEFAULT_ACCOUNT))
            .ok_or_else(|| EmailError::UnknownProvider(account.to_string()))?;

        Ok(build_transport(settings))
    }
}

//! Gmail backend: OAuth2 refresh-token exchange plus XOAUTH2 SMTP.
//!
//! Every send refreshes an access token from the stored refresh token and
//! builds a fresh transport with it, so a revoked grant fails fast on the
//! next send rather than lingering in a cache.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::build_message;
use crate::email::{Email, EmailError, EmailTransport};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";

/// Gmail OAuth2 provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailSettings {
    /// Gmail mailbox the transport authenticates as.
    pub user: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Long-lived refresh token granted by the account owner.
    pub refresh_token: String,
}

/// Gmail email transport authenticating with XOAUTH2.
#[derive(Debug, Clone)]
pub struct GmailBackend {
    settings: GmailSettings,
}

impl GmailBackend {
    /// Create a backend with the given settings.
    #[must_use]
    pub const fn new(settings: GmailSettings) -> Self {
        Self { settings }
    }

    /// Exchange the stored refresh token for a fresh access token.
    async fn access_token(&self) -> Result<String, EmailError> {
        let client = BasicClient::new(ClientId::new(self.settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.settings.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                    .map_err(|e| EmailError::oauth(format!("invalid auth URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|e| EmailError::oauth(format!("invalid token URL: {e}")))?,
            );

        let token = client
            .exchange_refresh_token(&RefreshToken::new(self.settings.refresh_token.clone()))
            .request_async(&oauth_http_client)
            .await
            .map_err(|err| {
                error!(account = %self.settings.user, error = %err, "gmail token refresh failed");
                EmailError::oauth(err.to_string())
            })?;

        Ok(token.access_token().secret().clone())
    }

    async fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let access_token = self.access_token().await?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(GMAIL_SMTP_HOST)
            .map_err(|e| EmailError::smtp(e.to_string()))?
            .authentication(vec![Mechanism::Xoauth2])
            .credentials(Credentials::new(self.settings.user.clone(), access_token))
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl EmailTransport for GmailBackend {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        let message = build_message(&email)?;
        let transport = self.transport().await?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| EmailError::smtp(e.to_string()))?;

        debug!(
            code = %response.code(),
            id = ?response.first_word(),
            account = %self.settings.user,
            "gmail accepted message"
        );

        Ok(())
    }

    async fn verify(&self) -> Result<bool, EmailError> {
        let transport = match self.transport().await {
            Ok(transport) => transport,
            Err(err) => {
                warn!(account = %self.settings.user, error = %err, "gmail verification failed");
                return Ok(false);
            }
        };

        match transport.test_connection().await {
            Ok(ok) => Ok(ok),
            Err(err) => {
                warn!(account = %self.settings.user, error = %err, "gmail verification failed");
                Ok(false)
            }
        }
    }
}

/// HTTP bridge for `oauth2` token requests. Redirects are disabled per the
/// OAuth2 specification.
async fn oauth_http_client(
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse, reqwest::Error> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let method = request.method().clone();
    let url = request.uri().to_string();
    let headers = request.headers().clone();
    let body = request.into_body();

    let mut request_builder = client.request(method, &url).body(body);
    for (name, value) in &headers {
        request_builder = request_builder.header(name.as_str(), value.as_bytes());
    }

    let response = request_builder.send().await?;

    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    let mut builder = http::Response::builder().status(status_code);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }

    Ok(builder
        .body(body)
        .expect("response built from a valid upstream response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GmailSettings {
        GmailSettings {
            user: "outreach@example.com".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_settings_round_trip() {
        let json = serde_json::to_string(&settings()).unwrap();
        let decoded: GmailSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, settings());
    }

    #[tokio::test]
    async fn test_send_requires_valid_email_before_any_network() {
        let backend = GmailBackend::new(settings());
        let email = Email::new().from("outreach@example.com").subject("s");

        // Message build fails before the token exchange is attempted.
        assert!(matches!(
            backend.send(email).await,
            Err(EmailError::NoRecipients)
        ));
    }
}

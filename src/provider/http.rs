//! HTTP identity provider.
//!
//! Speaks the identity service's JSON auth API over `reqwest` with a
//! cookie store, so the provider-side session travels on `HttpOnly`
//! cookies exactly as the service sets them. Credentials are sent once
//! per operation and never logged.

use crate::{
    config::ProviderConfig,
    provider::{AuthChange, IdentityProvider, Listeners, ProviderError, Subscription},
    session::Session,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

const LOGIN_PATH: &str = "/v1/auth/login";
const SIGNUP_PATH: &str = "/v1/auth/signup";
const LOGOUT_PATH: &str = "/v1/auth/logout";
const SESSION_PATH: &str = "/v1/auth/session";

const API_KEY_HEADER: &str = "x-api-key";

/// Maximum number of error body characters carried in a provider error.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Session summary returned by `GET /v1/auth/session`.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    user_id: String,
    email: String,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            user_id: response.user_id,
            email: response.email,
        }
    }
}

/// Identity provider backed by an external HTTP identity service.
pub struct HttpIdentityProvider {
    api: ApiClient,
    listeners: Arc<Listeners>,
}

impl HttpIdentityProvider {
    /// Builds a provider for the configured identity service.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout())
            .build()
            .map_err(|err| ProviderError::Network(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            api: ApiClient { http, config },
            listeners: Arc::new(Listeners::default()),
        })
    }

    /// Re-resolves the provider-side session and notifies all listeners.
    ///
    /// Called after a successful credential operation. A failed resolution
    /// is logged and produces no notification; callers are told not to
    /// assume one arrives.
    async fn resolve_and_emit(&self) {
        match self.api.fetch_session().await {
            Ok(change) => self.listeners.emit(&change),
            Err(err) => error!("Failed to resolve session after operation: {err}"),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        self.api.login(email, password).await?;
        self.resolve_and_emit().await;
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        self.api.signup(email, password).await?;
        self.resolve_and_emit().await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.api.logout().await?;
        self.listeners.emit(&None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        let subscription = self.listeners.register();

        // Initial resolution of the persisted session. The new listener is
        // guaranteed a first notification; an unreachable provider resolves
        // to "no session" rather than leaving the subscriber loading.
        let api = self.api.clone();
        let listeners = Arc::clone(&self.listeners);
        let id = subscription.id();
        tokio::spawn(async move {
            let change = match api.fetch_session().await {
                Ok(change) => change,
                Err(err) => {
                    error!("Failed to resolve persisted session: {err}");
                    None
                }
            };
            listeners.emit_to(id, change);
        });

        subscription
    }
}

/// Thin wrapper over the identity service endpoints.
#[derive(Clone)]
struct ApiClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ApiClient {
    async fn login(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        let response = self.post_credentials(LOGIN_PATH, email, password).await?;
        let status = response.status();
        if status.is_success() {
            debug!("Signed in against {LOGIN_PATH}");
            return Ok(());
        }
        if matches!(status.as_u16(), 401 | 403) {
            return Err(ProviderError::InvalidCredentials);
        }
        Err(http_error(response).await)
    }

    async fn signup(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        let response = self.post_credentials(SIGNUP_PATH, email, password).await?;
        let status = response.status();
        if status.is_success() {
            debug!("Created account against {SIGNUP_PATH}");
            return Ok(());
        }
        if status.as_u16() == 409 {
            return Err(ProviderError::AlreadyExists);
        }
        Err(http_error(response).await)
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        let response = self
            .request(reqwest::Method::POST, LOGOUT_PATH)
            .send()
            .await
            .map_err(map_transport)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(http_error(response).await)
    }

    /// Current provider-side session; 204 and 401 mean "no session".
    async fn fetch_session(&self) -> Result<AuthChange, ProviderError> {
        let response = self
            .request(reqwest::Method::GET, SESSION_PATH)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if matches!(status.as_u16(), 204 | 401) {
            return Ok(None);
        }
        if status.is_success() {
            let session: SessionResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::Decode(err.to_string()))?;
            return Ok(Some(session.into()));
        }
        Err(http_error(response).await)
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<reqwest::Response, ProviderError> {
        self.request(reqwest::Method::POST, path)
            .json(&CredentialsRequest {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(map_transport)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.config.endpoint(path));
        if let Some(api_key) = self.config.api_key() {
            builder = builder.header(API_KEY_HEADER, api_key.expose_secret());
        }
        builder
    }
}

fn map_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Network("request timed out".to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

async fn http_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Http {
        status,
        message: sanitize_body(body),
    }
}

/// Trims and truncates an error body before it reaches logs or callers.
fn sanitize_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_request_serializes_both_fields() {
        let payload = CredentialsRequest {
            email: "a@x.com",
            password: "secret",
        };
        let json = serde_json::to_string(&payload).expect("Failed to serialize");
        assert_eq!(json, r#"{"email":"a@x.com","password":"secret"}"#);
    }

    #[test]
    fn session_response_maps_to_session() {
        let json = r#"{"user_id":"u-1","email":"a@x.com"}"#;
        let response: SessionResponse = serde_json::from_str(json).expect("Failed to deserialize");
        let session = Session::from(response);
        assert_eq!(session.user_id, "u-1");
        assert_eq!(session.email, "a@x.com");
    }

    #[test]
    fn sanitize_body_trims_and_truncates() {
        assert_eq!(sanitize_body("  \n ".to_string()), "request failed");
        assert_eq!(sanitize_body(" denied ".to_string()), "denied");

        let long = "x".repeat(MAX_ERROR_CHARS + 50);
        assert_eq!(sanitize_body(long).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn provider_builds_from_config() {
        let config = ProviderConfig::new("https://id.example.com").expect("valid URL");
        let provider = HttpIdentityProvider::new(config).expect("client build");
        assert_eq!(
            provider.api.config.endpoint(SESSION_PATH),
            "https://id.example.com/v1/auth/session"
        );
    }
}

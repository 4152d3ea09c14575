//! Configuration for the HTTP identity provider. Values can be built
//! programmatically or loaded from the environment; the API key is held
//! as a secret and never logged.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

const ENV_PROVIDER_URL: &str = "ENSALUTO_PROVIDER_URL";
const ENV_API_KEY: &str = "ENSALUTO_API_KEY";
const ENV_TIMEOUT_SECONDS: &str = "ENSALUTO_TIMEOUT_SECONDS";

/// Errors raised while building a [`ProviderConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("provider URL scheme must be http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },
}

/// Connection settings for an external identity service.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl ProviderConfig {
    /// Builds a config for the given provider base URL.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed or is not HTTP(S).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|err| ConfigError::InvalidUrl(err.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    /// Loads the config from `ENSALUTO_PROVIDER_URL`, `ENSALUTO_API_KEY`
    /// and `ENSALUTO_TIMEOUT_SECONDS`.
    ///
    /// # Errors
    /// Returns an error if the provider URL is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var(ENV_PROVIDER_URL).map_err(|_| ConfigError::MissingEnv(ENV_PROVIDER_URL))?;
        let mut config = Self::new(&base_url)?;

        if let Ok(key) = std::env::var(ENV_API_KEY) {
            config = config.with_api_key(SecretString::from(key));
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECONDS) {
            let seconds: u64 = raw.parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    var: ENV_TIMEOUT_SECONDS,
                    message: err.to_string(),
                }
            })?;
            config = config.with_timeout(Duration::from_secs(seconds))?;
        }

        Ok(config)
    }

    /// Sets the API key sent with every provider request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the timeout is zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins the base URL with an endpoint path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn config_defaults_and_overrides() {
        let config = ProviderConfig::new("https://id.example.com").expect("valid URL");

        assert_eq!(config.base_url(), "https://id.example.com");
        assert!(config.api_key().is_none());
        assert_eq!(
            config.timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
        );

        let config = config
            .with_api_key(SecretString::from("k-123".to_string()))
            .with_timeout(Duration::from_secs(3))
            .expect("non-zero timeout");

        assert_eq!(
            config.api_key().map(ExposeSecret::expose_secret),
            Some("k-123")
        );
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let config = ProviderConfig::new("https://id.example.com/").expect("valid URL");
        assert_eq!(config.base_url(), "https://id.example.com");
        assert_eq!(
            config.endpoint("/v1/auth/session"),
            "https://id.example.com/v1/auth/session"
        );
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(matches!(
            ProviderConfig::new("not a url"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            ProviderConfig::new("ftp://id.example.com"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ProviderConfig::new("https://id.example.com").expect("valid URL");
        assert!(matches!(
            config.with_timeout(Duration::ZERO),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn from_env_reads_all_values() {
        temp_env::with_vars(
            [
                (ENV_PROVIDER_URL, Some("https://id.example.com/")),
                (ENV_API_KEY, Some("k-env")),
                (ENV_TIMEOUT_SECONDS, Some("7")),
            ],
            || {
                let config = ProviderConfig::from_env().expect("complete environment");
                assert_eq!(config.base_url(), "https://id.example.com");
                assert_eq!(
                    config.api_key().map(ExposeSecret::expose_secret),
                    Some("k-env")
                );
                assert_eq!(config.timeout(), Duration::from_secs(7));
            },
        );
    }

    #[test]
    fn from_env_requires_provider_url() {
        temp_env::with_vars([(ENV_PROVIDER_URL, None::<&str>)], || {
            assert!(matches!(
                ProviderConfig::from_env(),
                Err(ConfigError::MissingEnv(ENV_PROVIDER_URL))
            ));
        });
    }

    #[test]
    fn from_env_rejects_bad_timeout() {
        temp_env::with_vars(
            [
                (ENV_PROVIDER_URL, Some("https://id.example.com")),
                (ENV_TIMEOUT_SECONDS, Some("soon")),
            ],
            || {
                assert!(matches!(
                    ProviderConfig::from_env(),
                    Err(ConfigError::InvalidEnv { .. })
                ));
            },
        );
    }
}

//! Facade error type. Provider failures are logged and re-raised
//! unchanged; nothing here is fatal to the process.

use crate::provider::ProviderError;

/// Errors produced by the auth facade operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external identity provider failed or rejected the operation.
    #[error("provider operation failed: {0}")]
    Provider(#[from] ProviderError),

    /// Sign-in and sign-up require a non-empty email and secret.
    #[error("email and password must not be empty")]
    EmptyCredentials,
}

use std::sync::Arc;

/// Result type used throughout the crate.
///
/// The error variant is always [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors returned by the SDK.
///
/// Flag evaluation itself never fails: it always degrades to a boolean. Errors are reserved for
/// lifecycle misuse (e.g., double initialization), configuration problems, and transport failures
/// surfaced by explicit calls such as [`crate::FlagsClient::initialize`].
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// [`crate::FlagsClient::initialize`] was called more than once. This indicates a lifecycle
    /// bug in the integrating application.
    #[error("client is already initialized")]
    AlreadyInitialized,

    /// Invalid base_url configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The request was unauthorized, possibly due to an invalid secret key.
    #[error("unauthorized, secret key is likely invalid")]
    Unauthorized,

    /// The server returned a flags response that could not be interpreted.
    #[error("invalid flags response")]
    InvalidFlagsResponse,

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

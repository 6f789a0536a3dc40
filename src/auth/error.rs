//! Error type for the token exchange.

use thiserror::Error;

/// Errors that can occur while acquiring a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The endpoint answered 2xx but the token was empty.
    #[error("token endpoint returned an empty access token")]
    EmptyToken,

    /// Transport failure or undecodable body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

//! Request and response bodies for the `oauth/token` exchange.

use serde::{Deserialize, Serialize};

/// Body posted to `{base_url}/oauth/token`.
///
/// The base URL travels in the body as well; the token endpoint ignores it
/// but the exchange has always sent it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub base_url: String,
    pub grant_type: String,
    pub username: String,
    pub password: String,
}

/// Response of the token endpoint. Only `access_token` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub created_at: i64,
}

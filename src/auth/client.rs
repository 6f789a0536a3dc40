use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::AuthError;
use super::types::{TokenRequest, TokenResponse};

const TOKEN_PATH: &str = "oauth/token";

pub struct TokenClient {
    client: Client,
}

impl TokenClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self::new(client))
    }

    /// Exchange credentials for a bearer token. Called once, before dispatch.
    pub async fn fetch_token(&self, req: &TokenRequest) -> Result<String, AuthError> {
        let url = format!("{}/{TOKEN_PATH}", req.base_url.trim_end_matches('/'));
        debug!(%url, grant_type = %req.grant_type, "requesting token");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AuthError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<TokenResponse>().await?;
        if body.access_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(body.access_token)
    }
}

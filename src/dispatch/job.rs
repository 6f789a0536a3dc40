use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ItemError;

/// Placeholder replaced by the asset identifier in a URL pattern.
pub const IDENTIFIER_PLACEHOLDER: &str = "{identifier}";

/// Body of the subscribe call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
    pub offer: String,
    pub account: String,
    pub reboot_after_next_trip: bool,
}

/// The request shared by every item of a run.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub url_pattern: String,
    pub payload: SubscribePayload,
}

impl RequestTemplate {
    /// Template for `POST {base}/services/obdstack/v1/assets/{identifier}/subscribe`.
    pub fn subscribe(base_url: &str, payload: SubscribePayload) -> Self {
        Self {
            method: Method::POST,
            url_pattern: format!(
                "{}/services/obdstack/v1/assets/{IDENTIFIER_PLACEHOLDER}/subscribe",
                base_url.trim_end_matches('/')
            ),
            payload,
        }
    }

    pub fn url_for(&self, identifier: &str) -> String {
        self.url_pattern.replace(IDENTIFIER_PLACEHOLDER, identifier)
    }
}

/// One identifier's worth of dispatchable request state.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub identifier: String,
    pub template: Arc<RequestTemplate>,
    pub token: Arc<str>,
    pub queue_path: Arc<PathBuf>,
}

/// Decoded body of a successful subscribe call.
pub type SubscribeResponse = Map<String, Value>;

#[derive(Debug)]
pub enum Outcome {
    Subscribed(SubscribeResponse),
    Failed(ItemError),
}

/// Exactly one of these is produced per dispatched [`WorkItem`].
#[derive(Debug)]
pub struct WorkResult {
    pub identifier: String,
    pub outcome: Outcome,
}

impl WorkResult {
    pub fn new(identifier: String, result: Result<SubscribeResponse, ItemError>) -> Self {
        let outcome = match result {
            Ok(value) => Outcome::Subscribed(value),
            Err(err) => Outcome::Failed(err),
        };
        Self { identifier, outcome }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            Outcome::Subscribed(_) => None,
        }
    }

    pub fn value(&self) -> Option<&SubscribeResponse> {
        match &self.outcome {
            Outcome::Subscribed(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }
}

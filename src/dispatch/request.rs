use reqwest::{Client, StatusCode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use super::job::{SubscribeResponse, WorkItem};
use super::tracker::OutcomeTracker;
use crate::error::ItemError;

/// Perform the single request attempt for `item` and apply its durable side
/// effects.
///
/// An HTTP 200 is the completion signal: the identifier leaves the queue file
/// before the body is decoded, so a body that fails to decode still counts
/// as done on disk and is reported as [`ItemError::Decoding`].
pub async fn execute(
    client: &Client,
    tracker: &OutcomeTracker,
    item: &WorkItem,
) -> Result<SubscribeResponse, ItemError> {
    let body = serde_json::to_vec(&item.template.payload).map_err(ItemError::Encoding)?;
    let url = item.template.url_for(&item.identifier);

    let response = client
        .request(item.template.method.clone(), &url)
        .header(AUTHORIZATION, format!("Bearer {}", item.token))
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            flag_failure(tracker, &item.identifier).await;
            return Err(ItemError::Timeout(e));
        }
        Err(e) => return Err(ItemError::Transport(e)),
    };

    let status = response.status();
    if status != StatusCode::OK {
        flag_failure(tracker, &item.identifier).await;
        return Err(ItemError::UnexpectedStatus { status });
    }

    tracker
        .complete(&item.queue_path, &item.identifier)
        .await
        .map_err(ItemError::QueueMutation)?;
    debug!(identifier = %item.identifier, "removed from queue");

    response
        .json::<SubscribeResponse>()
        .await
        .map_err(ItemError::Decoding)
}

// The failure log is a breadcrumb; an append error does not change the
// item's classification.
async fn flag_failure(tracker: &OutcomeTracker, identifier: &str) {
    if let Err(e) = tracker.record_failure(identifier).await {
        warn!(%identifier, "could not record failure: {e}");
    }
}

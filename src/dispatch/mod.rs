//! Concurrent dispatch engine.
//!
//! A [`Dispatcher`] turns the pending identifiers of a queue file into
//! [`WorkItem`]s, runs them through a [`WorkerPool`] and hands every
//! [`WorkResult`] to the caller as it arrives. Disk state is owned by an
//! [`OutcomeTracker`] task for the duration of the run.

mod failure_log;
mod job;
mod pool;
mod queue;
mod request;
mod tracker;

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info};

use crate::error::{ErrorKind, RunError};

pub use failure_log::{DEFAULT_FAILURE_LOG, FailureLog};
pub use job::{Outcome, RequestTemplate, SubscribePayload, WorkItem, WorkResult};
pub use pool::{Dispatch, WorkerPool};
pub use tracker::OutcomeTracker;

/// Per-request timeout of the subscribe call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    workers: NonZeroUsize,
    queue_path: Arc<PathBuf>,
    failure_log: FailureLog,
    template: Arc<RequestTemplate>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(workers: NonZeroUsize, queue_path: impl Into<PathBuf>, template: RequestTemplate) -> Self {
        Self {
            workers,
            queue_path: Arc::new(queue_path.into()),
            failure_log: FailureLog::default(),
            template: Arc::new(template),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_failure_log(mut self, failure_log: FailureLog) -> Self {
        self.failure_log = failure_log;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn queue_path(&self) -> &Path {
        &self.queue_path
    }

    /// Read the identifiers still pending in the queue file.
    pub fn load_queue(&self) -> Result<Vec<String>, RunError> {
        queue::load(&self.queue_path).map_err(|source| RunError::QueueFile {
            path: self.queue_path.display().to_string(),
            source,
        })
    }

    /// Dispatch every identifier once and wait for the pool to drain.
    ///
    /// `on_result` sees each result in completion order. Per-item failures
    /// never abort the run.
    pub async fn run<F>(
        &self,
        identifiers: Vec<String>,
        token: &str,
        mut on_result: F,
    ) -> Result<RunSummary, RunError>
    where
        F: FnMut(&WorkResult),
    {
        let client = Client::builder()
            .connect_timeout(self.request_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| RunError::Config(format!("cannot build HTTP client: {e}")))?;

        let token: Arc<str> = Arc::from(token);
        let items: Vec<WorkItem> = identifiers
            .into_iter()
            .map(|identifier| WorkItem {
                identifier,
                template: Arc::clone(&self.template),
                token: Arc::clone(&token),
                queue_path: Arc::clone(&self.queue_path),
            })
            .collect();
        let dispatched = items.len();
        info!(items = dispatched, workers = self.workers.get(), "dispatching");

        let (tracker, tracker_done) = OutcomeTracker::spawn(self.failure_log.clone());
        let pool = WorkerPool::new(self.workers, client, tracker);
        let Dispatch {
            mut results,
            drained,
        } = pool.dispatch(items).await;

        let mut summary = RunSummary::default();
        while let Some(result) = results.recv().await {
            on_result(&result);
            summary.results.push(result);
        }

        if let Err(e) = drained.await {
            error!("dispatch drain aborted: {e}");
        }
        if let Err(e) = tracker_done.await {
            error!("outcome tracker aborted: {e}");
        }

        if summary.results.len() != dispatched {
            error!(
                dispatched,
                received = summary.results.len(),
                "some items produced no result"
            );
        }
        Ok(summary)
    }
}

/// All results of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<WorkResult>,
}

impl RunSummary {
    pub fn subscribed(&self) -> usize {
        self.results.iter().filter(|r| r.value().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.subscribed()
    }

    pub fn failures_by_kind(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for err in self.results.iter().filter_map(WorkResult::error) {
            *counts.entry(err.kind()).or_insert(0) += 1;
        }
        counts
    }
}

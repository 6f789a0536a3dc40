use std::num::NonZeroUsize;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::job::{WorkItem, WorkResult};
use super::request::execute;
use super::tracker::OutcomeTracker;

/// Fixed-size set of workers sharing one job channel and one HTTP client.
pub struct WorkerPool {
    workers: NonZeroUsize,
    client: Client,
    tracker: OutcomeTracker,
}

/// A dispatch in progress.
///
/// `results` yields one [`WorkResult`] per item in completion order and
/// closes once `drained` has observed every worker exit.
pub struct Dispatch {
    pub results: mpsc::Receiver<WorkResult>,
    pub drained: JoinHandle<()>,
}

impl WorkerPool {
    pub fn new(workers: NonZeroUsize, client: Client, tracker: OutcomeTracker) -> Self {
        Self {
            workers,
            client,
            tracker,
        }
    }

    /// Spawn the workers, enqueue every item, then close the job channel.
    ///
    /// Both channels are sized to the item count so enqueueing never waits
    /// on a worker and workers never wait on the caller.
    pub async fn dispatch(self, items: Vec<WorkItem>) -> Dispatch {
        let capacity = items.len().max(1);
        let (job_tx, job_rx) = mpsc::channel::<WorkItem>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<WorkResult>(capacity);
        let jobs = Arc::new(Mutex::new(job_rx));

        let handles: Vec<JoinHandle<()>> = (0..self.workers.get())
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&jobs),
                    self.client.clone(),
                    self.tracker.clone(),
                    result_tx.clone(),
                ))
            })
            .collect();

        let total = items.len();
        for item in items {
            if job_tx.send(item).await.is_err() {
                error!("all workers exited before the queue was handed out");
                break;
            }
        }
        drop(job_tx);
        debug!(total, workers = self.workers.get(), "work enqueued");

        let drained = tokio::spawn(async move {
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if let Err(e) = handle.await {
                    error!("worker {worker_id} aborted: {e}");
                }
            }
            // Last sender: the result channel closes here.
            drop(result_tx);
        });

        Dispatch {
            results: result_rx,
            drained,
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    client: Client,
    tracker: OutcomeTracker,
    results: mpsc::Sender<WorkResult>,
) {
    trace!("worker {worker_id} started");

    loop {
        // The lock is released before the request runs.
        let next = jobs.lock().await.recv().await;
        let Some(item) = next else { break };

        let result = execute(&client, &tracker, &item).await;
        if results
            .send(WorkResult::new(item.identifier, result))
            .await
            .is_err()
        {
            debug!("worker {worker_id}: result receiver dropped");
            break;
        }
    }

    trace!("worker {worker_id} stopped");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::dispatch::failure_log::FailureLog;
    use crate::dispatch::job::{RequestTemplate, SubscribePayload};

    fn items(base_url: &str, queue_path: &Arc<PathBuf>, ids: &[&str]) -> Vec<WorkItem> {
        let template = Arc::new(RequestTemplate::subscribe(
            base_url,
            SubscribePayload {
                offer: "o".into(),
                account: "a".into(),
                reboot_after_next_trip: true,
            },
        ));
        let token: Arc<str> = Arc::from("t");
        ids.iter()
            .map(|id| WorkItem {
                identifier: id.to_string(),
                template: Arc::clone(&template),
                token: Arc::clone(&token),
                queue_path: Arc::clone(queue_path),
            })
            .collect()
    }

    async fn drain(mut dispatch: Dispatch) -> Vec<WorkResult> {
        let mut out = Vec::new();
        while let Some(result) = dispatch.results.recv().await {
            out.push(result);
        }
        dispatch.drained.await.unwrap();
        out
    }

    #[tokio::test]
    async fn more_workers_than_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let queue_path = Arc::new(dir.path().join("q.txt"));
        std::fs::write(queue_path.as_ref(), "A\nB\n").unwrap();
        let (tracker, _) = OutcomeTracker::spawn(FailureLog::new(dir.path().join("f.txt")));

        let pool = WorkerPool::new(NonZeroUsize::new(8).unwrap(), Client::new(), tracker);
        let results = drain(pool.dispatch(items(&server.uri(), &queue_path, &["A", "B"])).await).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.value().is_some()));
    }

    #[tokio::test]
    async fn empty_dispatch_closes_immediately() {
        let dir = TempDir::new().unwrap();
        let (tracker, _) = OutcomeTracker::spawn(FailureLog::new(dir.path().join("f.txt")));
        let pool = WorkerPool::new(NonZeroUsize::new(3).unwrap(), Client::new(), tracker);

        let results = drain(pool.dispatch(Vec::new()).await).await;
        assert!(results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_requests_bounded_by_worker_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let queue_path = Arc::new(dir.path().join("q.txt"));
        std::fs::write(queue_path.as_ref(), "A\nB\nC\nD\n").unwrap();
        let (tracker, _) = OutcomeTracker::spawn(FailureLog::new(dir.path().join("f.txt")));

        // One worker: four 100ms calls run strictly one after another.
        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        let pool = WorkerPool::new(NonZeroUsize::new(1).unwrap(), client, tracker);
        let started = std::time::Instant::now();
        let results = drain(
            pool.dispatch(items(&server.uri(), &queue_path, &["A", "B", "C", "D"]))
                .await,
        )
        .await;

        assert_eq!(results.len(), 4);
        assert!(started.elapsed() >= Duration::from_millis(400));
        // A single worker also preserves queue order.
        let order: Vec<&str> = results.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, ["A", "B", "C", "D"]);
    }
}

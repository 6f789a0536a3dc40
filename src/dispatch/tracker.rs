//! Single owner of the queue file and the failure log.
//!
//! Workers never touch either file. They send a notice to the tracker task and
//! wait for its acknowledgement, so at most one read-rewrite-rename of a queue
//! file is in flight at any time. Notices that pile up while a rewrite is
//! running are applied together in the next one.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::failure_log::FailureLog;
use super::queue;

const NOTICE_BUFFER: usize = 256;
const MAX_BATCH: usize = 128;

type Ack = oneshot::Sender<io::Result<()>>;

#[derive(Debug)]
enum Notice {
    Completed {
        identifier: String,
        queue_path: Arc<PathBuf>,
        ack: Ack,
    },
    Failed {
        identifier: String,
        ack: Ack,
    },
}

/// Cloneable handle used by workers to report outcomes that touch disk.
///
/// The tracker task exits once every handle is dropped and the pending
/// notices are applied.
#[derive(Debug, Clone)]
pub struct OutcomeTracker {
    tx: mpsc::Sender<Notice>,
}

impl OutcomeTracker {
    pub fn spawn(failure_log: FailureLog) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(NOTICE_BUFFER);
        let handle = tokio::spawn(run(rx, failure_log));
        (Self { tx }, handle)
    }

    /// Remove `identifier` from the queue file. Resolves once the file on
    /// disk no longer contains it.
    pub async fn complete(&self, queue_path: &Arc<PathBuf>, identifier: &str) -> io::Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Notice::Completed {
            identifier: identifier.to_string(),
            queue_path: Arc::clone(queue_path),
            ack,
        })
        .await?;
        done.await.map_err(|_| stopped())?
    }

    /// Append `identifier` to the failure log.
    pub async fn record_failure(&self, identifier: &str) -> io::Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Notice::Failed {
            identifier: identifier.to_string(),
            ack,
        })
        .await?;
        done.await.map_err(|_| stopped())?
    }

    async fn send(&self, notice: Notice) -> io::Result<()> {
        self.tx.send(notice).await.map_err(|_| stopped())
    }
}

fn stopped() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "outcome tracker stopped")
}

async fn run(mut rx: mpsc::Receiver<Notice>, failure_log: FailureLog) {
    let mut batch = Vec::with_capacity(MAX_BATCH);
    while rx.recv_many(&mut batch, MAX_BATCH).await > 0 {
        let notices = std::mem::take(&mut batch);
        let log = failure_log.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || apply(notices, &log)).await {
            error!("outcome tracker batch aborted: {e}");
        }
    }
    debug!("outcome tracker stopped");
}

fn apply(notices: Vec<Notice>, failure_log: &FailureLog) {
    let mut completed: HashMap<Arc<PathBuf>, Vec<(String, Ack)>> = HashMap::new();
    let mut failed: Vec<(String, Ack)> = Vec::new();

    for notice in notices {
        match notice {
            Notice::Completed {
                identifier,
                queue_path,
                ack,
            } => completed.entry(queue_path).or_default().push((identifier, ack)),
            Notice::Failed { identifier, ack } => failed.push((identifier, ack)),
        }
    }

    for (path, entries) in completed {
        let targets: HashSet<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
        let result = queue::remove_lines(&path, &targets);
        match &result {
            Ok(removed) => debug!(
                path = %path.display(),
                batch = entries.len(),
                removed,
                "queue file rewritten"
            ),
            Err(e) => warn!(path = %path.display(), "queue file rewrite failed: {e}"),
        }
        acknowledge(entries, result.map(|_| ()));
    }

    if !failed.is_empty() {
        let identifiers: Vec<&str> = failed.iter().map(|(id, _)| id.as_str()).collect();
        let result = failure_log.append(&identifiers[..]);
        if let Err(e) = &result {
            warn!(path = %failure_log.path().display(), "failure log append failed: {e}");
        }
        acknowledge(failed, result);
    }
}

fn acknowledge(entries: Vec<(String, Ack)>, result: io::Result<()>) {
    for (_, ack) in entries {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        // The worker may have gone away; nothing to do then.
        let _ = ack.send(reply);
    }
}

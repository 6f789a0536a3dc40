mod auth;
mod cli;
mod config;
mod dispatch;
mod error;
mod logging;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use auth::TokenClient;
use cli::Cli;
use config::Settings;
use dispatch::{Dispatcher, FailureLog, REQUEST_TIMEOUT};
use error::RunError;
use ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage problems are reported, not treated as a crash.
            let _ = e.print();
            return Ok(());
        }
    };
    logging::init(cli.verbose);

    let settings = Settings::load(&cli.config, &cli.env_file).context("loading settings")?;
    run(&cli, &settings).await
}

/// Validate, load the queue, acquire the token, then dispatch.
///
/// Everything before dispatch is fatal. Once dispatch starts the run always
/// completes and reports.
async fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let workers = config::worker_count(cli.workers)?;

    let dispatcher = Dispatcher::new(workers, &cli.queue_file, settings.request_template())
        .with_failure_log(FailureLog::new(&cli.failed_log));
    let identifiers = dispatcher.load_queue()?;
    info!(
        pending = identifiers.len(),
        queue = %dispatcher.queue_path().display(),
        "queue loaded"
    );

    let token = TokenClient::with_timeout(REQUEST_TIMEOUT)
        .map_err(RunError::from)?
        .fetch_token(&settings.token_request())
        .await
        .map_err(RunError::from)?;

    let progress = RunProgress::start(identifiers.len());
    let summary = dispatcher
        .run(identifiers, &token, |result| progress.record(result))
        .await?;
    progress.finish(&summary);

    info!(
        subscribed = summary.subscribed(),
        failed = summary.failed(),
        "run complete"
    );
    Ok(())
}

//! Terminal output: progress bar and colored result lines.
//!
//! Success values go to stdout as JSON, one per line. Failures are logged
//! through `tracing` and echoed above the progress bar.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use crate::dispatch::{Outcome, RunSummary, WorkResult};

/// Progress over one dispatch, advanced once per result.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style.progress_chars("=> "));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn record(&self, result: &WorkResult) {
        match &result.outcome {
            Outcome::Subscribed(value) => {
                let line = serde_json::to_string(value).unwrap_or_default();
                self.pb.suspend(|| println!("{line}"));
            }
            Outcome::Failed(err) => {
                error!(identifier = %result.identifier, kind = %err.kind(), "{err}");
                let flagged = if err.is_logged_failure() { " (flagged)" } else { "" };
                self.pb.println(format!(
                    "  {} {}: {}{flagged}",
                    self.red.apply_to("✗"),
                    result.identifier,
                    err.kind()
                ));
            }
        }
        self.pb.set_message(result.identifier.clone());
        self.pb.inc(1);
    }

    /// Clear the bar and print the per-class summary and the `Done` marker.
    pub fn finish(&self, summary: &RunSummary) {
        self.pb.finish_and_clear();
        println!(
            "  {} {} subscribed",
            self.green.apply_to("✓"),
            summary.subscribed()
        );
        for (kind, count) in summary.failures_by_kind() {
            println!("  {} {count} {kind}", self.yellow.apply_to("!"));
        }
        println!("Done");
    }
}

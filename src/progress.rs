// ABOUTME: Terminal spinner for long snapshot reads and apply passes
// ABOUTME: Advisory only; hidden when disabled so callers need no branching

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for one table. A hidden bar when progress is off.
#[derive(Debug)]
pub struct TableProgress {
    pb: ProgressBar,
}

impl TableProgress {
    pub fn new(table: &str, enabled: bool) -> Self {
        let pb = if enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {prefix} {msg} [{elapsed_precise}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_prefix(table.to_string());
        Self { pb }
    }

    pub fn stage(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Switch to counting rows of a pass with a known size.
    pub fn start_pass(&self, message: &str, total: u64) {
        self.pb.set_length(total);
        self.pb.set_position(0);
        self.pb.set_message(message.to_string());
    }

    pub fn inc(&self) {
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_is_inert() {
        let progress = TableProgress::new("t", false);
        progress.stage("reading");
        progress.start_pass("applying", 3);
        progress.inc();
        progress.finish();
        assert!(progress.pb.is_hidden());
    }
}

//! Spinner for board manager steps

use indicatif::{ProgressBar, ProgressStyle};
use mbedgtw_runner::{Progress, Step};
use std::time::Duration;

/// Progress reporter using indicatif spinners
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self { current_bar: None }
    }

    fn create_spinner(&mut self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }
}

impl Progress for IndicatifProgress {
    fn begin(&mut self, step: &Step) {
        self.create_spinner(format!("{}...", step));
    }

    fn end(&mut self, step: &Step, ok: bool) {
        if let Some(pb) = self.current_bar.take() {
            if ok {
                pb.finish_with_message(format!("{}: done", step));
            } else {
                pb.abandon_with_message(format!("{}: failed", step));
            }
        }
    }
}

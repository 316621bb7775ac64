use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_yellow, done};

/// Spinner-per-phase progress on stderr for multi-step commands.
///
/// Each phase shows `Phase i/n: <message>` while running and is replaced by a
/// checkmarked line when finished.
pub struct PhaseProgress {
    pb: ProgressBar,
    phase: usize,
    total: usize,
}

impl PhaseProgress {
    pub fn start(total: usize, message: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow(format!("Phase 1/{total}: {message}")).to_string());
        Self { pb, phase: 1, total }
    }

    /// Finishes the current phase with `finished` and starts the next one.
    #[must_use]
    pub fn next(self, finished: &str, message: &str) -> Self {
        self.finish_current(finished);
        let phase = self.phase + 1;
        let pb = create_spinner(
            bright_yellow(format!("Phase {phase}/{}: {message}", self.total)).to_string(),
        );
        Self {
            pb,
            phase,
            total: self.total,
        }
    }

    pub fn finish(self, finished: &str) {
        self.finish_current(finished);
        eprintln!();
    }

    /// Clears the spinner without a success line, e.g. before reporting an error.
    pub fn abandon(self) {
        self.pb.finish_and_clear();
    }

    fn finish_current(&self, finished: &str) {
        self.pb.finish_with_message(
            done(format!("Phase {}/{}: {finished}", self.phase, self.total)).to_string(),
        );
    }
}

/// A steady-ticking spinner on stderr.
pub fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

//! Terminal output for the CLI: a spinner while a job runs, colored
//! outcome lines, and the job summary.
//!
//! Uses `indicatif` for the spinner and `console` for styling.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use docjob::state_machine::{JobSummary, StateLabel};

/// Spinner shown while a document is submitted and polled.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn succeed(&self, message: &str) {
        self.pb.finish_and_clear();
        eprintln!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        eprintln!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Print the job summary as pretty JSON, colored by final state.
    pub fn print_summary(&self, summary: &JobSummary) {
        let style = match summary.final_state {
            StateLabel::Succeeded => &self.green,
            StateLabel::Failed => &self.red,
            _ => &self.yellow,
        };
        eprintln!();
        eprintln!("{}", style.apply_to("─── Job Summary ───"));
        eprintln!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
    }
}

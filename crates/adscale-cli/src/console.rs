use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Operator-facing progress output, written to stderr so stdout stays
/// reserved for the report itself.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
    spinner: bool,
}

impl Console {
    pub fn new(quiet: bool, spinner: bool) -> Self {
        Self { quiet, spinner }
    }

    #[cfg(test)]
    pub fn silent() -> Self {
        Self::new(true, false)
    }

    pub fn heading(&self, text: &str) {
        if !self.quiet {
            eprintln!("\n  {}", text.cyan().bold());
        }
    }

    pub fn step(&self, text: &str) {
        if !self.quiet {
            eprintln!("{}", format!("  {text}").bright_black());
        }
    }

    pub fn success(&self, text: &str) {
        if !self.quiet {
            eprintln!("{}", format!("  ✓ {text}").green());
        }
    }

    pub fn warn(&self, text: &str) {
        if !self.quiet {
            eprintln!("{}", format!("  ⚠ {text}").yellow());
        }
    }

    pub fn spinner(&self, message: impl Into<String>) -> Spinner {
        if self.quiet || !self.spinner {
            return Spinner(None);
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner());
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        Spinner(Some(pb))
    }
}

pub struct Spinner(Option<ProgressBar>);

impl Spinner {
    pub fn finish(self) {
        if let Some(pb) = self.0 {
            pb.finish_and_clear();
        }
    }
}

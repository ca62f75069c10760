//! Reload progress indicator
//!
//! Shows how much of the log a reload has consumed on a single stderr line,
//! redrawn in place with a spinner while the reload runs.

use std::io::{self, Write};

/// Characters for the spinning animation
const SPINNER_CHARS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Progress line for a one-shot reload
pub struct ReloadProgress {
    label: String,
    frame: usize,
    quiet_mode: bool,
    active: bool,
}

impl ReloadProgress {
    pub fn new(label: impl Into<String>, quiet_mode: bool) -> Self {
        Self {
            label: label.into(),
            frame: 0,
            quiet_mode,
            active: false,
        }
    }

    /// Redraw the line for `fraction` (0.0 to 1.0) and `events` accepted so far
    pub fn update(&mut self, fraction: f64, events: usize) {
        if self.quiet_mode {
            return;
        }
        self.active = true;
        let spinner = SPINNER_CHARS[self.frame % SPINNER_CHARS.len()];
        self.frame += 1;

        eprint!("\r{}", render_line(spinner, &self.label, fraction, events));
        io::stderr().flush().unwrap_or(());
    }

    /// Replace the progress line with a completion line
    pub fn complete(&mut self, events: usize) {
        if self.quiet_mode {
            return;
        }
        eprint!("\r");
        eprintln!("✓ {} - {} events", self.label, events);
        io::stderr().flush().unwrap_or(());
        self.active = false;
    }

    /// Clear an unfinished line (cancellation or error)
    pub fn finish(&mut self) {
        if self.active && !self.quiet_mode {
            eprintln!();
            io::stderr().flush().unwrap_or(());
        }
        self.active = false;
    }
}

impl Drop for ReloadProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

fn render_line(spinner: char, label: &str, fraction: f64, events: usize) -> String {
    let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("{} {} {:>3}% ({} events)", spinner, label, percent, events)
}

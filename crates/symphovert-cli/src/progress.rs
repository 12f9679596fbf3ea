//! Progress bar utilities for CLI operations
//!
//! One bar per batch, advanced once per catalog record.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Create a simple progress bar with custom message
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Progress bar for a conversion batch; hidden unless wanted and stderr is a terminal
pub fn batch_progress(enabled: bool) -> ProgressBar {
    if !enabled || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = create_progress_bar(0, "Converting");
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb
}

/// Format a duration as `1h 02m 03s`, `2m 03s` or `3s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(59_900)), "59s");
        assert_eq!(format_elapsed(Duration::from_secs(123)), "2m 03s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h 02m 03s");
    }

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(100, "Converting");
        assert_eq!(pb.length(), Some(100));
    }

    #[test]
    fn test_disabled_batch_progress_is_hidden() {
        let pb = batch_progress(false);
        assert!(pb.is_hidden());
    }
}

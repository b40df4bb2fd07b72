//! Progress bars for patient-level loops and short waits

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const PATIENT_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {human_pos}/{human_len} patients ({per_sec}) {msg}";

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";

/// Bar counting patients.
///
/// When `visible` is false the bar still counts but draws nothing, so loops can
/// tick it without checking.
#[must_use]
pub fn patient_bar(patients: usize, message: &str, visible: bool) -> ProgressBar {
    let target = if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let pb = ProgressBar::with_draw_target(Some(patients as u64), target);
    pb.set_style(
        ProgressStyle::with_template(PATIENT_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Spinner for waits of unknown length, such as loading the codelist catalog
#[must_use]
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bar_still_counts() {
        let pb = patient_bar(10, "Evaluating", false);
        pb.inc(3);
        assert!(pb.is_hidden());
        assert_eq!(pb.length(), Some(10));
        assert_eq!(pb.position(), 3);
    }
}

//! Progress feedback utilities for CLI commands
//!
//! Renders the pipeline's progress steps as a bar, with sub-steps appended to
//! the message. All progress output is suppressed when --quiet flag is set.

use indicatif::{ProgressBar, ProgressStyle};
use quakegraph_core::progress::{ProgressSink, ProgressStep, PHASE_PIPELINE, PHASE_SUBSTEP};
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Create a progress bar with a known total
pub fn progress_bar(total: u64, message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.set_message(message.to_string());
    Some(pb)
}

/// Finish a spinner with a success message
pub fn finish_spinner(pb: Option<ProgressBar>, message: &str) {
    finish_with(pb, "{prefix:.green} {msg}", "✓", message);
}

/// Finish a spinner with a warning message
pub fn finish_spinner_warn(pb: Option<ProgressBar>, message: &str) {
    finish_with(pb, "{prefix:.yellow} {msg}", "!", message);
}

fn finish_with(pb: Option<ProgressBar>, template: &str, prefix: &'static str, message: &str) {
    if let Some(pb) = pb {
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            pb.set_style(style);
        }
        pb.set_prefix(prefix);
        pb.finish_with_message(message.to_string());
    }
}

/// Format one report as a bar message: the pipeline label, then any
/// sub-step as `label (n/total)`.
pub fn step_message(steps: &[ProgressStep]) -> String {
    let mut message = String::new();
    for step in steps {
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&step.label);
        if step.phase == PHASE_SUBSTEP {
            if let Some(current) = step.current {
                message.push_str(&format!(" ({}/{})", current + 1, step.total));
            }
        }
    }
    message
}

/// [`ProgressSink`] that drives a single progress bar.
pub struct PipelineProgress {
    bar: Option<ProgressBar>,
}

impl PipelineProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: progress_bar(0, "", quiet),
        }
    }

    pub fn finish(self, message: &str) {
        if let Some(pb) = self.bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl ProgressSink for PipelineProgress {
    fn report(&mut self, steps: &[ProgressStep]) {
        let Some(ref pb) = self.bar else {
            return;
        };
        if let Some(pipeline) = steps.iter().find(|s| s.phase == PHASE_PIPELINE) {
            pb.set_length(pipeline.total as u64);
            if let Some(current) = pipeline.current {
                pb.set_position(current as u64);
            }
        }
        pb.set_message(step_message(steps));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_quiet_returns_none() {
        assert!(spinner("test", true).is_none());
    }

    #[test]
    fn test_progress_bar_quiet_returns_none() {
        assert!(progress_bar(100, "test", true).is_none());
    }

    #[test]
    fn test_finish_spinner_handles_none() {
        // Should not panic
        finish_spinner(None, "done");
        finish_spinner_warn(None, "warning");
    }

    #[test]
    fn test_step_message() {
        let steps = [
            ProgressStep::pipeline(5, 10, "Disassembling QVMs"),
            ProgressStep::new(PHASE_SUBSTEP, Some(0), 3, "cgame.qvm"),
        ];
        assert_eq!(
            step_message(&steps),
            "Disassembling QVMs: cgame.qvm (1/3)"
        );
        assert_eq!(step_message(&steps[..1]), "Disassembling QVMs");
    }

    #[test]
    fn test_quiet_pipeline_progress_ignores_reports() {
        let mut sink = PipelineProgress::new(true);
        sink.report(&[ProgressStep::pipeline(0, 10, "Scanning all files")]);
        sink.finish("done");
    }
}

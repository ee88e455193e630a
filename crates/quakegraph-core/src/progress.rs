//! Progress reporting contract for the scan and assembly pipeline.
//!
//! The pipeline reports a slice of [`ProgressStep`]s whenever a step begins.
//! Sinks are called synchronously and the pipeline waits for them. Totals are
//! not fixed; they grow once bytecode modules are discovered.

use serde::Serialize;

/// Pipeline phase: scanning and extraction.
pub const PHASE_PIPELINE: u8 = 1;
/// Sub-steps of a single extraction.
pub const PHASE_SUBSTEP: u8 = 2;

/// Labels of the fixed pipeline steps, in order.
pub mod steps {
    pub const FILES: &str = "Scanning all files";
    pub const MAPS: &str = "Looking for maps";
    pub const MODELS: &str = "Looking for models";
    pub const SHADERS: &str = "Looking for shaders";
    pub const SKINS: &str = "Looking for skins";
    pub const DISASSEMBLE: &str = "Disassembling QVMs";
    pub const QVMS: &str = "Looking for QVMs";
    pub const ENTITIES: &str = "Looking for game entities";
    pub const VERTICES: &str = "Graphing vertices";
    pub const GRAPH_SHADERS: &str = "Graphing shaders";

    /// Number of fixed steps before per-module work is added.
    pub const COUNT: usize = 10;
}

/// One progress descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub phase: u8,
    /// Position within `total`; `None` for an indeterminate step.
    pub current: Option<usize>,
    pub total: usize,
    pub label: String,
}

impl ProgressStep {
    pub fn new(phase: u8, current: Option<usize>, total: usize, label: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            label: label.into(),
        }
    }

    /// A pipeline-phase step.
    pub fn pipeline(current: usize, total: usize, label: impl Into<String>) -> Self {
        Self::new(PHASE_PIPELINE, Some(current), total, label)
    }
}

/// Receiver of progress updates.
pub trait ProgressSink {
    fn report(&mut self, steps: &[ProgressStep]);
}

impl<F> ProgressSink for F
where
    F: FnMut(&[ProgressStep]),
{
    fn report(&mut self, steps: &[ProgressStep]) {
        self(steps)
    }
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _steps: &[ProgressStep]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink_collects_steps() {
        let mut seen = Vec::new();
        {
            let mut sink = |steps: &[ProgressStep]| seen.extend_from_slice(steps);
            sink.report(&[ProgressStep::pipeline(0, steps::COUNT, steps::FILES)]);
            sink.report(&[ProgressStep::new(PHASE_SUBSTEP, None, 3, "sub")]);
        }
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].label, "Scanning all files");
        assert_eq!(seen[1].current, None);
    }

    #[test]
    fn test_step_serializes() {
        let json = serde_json::to_value(ProgressStep::pipeline(1, 10, steps::MAPS)).unwrap();
        assert_eq!(json["phase"], 1);
        assert_eq!(json["current"], 1);
        assert_eq!(json["label"], "Looking for maps");
    }
}

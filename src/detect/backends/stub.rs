use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Scripted backend for tests and synthetic runs.
///
/// Plays back a fixed per-frame script of detection sets; once the script is
/// exhausted every further frame detects nothing. Also counts invocations so
/// frame decimation can be asserted from the outside.
pub struct ScriptedBackend {
    script: VecDeque<Vec<Detection>>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            calls: 0,
        }
    }

    /// Queue the detection set for the next scripted frame.
    pub fn push_frame(&mut self, detections: Vec<Detection>) -> &mut Self {
        self.script.push_back(detections);
        self
    }

    /// Queue a frame with no detections.
    pub fn push_empty_frame(&mut self) -> &mut Self {
        self.push_frame(Vec::new())
    }

    /// Number of frames the backend has been asked to detect on.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    #[test]
    fn plays_back_script_then_runs_dry() {
        let mut backend = ScriptedBackend::new();
        backend.push_frame(vec![Detection {
            class_id: 0,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 20.0),
            confidence: 0.9,
        }]);
        backend.push_empty_frame();

        assert_eq!(backend.detect(&[], 1, 1).unwrap().len(), 1);
        assert!(backend.detect(&[], 1, 1).unwrap().is_empty());
        assert!(backend.detect(&[], 1, 1).unwrap().is_empty());
        assert_eq!(backend.calls(), 3);
    }
}

//! Perception adapter.
//!
//! Bridges the camera source and the detector backend into the single call
//! the controller needs: "give me the target detection for the next sampled
//! frame, if any". Two sampling modes exist:
//!
//! - `sample`: honors the fixed decimation stride. Frames between samples
//!   are pulled from the camera and discarded without running detection,
//!   bounding inference and actuation rate.
//! - `sample_now`: detects on the very next frame. Used inside the
//!   alignment loop, where each rotation wants an immediate re-check.
//!
//! At most one detection is treated as the target per frame: the first
//! detector row matching the target class at or above the confidence floor.

use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::{Detection, DetectorBackend};
use crate::ingest::CameraSource;

pub trait Perception {
    /// Target detection for the next sampled frame (stride applied).
    fn sample(&mut self) -> Result<Option<Detection>>;

    /// Target detection for the next frame, ignoring the stride.
    fn sample_now(&mut self) -> Result<Option<Detection>>;
}

/// Camera + detector + label filter with fixed frame decimation.
pub struct CameraPerception {
    source: CameraSource,
    detector: Box<dyn DetectorBackend>,
    target_class: usize,
    min_confidence: f32,
    stride: u32,
    pulled: u64,
}

impl CameraPerception {
    pub fn new(
        source: CameraSource,
        detector: Box<dyn DetectorBackend>,
        target_class: usize,
        min_confidence: f32,
        stride: u32,
    ) -> Self {
        Self {
            source,
            detector,
            target_class,
            min_confidence,
            stride: stride.max(1),
            pulled: 0,
        }
    }

    /// Run the detector's warm-up hook before the control loop starts.
    pub fn warm_up(&mut self) -> Result<()> {
        self.detector.warm_up()
    }

    pub fn frames_pulled(&self) -> u64 {
        self.pulled
    }

    fn detect_next(&mut self) -> Result<Option<Detection>> {
        let frame = self.source.next_frame()?;
        let detections = self
            .detector
            .detect(&frame.pixels, frame.width, frame.height)?;
        log::trace!(
            "frame {}: {} detections from {}",
            self.pulled,
            detections.len(),
            self.detector.name()
        );
        Ok(detections.into_iter().find(|detection| {
            detection.class_id == self.target_class && detection.confidence >= self.min_confidence
        }))
    }
}

impl Perception for CameraPerception {
    fn sample(&mut self) -> Result<Option<Detection>> {
        loop {
            self.pulled += 1;
            if self.pulled % self.stride as u64 != 0 {
                // Skipped frames are fetched and dropped without detection.
                self.source.next_frame()?;
                continue;
            }
            return self.detect_next();
        }
    }

    fn sample_now(&mut self) -> Result<Option<Detection>> {
        self.pulled += 1;
        self.detect_next()
    }
}

/// Scripted perception for controller tests and the demo binary.
///
/// Plays back fixed answers: one queue for decimated samples, one for
/// immediate re-samples. Exhausted queues answer "not found", matching a
/// detector that has lost the target.
#[derive(Default)]
pub struct ScriptedPerception {
    samples: VecDeque<Option<Detection>>,
    resamples: VecDeque<Option<Detection>>,
}

impl ScriptedPerception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sample(&mut self, detection: Option<Detection>) -> &mut Self {
        self.samples.push_back(detection);
        self
    }

    pub fn push_resample(&mut self, detection: Option<Detection>) -> &mut Self {
        self.resamples.push_back(detection);
        self
    }
}

impl Perception for ScriptedPerception {
    fn sample(&mut self) -> Result<Option<Detection>> {
        Ok(self.samples.pop_front().flatten())
    }

    fn sample_now(&mut self) -> Result<Option<Detection>> {
        Ok(self.resamples.pop_front().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, ScriptedBackend};
    use crate::ingest::CameraConfig;

    fn bottle(confidence: f32) -> Detection {
        Detection {
            class_id: 2,
            bbox: BoundingBox::new(100.0, 200.0, 200.0, 260.0),
            confidence,
        }
    }

    fn stub_source() -> CameraSource {
        CameraSource::new(CameraConfig {
            device: "stub://perception".to_string(),
            width: 64,
            height: 48,
        })
        .expect("stub camera")
    }

    #[test]
    fn sample_applies_decimation_stride() {
        let mut backend = ScriptedBackend::new();
        backend.push_frame(vec![bottle(0.9)]);
        let mut perception =
            CameraPerception::new(stub_source(), Box::new(backend), 2, 0.25, 3);

        let hit = perception.sample().expect("sample");
        assert!(hit.is_some());
        // Two frames skipped, detection ran on the third pull only.
        assert_eq!(perception.frames_pulled(), 3);
    }

    #[test]
    fn sample_now_skips_decimation() {
        let mut backend = ScriptedBackend::new();
        backend.push_frame(vec![bottle(0.9)]);
        let mut perception =
            CameraPerception::new(stub_source(), Box::new(backend), 2, 0.25, 3);

        let hit = perception.sample_now().expect("sample_now");
        assert!(hit.is_some());
        assert_eq!(perception.frames_pulled(), 1);
    }

    #[test]
    fn non_target_classes_and_low_confidence_are_ignored() {
        let mut backend = ScriptedBackend::new();
        let mut other = bottle(0.9);
        other.class_id = 1;
        backend.push_frame(vec![other, bottle(0.1)]);
        let mut perception =
            CameraPerception::new(stub_source(), Box::new(backend), 2, 0.25, 1);

        assert!(perception.sample().expect("sample").is_none());
    }

    #[test]
    fn first_target_match_wins() {
        let mut backend = ScriptedBackend::new();
        let mut second = bottle(0.95);
        second.bbox = BoundingBox::new(0.0, 0.0, 10.0, 30.0);
        backend.push_frame(vec![bottle(0.5), second]);
        let mut perception =
            CameraPerception::new(stub_source(), Box::new(backend), 2, 0.25, 1);

        let hit = perception.sample().expect("sample").expect("detection");
        assert_eq!(hit.confidence, 0.5);
    }
}

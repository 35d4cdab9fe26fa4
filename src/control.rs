//! Search/align/approach controller.
//!
//! The decision core of the robot: a state machine advanced once per
//! sampled frame, fusing detector output with actuator feedback to decide
//! whether to rotate, by how much, when to commit to a heading, when to
//! drive forward, and when to stop and deliver.
//!
//! Phases:
//!
//! - `Searching`: no target in the sampled frame sweeps the robot by a
//!   small fixed step; a target hands its alignment to `Aligning`.
//! - `Aligning`: rotate toward the acquired angle while the target's pixel
//!   height keeps growing; once growth stalls (or the detector drops the
//!   target), commit to the current heading.
//! - `Approaching`: one calibrated open-loop forward push, then a fresh
//!   range measurement. Inside the stop band ends the chase; outside it
//!   restarts the search from scratch, deliberately discarding the old
//!   alignment.
//! - `StoppedInRange`: run the delivery gesture exactly once.
//! - `Finished`: terminal.
//!
//! Everything runs on one thread. Actuation calls block for their stated
//! duration, so the camera is never sampled while the robot moves - a
//! deliberate simplicity trade-off. Cancellation is cooperative: an
//! operator interrupt flag is observed between iterations, never mid-move.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;

use crate::align::{Alignment, CameraGeometry};
use crate::hw::{Drive, RangeFinder, ServoPair};
use crate::perception::Perception;
use crate::status::StatusReporter;

/// Stop band in centimeters, exclusive at both ends.
#[derive(Clone, Copy, Debug)]
pub struct DistanceBand {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl Default for DistanceBand {
    fn default() -> Self {
        Self {
            min_cm: 15.0,
            max_cm: 35.0,
        }
    }
}

impl DistanceBand {
    /// True when the distance lies strictly inside the band.
    pub fn contains(&self, distance_cm: f64) -> bool {
        distance_cm > self.min_cm && distance_cm < self.max_cm
    }
}

/// Calibration knobs of the decision loop.
#[derive(Clone, Copy, Debug)]
pub struct ControlParams {
    /// Sweep step while no target is visible, in degrees.
    pub search_step_degrees: f64,
    /// Open-loop forward push after alignment.
    pub forward: Duration,
    pub band: DistanceBand,
    /// Alignment re-samples without a detection before the target counts
    /// as lost and the heading is committed.
    pub max_stale_frames: u32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            search_step_degrees: 2.0,
            forward: Duration::from_secs_f64(1.8),
            band: DistanceBand::default(),
            max_stale_frames: 5,
        }
    }
}

/// Last alignment seen during the alignment loop, with dropout aging.
///
/// Detector dropout is tolerated silently: a missed re-sample keeps the
/// previous estimate and bumps its age. Once the age passes the bound the
/// target counts as lost and the loop commits to the heading it has.
#[derive(Clone, Copy, Debug)]
pub struct TrackedTarget {
    alignment: Alignment,
    stale_frames: u32,
    max_stale_frames: u32,
}

impl TrackedTarget {
    pub fn new(alignment: Alignment, max_stale_frames: u32) -> Self {
        Self {
            alignment,
            stale_frames: 0,
            max_stale_frames,
        }
    }

    /// Fresh detection: replace the estimate and reset its age.
    pub fn refresh(&mut self, alignment: Alignment) {
        self.alignment = alignment;
        self.stale_frames = 0;
    }

    /// Missed re-sample: keep the stale estimate, bump its age.
    pub fn mark_missed(&mut self) {
        self.stale_frames = self.stale_frames.saturating_add(1);
    }

    pub fn is_lost(&self) -> bool {
        self.stale_frames >= self.max_stale_frames
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn stale_frames(&self) -> u32 {
        self.stale_frames
    }
}

/// Controller phase. Exactly one instance exists per run, owned and
/// mutated only by the controller's loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Searching,
    Aligning { target: Alignment },
    Approaching,
    StoppedInRange,
    Finished,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Searching => "searching",
            Phase::Aligning { .. } => "aligning",
            Phase::Approaching => "approaching",
            Phase::StoppedInRange => "stopped-in-range",
            Phase::Finished => "finished",
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Stopped in the band and delivered the gesture.
    Delivered,
    /// Operator interrupt observed between iterations.
    Interrupted,
}

pub struct Controller<'a, 'd> {
    perception: &'a mut dyn Perception,
    drive: &'a mut dyn Drive,
    servos: &'a mut dyn ServoPair,
    range: &'a mut dyn RangeFinder,
    status: &'a mut StatusReporter<'d>,
    geometry: CameraGeometry,
    params: ControlParams,
    phase: Phase,
}

impl<'a, 'd> Controller<'a, 'd> {
    pub fn new(
        perception: &'a mut dyn Perception,
        drive: &'a mut dyn Drive,
        servos: &'a mut dyn ServoPair,
        range: &'a mut dyn RangeFinder,
        status: &'a mut StatusReporter<'d>,
        geometry: CameraGeometry,
        params: ControlParams,
    ) -> Self {
        Self {
            perception,
            drive,
            servos,
            range,
            status,
            geometry,
            params,
            phase: Phase::Searching,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive the state machine to completion or interrupt.
    ///
    /// Hardware faults propagate out as errors; the caller's cleanup path
    /// is expected to run regardless (see `quiesce`).
    pub fn run(&mut self, interrupt: &AtomicBool) -> Result<Outcome> {
        loop {
            if interrupt.load(Ordering::SeqCst) {
                log::info!("interrupt observed in {} phase", self.phase.name());
                return Ok(Outcome::Interrupted);
            }
            if self.phase == Phase::Finished {
                return Ok(Outcome::Delivered);
            }
            self.step(interrupt)?;
        }
    }

    /// Advance by one transition. Exposed so each phase is independently
    /// drivable in tests.
    pub fn step(&mut self, interrupt: &AtomicBool) -> Result<()> {
        let next = match self.phase {
            Phase::Searching => self.search()?,
            Phase::Aligning { target } => self.align(target, interrupt)?,
            Phase::Approaching => self.approach()?,
            Phase::StoppedInRange => self.deliver()?,
            Phase::Finished => Phase::Finished,
        };
        if next != self.phase {
            log::debug!("{} -> {}", self.phase.name(), next.name());
        }
        self.phase = next;
        Ok(())
    }

    /// One decimated sample. A miss sweeps and stays; a hit acquires.
    fn search(&mut self) -> Result<Phase> {
        match self.perception.sample()? {
            None => {
                self.status.not_found()?;
                self.drive
                    .rotate_by_angle(self.params.search_step_degrees)?;
                Ok(Phase::Searching)
            }
            Some(detection) => {
                let target = Alignment::from_detection(self.geometry, &detection);
                self.status.found(target.angle_degrees)?;
                Ok(Phase::Aligning { target })
            }
        }
    }

    /// Rotate toward the acquired angle while the target keeps growing.
    ///
    /// The angle is the one captured at acquisition; only the height is
    /// refreshed inside the loop. Each iteration re-samples a single fresh
    /// frame with no decimation. The loop is bounded: heights that stop
    /// increasing end it, and so does a detector that stays silent past
    /// the staleness bound.
    fn align(&mut self, target: Alignment, interrupt: &AtomicBool) -> Result<Phase> {
        let mut tracker = TrackedTarget::new(target, self.params.max_stale_frames);
        let mut previous_height = 0.0_f64;
        let mut current_height = target.target_height;

        while current_height > previous_height {
            if interrupt.load(Ordering::SeqCst) {
                break;
            }
            self.drive.rotate_by_angle(target.angle_degrees)?;
            previous_height = current_height;

            match self.perception.sample_now()? {
                Some(detection) => {
                    let seen = Alignment::from_detection(self.geometry, &detection);
                    tracker.refresh(seen);
                    current_height = seen.target_height;
                    log::debug!("target height {:.0} px", current_height);
                }
                None => {
                    tracker.mark_missed();
                    if tracker.is_lost() {
                        log::debug!(
                            "target unseen for {} re-samples, committing to heading",
                            tracker.stale_frames()
                        );
                        break;
                    }
                    // Stale height carries over; the growth check ends the
                    // loop on the next pass.
                }
            }
        }

        Ok(Phase::Approaching)
    }

    /// One open-loop push forward, then a fresh range check.
    fn approach(&mut self) -> Result<Phase> {
        self.drive.stop()?;
        self.drive.forward(Some(self.params.forward))?;
        self.status.moving_forward()?;

        let distance_cm = self.range.measure()?;
        if self.params.band.contains(distance_cm) {
            self.drive.stop()?;
            self.status.within_range(distance_cm, self.params.band)?;
            Ok(Phase::StoppedInRange)
        } else {
            // Out of band: re-acquire from scratch. The previous alignment
            // is discarded on purpose; the next pass re-verifies it.
            log::info!("distance {:.1} cm outside stop band, searching again", distance_cm);
            Ok(Phase::Searching)
        }
    }

    /// Delivery gesture, once, then terminal.
    fn deliver(&mut self) -> Result<Phase> {
        self.servos.gesture()?;
        Ok(Phase::Finished)
    }
}

/// Unconditional shutdown path: stop the motors, park the servos, post the
/// terminal message. Runs the same way after normal completion, operator
/// interrupt, and hardware fault, so failures here are logged, not
/// propagated - the caller is already unwinding.
pub fn quiesce(drive: &mut dyn Drive, servos: &mut dyn ServoPair, status: &mut StatusReporter<'_>) {
    if let Err(err) = drive.stop() {
        log::error!("drive stop failed during cleanup: {:#}", err);
    }
    if let Err(err) = servos.neutral() {
        log::error!("servo neutral failed during cleanup: {:#}", err);
    }
    if let Err(err) = status.cleanup_done() {
        log::error!("display update failed during cleanup: {:#}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(angle: f64, height: f64) -> Alignment {
        Alignment {
            angle_degrees: angle,
            target_height: height,
        }
    }

    #[test]
    fn band_is_exclusive_at_both_ends() {
        let band = DistanceBand::default();
        assert!(!band.contains(15.0));
        assert!(!band.contains(35.0));
        assert!(band.contains(25.0));
        assert!(band.contains(15.000001));
        assert!(!band.contains(14.9));
        assert!(!band.contains(35.1));
    }

    #[test]
    fn tracker_refresh_resets_age() {
        let mut tracker = TrackedTarget::new(alignment(1.0, 60.0), 2);
        tracker.mark_missed();
        assert_eq!(tracker.stale_frames(), 1);
        assert!(!tracker.is_lost());

        tracker.refresh(alignment(1.0, 70.0));
        assert_eq!(tracker.stale_frames(), 0);
        assert_eq!(tracker.alignment().target_height, 70.0);
    }

    #[test]
    fn tracker_reports_lost_at_bound() {
        let mut tracker = TrackedTarget::new(alignment(1.0, 60.0), 2);
        tracker.mark_missed();
        assert!(!tracker.is_lost());
        tracker.mark_missed();
        assert!(tracker.is_lost());
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(Phase::Searching.name(), "searching");
        assert_eq!(
            Phase::Aligning {
                target: alignment(0.0, 0.0)
            }
            .name(),
            "aligning"
        );
        assert_eq!(Phase::Finished.name(), "finished");
    }
}

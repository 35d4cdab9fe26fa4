//! bottlebot
//!
//! Closed-loop controller for a small mobile robot that visually locates a
//! bottle, rotates in place to center on it, advances, stops inside a
//! target distance band, and finishes with a fixed gripper gesture.
//!
//! # Architecture
//!
//! ```text
//! ingest (camera) -> detect (model + labels) -> perception (decimation)
//!                                                    |
//!                                       control (state machine) -> hw (motors,
//!                                                    |             servos, range)
//!                                              status (display + log)
//! ```
//!
//! The controller pulls a sampled frame through the perception adapter, the
//! alignment estimator turns any bottle detection into a rotation angle and
//! a framing proxy, and the state machine decides whether to sweep, align,
//! advance, or stop and deliver. The display is a side channel only.
//!
//! Everything runs on one control thread: actuation calls block for their
//! commanded duration, so sensing and moving never overlap. Rotation is
//! open loop (timed, no encoders) and commanded angles are best-effort.
//!
//! # Module Structure
//!
//! - `config`: JSON file + env configuration, validated at startup
//! - `ingest`: camera frame sources (synthetic `stub://`, V4L2)
//! - `detect`: detector backends, detection results, label list
//! - `perception`: frame decimation + target-class filtering
//! - `align`: bounding box -> rotation angle / target height
//! - `control`: the search/align/approach state machine
//! - `hw`: drive motors, servos, range finder, display
//! - `status`: state mirroring to display and log

pub mod align;
pub mod config;
pub mod control;
pub mod detect;
pub mod hw;
pub mod ingest;
pub mod perception;
pub mod status;

pub use align::{Alignment, CameraGeometry};
pub use config::BotConfig;
pub use control::{
    quiesce, ControlParams, Controller, DistanceBand, Outcome, Phase, TrackedTarget,
};
pub use detect::{BoundingBox, Detection, DetectorBackend, LabelMap, ScriptedBackend};
pub use hw::{
    Drive, DriveCommand, GestureSettings, LogDisplay, RangeFinder, RotationCalib, ServoPair,
    StatusDisplay, StubDisplay, StubDrive, StubRangeFinder, StubServoPair,
};
pub use ingest::{CameraConfig, CameraSource, CameraStats, Frame};
pub use perception::{CameraPerception, Perception, ScriptedPerception};
pub use status::StatusReporter;

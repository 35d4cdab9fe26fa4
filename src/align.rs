//! Alignment estimation.
//!
//! Maps a detected bounding box to a rotation angle and a framing proxy.
//! The robot rotates about a vertical axis, so the vertical pixel offset of
//! the box center is the steering signal, scaled through the camera's
//! vertical field of view. The box height stands in for distance: the
//! target growing taller across frames means the rotation is improving
//! framing. Both values are recomputed from scratch every sampled frame.

use crate::detect::Detection;

/// Fixed camera geometry, loaded once from configuration.
#[derive(Clone, Copy, Debug)]
pub struct CameraGeometry {
    pub frame_width: u32,
    pub frame_height: u32,
    pub vertical_fov_degrees: f64,
}

impl Default for CameraGeometry {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            vertical_fov_degrees: 48.8,
        }
    }
}

/// Per-frame steering estimate for the current target.
///
/// `angle_degrees` is zero for a vertically centered target and positive
/// when the target sits below the frame center. `target_height` is the box
/// height in pixels, always non-negative for a well-formed box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub angle_degrees: f64,
    pub target_height: f64,
}

impl Alignment {
    /// Compute the estimate for one detection under fixed geometry.
    ///
    /// Callers must only invoke this with an actual detection; a frame
    /// without one is "target not found" and never reaches the estimator.
    pub fn from_detection(geometry: CameraGeometry, detection: &Detection) -> Self {
        let frame_height = geometry.frame_height as f64;
        let delta_y = detection.bbox.center_y() as f64 - frame_height / 2.0;
        Self {
            angle_degrees: (delta_y / frame_height) * geometry.vertical_fov_degrees,
            target_height: detection.bbox.height() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};

    fn detection(y1: f32, y2: f32) -> Detection {
        Detection {
            class_id: 0,
            bbox: BoundingBox::new(100.0, y1, 200.0, y2),
            confidence: 0.9,
        }
    }

    #[test]
    fn centered_target_has_zero_angle() {
        // center_y = 240 = frame_height / 2
        let alignment = Alignment::from_detection(CameraGeometry::default(), &detection(220.0, 260.0));
        assert_eq!(alignment.angle_degrees, 0.0);
        assert_eq!(alignment.target_height, 40.0);
    }

    #[test]
    fn lower_half_is_positive_upper_half_is_negative() {
        let geometry = CameraGeometry::default();
        let below = Alignment::from_detection(geometry, &detection(300.0, 360.0));
        let above = Alignment::from_detection(geometry, &detection(100.0, 160.0));
        assert!(below.angle_degrees > 0.0);
        assert!(above.angle_degrees < 0.0);
    }

    #[test]
    fn angle_scales_linearly_with_offset_and_fov() {
        let geometry = CameraGeometry::default();
        let near = Alignment::from_detection(geometry, &detection(250.0, 270.0));
        let far = Alignment::from_detection(geometry, &detection(270.0, 290.0));
        // center offsets 20 and 40 pixels: exactly double the angle
        assert!((far.angle_degrees - 2.0 * near.angle_degrees).abs() < 1e-9);

        let wide = CameraGeometry {
            vertical_fov_degrees: 97.6,
            ..geometry
        };
        let near_wide = Alignment::from_detection(wide, &detection(250.0, 270.0));
        assert!((near_wide.angle_degrees - 2.0 * near.angle_degrees).abs() < 1e-9);
    }

    #[test]
    fn reference_box_matches_hand_computation() {
        // box (100,200,200,260) in a 640x480 frame, 48.8 degree vertical fov:
        // center_y = 230, angle = ((230-240)/480)*48.8, height = 60
        let alignment = Alignment::from_detection(CameraGeometry::default(), &detection(200.0, 260.0));
        assert!((alignment.angle_degrees - (-10.0 / 480.0) * 48.8).abs() < 1e-9);
        assert!((alignment.angle_degrees - (-1.0166666)).abs() < 1e-3);
        assert_eq!(alignment.target_height, 60.0);
    }

    #[test]
    fn target_height_is_non_negative_for_well_formed_boxes() {
        let alignment = Alignment::from_detection(CameraGeometry::default(), &detection(10.0, 11.0));
        assert!(alignment.target_height >= 0.0);
    }
}

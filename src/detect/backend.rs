use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend runs object detection on a single RGB frame and returns every
/// box it found, in model output order. Backends hold no frame state: the
/// pixel slice is read-only and must not be retained beyond the `detect`
/// call. Class ids index into the label list loaded at startup.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame of packed RGB24 pixels.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the control loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

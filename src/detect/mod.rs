mod backend;
mod backends;
mod labels;
mod result;

use anyhow::Result;

use crate::config::{CameraSettings, DetectorSettings};

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::LabelMap;
pub use result::{BoundingBox, Detection};

/// Pick a detector backend from configuration.
///
/// An empty or `stub://` model path selects the scripted backend (which
/// never detects anything on its own - useful for bench runs of the motion
/// stack). Any real path requires the `backend-tract` feature.
pub fn backend_from_config(
    detector: &DetectorSettings,
    camera: &CameraSettings,
) -> Result<Box<dyn DetectorBackend>> {
    if detector.model_path.is_empty() || detector.model_path.starts_with("stub://") {
        log::warn!("no detection model configured, using scripted backend");
        return Ok(Box::new(ScriptedBackend::new()));
    }

    #[cfg(feature = "backend-tract")]
    {
        let backend = TractBackend::new(&detector.model_path, camera.width, camera.height)?
            .with_threshold(detector.min_confidence);
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        let _ = camera;
        Err(anyhow::anyhow!(
            "model path {} requires the backend-tract feature",
            detector.model_path
        ))
    }
}

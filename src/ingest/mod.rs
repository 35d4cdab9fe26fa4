//! Camera frame sources.
//!
//! A source is a lazy, infinite, non-restartable sequence of frames: one
//! frame per `next_frame` call, captured on demand. Two backends exist:
//!
//! - Synthetic (`stub://` device paths): deterministic pattern frames for
//!   tests, the demo binary, and bench runs off the robot.
//! - V4L2 devices (feature: `ingest-v4l2`): the robot camera.
//!
//! Sources hand out raw RGB24 pixels only; detection and frame decimation
//! happen upstream in the perception adapter.

#[cfg(feature = "ingest-v4l2")]
mod v4l2;

use anyhow::Result;

/// One captured frame of packed RGB24 pixels.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video0"), or "stub://name" for synthetic.
    pub device: String,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }

        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(v4l2::DeviceCamera::new(config)?),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow::anyhow!(
                "camera device {} requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Connect to the camera.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests
// ----------------------------------------------------------------------------

const SYNTHETIC_FRAME_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    /// Synthetic cameras are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        // A real camera blocks until the next frame; pace the synthetic one
        // the same way so loops over it do not spin hot.
        std::thread::sleep(SYNTHETIC_FRAME_INTERVAL);
        self.frame_count += 1;
        Ok(Frame {
            pixels: self.generate_synthetic_pixels(),
            width: self.config.width,
            height: self.config.height,
        })
    }

    /// Deterministic pattern pixels, varied per frame so downstream code
    /// cannot accidentally depend on identical frames.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn synthetic_camera_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.pixels.len(), 640 * 480 * 3);

        Ok(())
    }

    #[test]
    fn synthetic_camera_counts_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        source.next_frame()?;
        source.next_frame()?;
        source.next_frame()?;

        assert_eq!(source.stats().frames_captured, 3);
        assert!(source.is_healthy());

        Ok(())
    }
}

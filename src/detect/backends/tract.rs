#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Tract-based backend for ONNX inference.
///
/// Loads a local single-output detection model (YOLO-style export: one row
/// per candidate box, `[cx, cy, w, h, objectness, class scores...]`, in
/// input-pixel coordinates) and decodes rows above the confidence threshold.
/// No network I/O; disk access is limited to the one-time model load.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.25,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode_rows(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let view = view
            .into_dimensionality::<tract_ndarray::Ix3>()
            .map_err(|_| {
                anyhow!(
                    "unexpected model output shape {:?} (want [1, rows, 5+classes])",
                    output.shape()
                )
            })?;
        if view.shape()[2] < 6 {
            return Err(anyhow!(
                "model output rows carry {} values, need at least 6",
                view.shape()[2]
            ));
        }

        let frame_w = self.width as f32;
        let frame_h = self.height as f32;
        let mut detections = Vec::new();
        for row in view.index_axis(tract_ndarray::Axis(0), 0).outer_iter() {
            let objectness = row[4];
            let (class_id, class_score) = row
                .iter()
                .skip(5)
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (idx, &score)| {
                    if score > best.1 {
                        (idx, score)
                    } else {
                        best
                    }
                });
            let confidence = objectness * class_score;
            if !confidence.is_finite() || confidence < self.confidence_threshold {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            let x1 = (cx - w / 2.0).clamp(0.0, frame_w);
            let y1 = (cy - h / 2.0).clamp(0.0, frame_h);
            let x2 = (cx + w / 2.0).clamp(0.0, frame_w);
            let y2 = (cy + h / 2.0).clamp(0.0, frame_h);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            detections.push(Detection {
                class_id,
                bbox: BoundingBox::new(x1, y1, x2, y2),
                confidence,
            });
        }

        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_rows(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        // One pass over a black frame so the first real sample is not slowed
        // by lazy kernel setup.
        let pixels = vec![0u8; (self.width * self.height * 3) as usize];
        self.detect(&pixels, self.width, self.height)?;
        Ok(())
    }
}

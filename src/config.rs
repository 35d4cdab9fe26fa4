//! Daemon configuration.
//!
//! A JSON config file named by `BOTTLEBOT_CONFIG` (all sections optional),
//! followed by environment overrides for the handful of knobs that change
//! between bench and robot, followed by validation. Pin numbers and the
//! timing constants are configuration rather than code constants: they are
//! empirical calibration tied to one chassis.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::align::CameraGeometry;
use crate::control::{ControlParams, DistanceBand};
use crate::hw::GestureSettings;
use crate::ingest::CameraConfig;

const DEFAULT_CAMERA_DEVICE: &str = "stub://camera";
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_VERTICAL_FOV_DEGREES: f64 = 48.8;

const DEFAULT_MODEL_PATH: &str = "";
const DEFAULT_LABELS_PATH: &str = "";
const DEFAULT_TARGET_LABEL: &str = "bottle";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

const DEFAULT_SAMPLE_STRIDE: u32 = 3;
const DEFAULT_SEARCH_STEP_DEGREES: f64 = 2.0;
const DEFAULT_FORWARD_SECS: f64 = 1.8;
const DEFAULT_BAND_MIN_CM: f64 = 15.0;
const DEFAULT_BAND_MAX_CM: f64 = 35.0;
const DEFAULT_MAX_STALE_FRAMES: u32 = 5;

const DEFAULT_IN1: u8 = 17;
const DEFAULT_IN2: u8 = 27;
const DEFAULT_IN3: u8 = 22;
const DEFAULT_IN4: u8 = 5;
const DEFAULT_ENA: u8 = 13;
const DEFAULT_ENB: u8 = 6;
const DEFAULT_ROTATE_DUTY: f64 = 0.95;
const DEFAULT_FORWARD_DUTY: f64 = 0.80;

const DEFAULT_TRIGGER_PIN: u8 = 23;
const DEFAULT_ECHO_PIN: u8 = 24;
const DEFAULT_ECHO_TIMEOUT_MS: u64 = 50;

const DEFAULT_SERVO_LEFT_PIN: u8 = 16;
const DEFAULT_SERVO_RIGHT_PIN: u8 = 26;
const DEFAULT_SERVO_THROW_LEFT: f64 = 0.24;
const DEFAULT_SERVO_THROW_RIGHT: f64 = 0.16;
const DEFAULT_SERVO_HOLD_SECS: f64 = 1.7;

const DEFAULT_LCD_ADDR: u8 = 0x27;
const DEFAULT_LCD_COLS: usize = 16;
const DEFAULT_LCD_ROWS: usize = 2;

#[derive(Debug, Deserialize, Default)]
struct BotConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    control: Option<ControlConfigFile>,
    motors: Option<MotorConfigFile>,
    range: Option<RangeConfigFile>,
    servo: Option<ServoConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    vertical_fov_degrees: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model_path: Option<String>,
    labels_path: Option<String>,
    target_label: Option<String>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ControlConfigFile {
    sample_stride: Option<u32>,
    search_step_degrees: Option<f64>,
    forward_secs: Option<f64>,
    band_min_cm: Option<f64>,
    band_max_cm: Option<f64>,
    max_stale_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MotorConfigFile {
    in1: Option<u8>,
    in2: Option<u8>,
    in3: Option<u8>,
    in4: Option<u8>,
    ena: Option<u8>,
    enb: Option<u8>,
    rotate_duty: Option<f64>,
    forward_duty: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RangeConfigFile {
    trigger_pin: Option<u8>,
    echo_pin: Option<u8>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ServoConfigFile {
    left_pin: Option<u8>,
    right_pin: Option<u8>,
    throw_left: Option<f64>,
    throw_right: Option<f64>,
    hold_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    i2c_addr: Option<u8>,
    cols: Option<usize>,
    rows: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub control: ControlSettings,
    pub motors: MotorSettings,
    pub range: RangeSettings,
    pub servo: ServoSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub vertical_fov_degrees: f64,
}

impl CameraSettings {
    pub fn geometry(&self) -> CameraGeometry {
        CameraGeometry {
            frame_width: self.width,
            frame_height: self.height,
            vertical_fov_degrees: self.vertical_fov_degrees,
        }
    }

    pub fn source_config(&self) -> CameraConfig {
        CameraConfig {
            device: self.device.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: String,
    pub labels_path: String,
    pub target_label: String,
    pub min_confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub sample_stride: u32,
    pub search_step_degrees: f64,
    pub forward_secs: f64,
    pub band_min_cm: f64,
    pub band_max_cm: f64,
    pub max_stale_frames: u32,
}

impl ControlSettings {
    pub fn params(&self) -> ControlParams {
        ControlParams {
            search_step_degrees: self.search_step_degrees,
            forward: Duration::from_secs_f64(self.forward_secs),
            band: DistanceBand {
                min_cm: self.band_min_cm,
                max_cm: self.band_max_cm,
            },
            max_stale_frames: self.max_stale_frames,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotorSettings {
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
    pub ena: u8,
    pub enb: u8,
    pub rotate_duty: f64,
    pub forward_duty: f64,
}

#[derive(Debug, Clone)]
pub struct RangeSettings {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub timeout_ms: u64,
}

impl RangeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct ServoSettings {
    pub left_pin: u8,
    pub right_pin: u8,
    pub throw_left: f64,
    pub throw_right: f64,
    pub hold_secs: f64,
}

impl ServoSettings {
    pub fn gesture(&self) -> GestureSettings {
        GestureSettings {
            throw_left: self.throw_left,
            throw_right: self.throw_right,
            hold: Duration::from_secs_f64(self.hold_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub i2c_addr: u8,
    pub cols: usize,
    pub rows: usize,
}

impl BotConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BOTTLEBOT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BotConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let control = file.control.unwrap_or_default();
        let motors = file.motors.unwrap_or_default();
        let range = file.range.unwrap_or_default();
        let servo = file.servo.unwrap_or_default();
        let display = file.display.unwrap_or_default();

        Self {
            camera: CameraSettings {
                device: camera
                    .device
                    .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                width: camera.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
                vertical_fov_degrees: camera
                    .vertical_fov_degrees
                    .unwrap_or(DEFAULT_VERTICAL_FOV_DEGREES),
            },
            detector: DetectorSettings {
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
                labels_path: detector
                    .labels_path
                    .unwrap_or_else(|| DEFAULT_LABELS_PATH.to_string()),
                target_label: detector
                    .target_label
                    .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
                min_confidence: detector.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
            },
            control: ControlSettings {
                sample_stride: control.sample_stride.unwrap_or(DEFAULT_SAMPLE_STRIDE),
                search_step_degrees: control
                    .search_step_degrees
                    .unwrap_or(DEFAULT_SEARCH_STEP_DEGREES),
                forward_secs: control.forward_secs.unwrap_or(DEFAULT_FORWARD_SECS),
                band_min_cm: control.band_min_cm.unwrap_or(DEFAULT_BAND_MIN_CM),
                band_max_cm: control.band_max_cm.unwrap_or(DEFAULT_BAND_MAX_CM),
                max_stale_frames: control.max_stale_frames.unwrap_or(DEFAULT_MAX_STALE_FRAMES),
            },
            motors: MotorSettings {
                in1: motors.in1.unwrap_or(DEFAULT_IN1),
                in2: motors.in2.unwrap_or(DEFAULT_IN2),
                in3: motors.in3.unwrap_or(DEFAULT_IN3),
                in4: motors.in4.unwrap_or(DEFAULT_IN4),
                ena: motors.ena.unwrap_or(DEFAULT_ENA),
                enb: motors.enb.unwrap_or(DEFAULT_ENB),
                rotate_duty: motors.rotate_duty.unwrap_or(DEFAULT_ROTATE_DUTY),
                forward_duty: motors.forward_duty.unwrap_or(DEFAULT_FORWARD_DUTY),
            },
            range: RangeSettings {
                trigger_pin: range.trigger_pin.unwrap_or(DEFAULT_TRIGGER_PIN),
                echo_pin: range.echo_pin.unwrap_or(DEFAULT_ECHO_PIN),
                timeout_ms: range.timeout_ms.unwrap_or(DEFAULT_ECHO_TIMEOUT_MS),
            },
            servo: ServoSettings {
                left_pin: servo.left_pin.unwrap_or(DEFAULT_SERVO_LEFT_PIN),
                right_pin: servo.right_pin.unwrap_or(DEFAULT_SERVO_RIGHT_PIN),
                throw_left: servo.throw_left.unwrap_or(DEFAULT_SERVO_THROW_LEFT),
                throw_right: servo.throw_right.unwrap_or(DEFAULT_SERVO_THROW_RIGHT),
                hold_secs: servo.hold_secs.unwrap_or(DEFAULT_SERVO_HOLD_SECS),
            },
            display: DisplaySettings {
                i2c_addr: display.i2c_addr.unwrap_or(DEFAULT_LCD_ADDR),
                cols: display.cols.unwrap_or(DEFAULT_LCD_COLS),
                rows: display.rows.unwrap_or(DEFAULT_LCD_ROWS),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("BOTTLEBOT_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(model) = std::env::var("BOTTLEBOT_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = model;
            }
        }
        if let Ok(labels) = std::env::var("BOTTLEBOT_LABELS") {
            if !labels.trim().is_empty() {
                self.detector.labels_path = labels;
            }
        }
        if let Ok(label) = std::env::var("BOTTLEBOT_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.detector.target_label = label;
            }
        }
        if let Ok(stride) = std::env::var("BOTTLEBOT_SAMPLE_STRIDE") {
            self.control.sample_stride = stride
                .parse()
                .map_err(|_| anyhow!("BOTTLEBOT_SAMPLE_STRIDE must be an integer"))?;
        }
        if let Ok(secs) = std::env::var("BOTTLEBOT_FORWARD_SECS") {
            self.control.forward_secs = secs
                .parse()
                .map_err(|_| anyhow!("BOTTLEBOT_FORWARD_SECS must be a number of seconds"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera frame size must be non-zero"));
        }
        if self.camera.vertical_fov_degrees <= 0.0 {
            return Err(anyhow!("vertical field of view must be positive"));
        }
        if self.detector.target_label.trim().is_empty() {
            return Err(anyhow!("target label must not be empty"));
        }
        if self.control.sample_stride == 0 {
            return Err(anyhow!("sample stride must be at least 1"));
        }
        if self.control.forward_secs <= 0.0 {
            return Err(anyhow!("forward drive duration must be positive"));
        }
        if self.control.band_min_cm <= 0.0 || self.control.band_min_cm >= self.control.band_max_cm
        {
            return Err(anyhow!("stop band must satisfy 0 < min < max"));
        }
        if self.control.max_stale_frames == 0 {
            return Err(anyhow!("max stale frames must be at least 1"));
        }
        for duty in [self.motors.rotate_duty, self.motors.forward_duty] {
            if !(0.0..=1.0).contains(&duty) {
                return Err(anyhow!("motor duty cycles must be within 0.0..=1.0"));
            }
        }
        if self.range.timeout_ms == 0 {
            return Err(anyhow!("range echo timeout must be positive"));
        }
        if self.display.cols == 0 || self.display.rows == 0 {
            return Err(anyhow!("display must have at least one row and column"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<BotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_calibrated_chassis() {
        let mut cfg = BotConfig::from_file(BotConfigFile::default());
        cfg.validate().expect("defaults validate");

        assert_eq!(cfg.camera.device, "stub://camera");
        assert_eq!(cfg.camera.width, 640);
        assert_eq!(cfg.camera.height, 480);
        assert!((cfg.camera.vertical_fov_degrees - 48.8).abs() < 1e-9);
        assert_eq!(cfg.detector.target_label, "bottle");
        assert_eq!(cfg.control.sample_stride, 3);
        assert!((cfg.control.forward_secs - 1.8).abs() < 1e-9);
        assert_eq!(cfg.motors.in1, 17);
        assert_eq!(cfg.range.trigger_pin, 23);
        assert_eq!(cfg.servo.left_pin, 16);
        assert_eq!(cfg.display.i2c_addr, 0x27);
    }

    #[test]
    fn zero_stride_is_rejected() {
        let mut cfg = BotConfig::from_file(BotConfigFile::default());
        cfg.control.sample_stride = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut cfg = BotConfig::from_file(BotConfigFile::default());
        cfg.control.band_min_cm = 40.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn control_settings_convert_to_params() {
        let cfg = BotConfig::from_file(BotConfigFile::default());
        let params = cfg.control.params();
        assert_eq!(params.forward, Duration::from_secs_f64(1.8));
        assert!(params.band.contains(25.0));
        assert!(!params.band.contains(15.0));
    }
}

//! Drive motors.
//!
//! Two DC motors behind an H-bridge: four direction pins plus two PWM
//! enable lines. Rotation is open loop - there is no encoder - so a
//! commanded angle is converted to a spin duration through a fixed
//! calibration and the achieved rotation is only as good as that
//! calibration. Callers must treat angles as best-effort commands.

use std::time::Duration;

use anyhow::Result;

/// Open-loop rotation calibration: seconds of spin per commanded angle.
#[derive(Clone, Copy, Debug)]
pub struct RotationCalib {
    /// Angle covered by one calibration step, in degrees.
    pub degrees_per_step: f64,
    /// Spin time for one calibration step, in seconds.
    pub secs_per_step: f64,
}

impl Default for RotationCalib {
    fn default() -> Self {
        Self {
            degrees_per_step: 30.0,
            secs_per_step: 0.75,
        }
    }
}

impl RotationCalib {
    /// Spin duration for a commanded angle. Zero angle is a zero-duration
    /// no-op; direction is carried by the angle's sign, not the duration.
    pub fn spin_time(&self, angle_degrees: f64) -> Duration {
        Duration::from_secs_f64((angle_degrees / self.degrees_per_step).abs() * self.secs_per_step)
    }
}

/// Drive command surface consumed by the controller.
///
/// All commands are synchronous: a call returns once the motion (and any
/// stated duration) is over. `stop` is idempotent and always safe.
pub trait Drive {
    /// Rotate in place by a signed angle; positive is clockwise.
    fn rotate_by_angle(&mut self, angle_degrees: f64) -> Result<()>;

    /// Drive forward, optionally stopping after a duration.
    fn forward(&mut self, duration: Option<Duration>) -> Result<()>;

    /// Zero all motor outputs immediately.
    fn stop(&mut self) -> Result<()>;
}

/// Drive commands as observed by the recording stub.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveCommand {
    Rotate { angle_degrees: f64 },
    Forward { duration: Option<Duration> },
    Stop,
}

/// Recording stub drive: logs and remembers every command, never sleeps.
#[derive(Default)]
pub struct StubDrive {
    pub commands: Vec<DriveCommand>,
}

impl StubDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotation commands only, in issue order.
    pub fn rotations(&self) -> Vec<f64> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DriveCommand::Rotate { angle_degrees } => Some(*angle_degrees),
                _ => None,
            })
            .collect()
    }

    pub fn forward_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DriveCommand::Forward { .. }))
            .count()
    }
}

impl Drive for StubDrive {
    fn rotate_by_angle(&mut self, angle_degrees: f64) -> Result<()> {
        log::debug!("stub drive: rotate {:.2} deg", angle_degrees);
        self.commands.push(DriveCommand::Rotate { angle_degrees });
        Ok(())
    }

    fn forward(&mut self, duration: Option<Duration>) -> Result<()> {
        log::debug!("stub drive: forward {:?}", duration);
        self.commands.push(DriveCommand::Forward { duration });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        log::debug!("stub drive: stop");
        self.commands.push(DriveCommand::Stop);
        Ok(())
    }
}

#[cfg(feature = "hw-rpi")]
pub use gpio::GpioDrive;

#[cfg(feature = "hw-rpi")]
mod gpio {
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use rppal::gpio::{Gpio, OutputPin};

    use super::{Drive, RotationCalib};
    use crate::config::MotorSettings;

    const MOTOR_PWM_HZ: f64 = 1000.0;

    /// H-bridge drive on Raspberry Pi GPIO.
    pub struct GpioDrive {
        in1: OutputPin,
        in2: OutputPin,
        in3: OutputPin,
        in4: OutputPin,
        ena: OutputPin,
        enb: OutputPin,
        calib: RotationCalib,
        rotate_duty: f64,
        forward_duty: f64,
    }

    impl GpioDrive {
        pub fn new(settings: &MotorSettings) -> Result<Self> {
            let gpio = Gpio::new().context("open GPIO")?;
            let pin = |number: u8| -> Result<OutputPin> {
                Ok(gpio
                    .get(number)
                    .with_context(|| format!("claim GPIO pin {}", number))?
                    .into_output_low())
            };
            Ok(Self {
                in1: pin(settings.in1)?,
                in2: pin(settings.in2)?,
                in3: pin(settings.in3)?,
                in4: pin(settings.in4)?,
                ena: pin(settings.ena)?,
                enb: pin(settings.enb)?,
                calib: RotationCalib::default(),
                rotate_duty: settings.rotate_duty,
                forward_duty: settings.forward_duty,
            })
        }

        fn enable(&mut self, duty: f64) -> Result<()> {
            self.ena
                .set_pwm_frequency(MOTOR_PWM_HZ, duty)
                .context("set left PWM")?;
            self.enb
                .set_pwm_frequency(MOTOR_PWM_HZ, duty)
                .context("set right PWM")?;
            Ok(())
        }
    }

    impl Drive for GpioDrive {
        fn rotate_by_angle(&mut self, angle_degrees: f64) -> Result<()> {
            let spin = self.calib.spin_time(angle_degrees);
            if spin.is_zero() {
                return Ok(());
            }
            if angle_degrees > 0.0 {
                // Clockwise: both sides forward-biased against each other.
                self.in1.set_high();
                self.in2.set_low();
                self.in3.set_high();
                self.in4.set_low();
            } else {
                self.in1.set_low();
                self.in2.set_high();
                self.in3.set_low();
                self.in4.set_high();
            }
            self.enable(self.rotate_duty)?;
            log::debug!("rotating {:.2} deg over {:?}", angle_degrees, spin);
            thread::sleep(spin);
            self.stop()
        }

        fn forward(&mut self, duration: Option<Duration>) -> Result<()> {
            self.in1.set_high();
            self.in2.set_low();
            self.in3.set_low();
            self.in4.set_high();
            self.enable(self.forward_duty)?;
            log::debug!("motors running forward");
            if let Some(duration) = duration {
                thread::sleep(duration);
                self.stop()?;
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.in1.set_low();
            self.in2.set_low();
            self.in3.set_low();
            self.in4.set_low();
            self.enable(0.0)?;
            log::debug!("motors stopped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_angle_is_a_zero_duration_no_op() {
        let calib = RotationCalib::default();
        assert_eq!(calib.spin_time(0.0), Duration::ZERO);
    }

    #[test]
    fn spin_time_matches_calibration() {
        let calib = RotationCalib::default();
        assert_eq!(calib.spin_time(30.0), Duration::from_secs_f64(0.75));
        assert_eq!(calib.spin_time(60.0), Duration::from_secs_f64(1.5));
        assert_eq!(calib.spin_time(2.0), Duration::from_secs_f64(0.05));
    }

    #[test]
    fn spin_time_ignores_direction_sign() {
        let calib = RotationCalib::default();
        assert_eq!(calib.spin_time(-45.0), calib.spin_time(45.0));
    }

    #[test]
    fn spin_time_is_monotonic_in_magnitude() {
        let calib = RotationCalib::default();
        let mut last = Duration::ZERO;
        for magnitude in [0.0, 0.5, 2.0, 10.0, 30.0, 90.0, 360.0] {
            let spin = calib.spin_time(magnitude);
            assert!(spin >= last);
            last = spin;
        }
    }

    #[test]
    fn stub_drive_records_commands() {
        let mut drive = StubDrive::new();
        drive.rotate_by_angle(2.0).unwrap();
        drive.forward(Some(Duration::from_millis(10))).unwrap();
        drive.stop().unwrap();

        assert_eq!(drive.rotations(), vec![2.0]);
        assert_eq!(drive.forward_count(), 1);
        assert_eq!(drive.commands.last(), Some(&DriveCommand::Stop));
    }
}

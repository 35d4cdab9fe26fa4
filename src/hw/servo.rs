//! Gripper servos.
//!
//! Two continuous-position servos execute the fixed delivery gesture once
//! the robot has stopped in range: swing both horns to one extreme, hold,
//! swing to the opposite extreme, hold, then return to mid travel. Servo
//! positions are a signed fraction of full travel (-1.0 to 1.0, 0.0 is the
//! neutral/mid rest position).

use std::time::Duration;

use anyhow::Result;

/// Calibrated gesture: per-servo throw plus the hold time at each extreme.
#[derive(Clone, Copy, Debug)]
pub struct GestureSettings {
    pub throw_left: f64,
    pub throw_right: f64,
    pub hold: Duration,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            throw_left: 0.24,
            throw_right: 0.16,
            hold: Duration::from_secs_f64(1.7),
        }
    }
}

/// Servo pair command surface.
pub trait ServoPair {
    /// Run the full two-phase gesture, ending at neutral. Blocking.
    fn gesture(&mut self) -> Result<()>;

    /// Return both horns to mid travel.
    fn neutral(&mut self) -> Result<()>;
}

/// Recording stub servo pair, never sleeps.
#[derive(Default)]
pub struct StubServoPair {
    pub gestures: u32,
    pub neutrals: u32,
}

impl StubServoPair {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServoPair for StubServoPair {
    fn gesture(&mut self) -> Result<()> {
        log::debug!("stub servos: gesture");
        self.gestures += 1;
        Ok(())
    }

    fn neutral(&mut self) -> Result<()> {
        log::debug!("stub servos: neutral");
        self.neutrals += 1;
        Ok(())
    }
}

#[cfg(feature = "hw-rpi")]
pub use gpio::GpioServoPair;

#[cfg(feature = "hw-rpi")]
mod gpio {
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use rppal::gpio::{Gpio, OutputPin};

    use super::{GestureSettings, ServoPair};
    use crate::config::ServoSettings;

    /// Standard hobby-servo pulse timing at 50 Hz.
    const SERVO_PERIOD: Duration = Duration::from_millis(20);
    const MID_PULSE_US: f64 = 1500.0;
    const HALF_TRAVEL_US: f64 = 500.0;

    /// Servo pair on Raspberry Pi GPIO software PWM.
    pub struct GpioServoPair {
        left: OutputPin,
        right: OutputPin,
        settings: GestureSettings,
    }

    impl GpioServoPair {
        pub fn new(settings: &ServoSettings) -> Result<Self> {
            let gpio = Gpio::new().context("open GPIO")?;
            let left = gpio
                .get(settings.left_pin)
                .with_context(|| format!("claim servo pin {}", settings.left_pin))?
                .into_output_low();
            let right = gpio
                .get(settings.right_pin)
                .with_context(|| format!("claim servo pin {}", settings.right_pin))?
                .into_output_low();
            Ok(Self {
                left,
                right,
                settings: settings.gesture(),
            })
        }

        fn set_positions(&mut self, left: f64, right: f64) -> Result<()> {
            set_position(&mut self.left, left).context("set left servo")?;
            set_position(&mut self.right, right).context("set right servo")?;
            Ok(())
        }
    }

    fn set_position(pin: &mut OutputPin, value: f64) -> Result<()> {
        let value = value.clamp(-1.0, 1.0);
        let pulse = Duration::from_micros((MID_PULSE_US + value * HALF_TRAVEL_US) as u64);
        pin.set_pwm(SERVO_PERIOD, pulse)?;
        Ok(())
    }

    impl ServoPair for GpioServoPair {
        fn gesture(&mut self) -> Result<()> {
            let GestureSettings {
                throw_left,
                throw_right,
                hold,
            } = self.settings;
            log::info!("running delivery gesture");
            self.set_positions(throw_left, -throw_right)?;
            thread::sleep(hold);
            self.set_positions(-throw_left, throw_right)?;
            thread::sleep(hold);
            self.neutral()
        }

        fn neutral(&mut self) -> Result<()> {
            self.set_positions(0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_counts_gestures_and_neutrals() {
        let mut servos = StubServoPair::new();
        servos.gesture().unwrap();
        servos.neutral().unwrap();
        servos.neutral().unwrap();
        assert_eq!(servos.gestures, 1);
        assert_eq!(servos.neutrals, 2);
    }
}

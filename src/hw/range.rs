//! Ultrasonic range finder.
//!
//! HC-SR04 style pulse-echo measurement: raise the trigger line briefly,
//! then time the echo line's high pulse. Distance is the round-trip time at
//! the speed of sound, halved. Every measurement is fresh; nothing is
//! cached between calls.
//!
//! The echo wait is bounded. A sensor that never answers (disconnected,
//! target out of range, electrical fault) surfaces as an `EchoTimeout`
//! error instead of hanging the control loop.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;

/// Speed of sound used for the round-trip conversion.
pub const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Convert an echo round-trip time to centimeters.
pub fn distance_from_echo(round_trip: Duration) -> f64 {
    round_trip.as_secs_f64() * SPEED_OF_SOUND_CM_S / 2.0
}

/// The echo line never answered within the bounded wait.
#[derive(Clone, Copy, Debug)]
pub struct EchoTimeout {
    pub waited: Duration,
}

impl std::fmt::Display for EchoTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no echo from range sensor within {:?}", self.waited)
    }
}

impl std::error::Error for EchoTimeout {}

/// Blocking distance measurement in centimeters.
pub trait RangeFinder {
    fn measure(&mut self) -> Result<f64>;
}

/// Scripted range finder for tests: plays back queued samples, then keeps
/// answering with the fallback distance.
pub struct StubRangeFinder {
    samples: VecDeque<f64>,
    fallback: f64,
}

impl StubRangeFinder {
    pub fn new(fallback: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            fallback,
        }
    }

    pub fn push_sample(&mut self, distance_cm: f64) -> &mut Self {
        self.samples.push_back(distance_cm);
        self
    }
}

impl RangeFinder for StubRangeFinder {
    fn measure(&mut self) -> Result<f64> {
        Ok(self.samples.pop_front().unwrap_or(self.fallback))
    }
}

#[cfg(feature = "hw-rpi")]
pub use gpio::HcSr04;

#[cfg(feature = "hw-rpi")]
mod gpio {
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use super::{distance_from_echo, EchoTimeout, RangeFinder};
    use crate::config::RangeSettings;

    const TRIGGER_PULSE: Duration = Duration::from_micros(10);

    /// HC-SR04 on Raspberry Pi GPIO.
    pub struct HcSr04 {
        trigger: OutputPin,
        echo: InputPin,
        timeout: Duration,
    }

    impl HcSr04 {
        pub fn new(settings: &RangeSettings) -> Result<Self> {
            let gpio = Gpio::new().context("open GPIO")?;
            let trigger = gpio
                .get(settings.trigger_pin)
                .with_context(|| format!("claim trigger pin {}", settings.trigger_pin))?
                .into_output_low();
            let echo = gpio
                .get(settings.echo_pin)
                .with_context(|| format!("claim echo pin {}", settings.echo_pin))?
                .into_input();
            Ok(Self {
                trigger,
                echo,
                timeout: settings.timeout(),
            })
        }
    }

    impl RangeFinder for HcSr04 {
        fn measure(&mut self) -> Result<f64> {
            self.trigger.set_high();
            thread::sleep(TRIGGER_PULSE);
            self.trigger.set_low();

            let deadline = Instant::now() + self.timeout;
            while self.echo.is_low() {
                if Instant::now() >= deadline {
                    return Err(EchoTimeout {
                        waited: self.timeout,
                    }
                    .into());
                }
            }
            let pulse_start = Instant::now();
            while self.echo.is_high() {
                if Instant::now() >= deadline {
                    return Err(EchoTimeout {
                        waited: self.timeout,
                    }
                    .into());
                }
            }

            let distance = distance_from_echo(pulse_start.elapsed());
            log::trace!("range sample {:.1} cm", distance);
            Ok(distance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_time_converts_to_centimeters() {
        // 1 ms round trip: 34300 * 0.001 / 2 = 17.15 cm
        let distance = distance_from_echo(Duration::from_millis(1));
        assert!((distance - 17.15).abs() < 1e-9);
    }

    #[test]
    fn echo_timeout_is_a_typed_error() {
        let err = anyhow::Error::from(EchoTimeout {
            waited: Duration::from_millis(50),
        });
        assert!(err.downcast_ref::<EchoTimeout>().is_some());
        assert!(err.to_string().contains("no echo"));
    }

    #[test]
    fn stub_plays_samples_then_fallback() {
        let mut range = StubRangeFinder::new(100.0);
        range.push_sample(50.0);
        range.push_sample(20.0);

        assert_eq!(range.measure().unwrap(), 50.0);
        assert_eq!(range.measure().unwrap(), 20.0);
        assert_eq!(range.measure().unwrap(), 100.0);
    }
}

//! Hardware access.
//!
//! Every device the controller touches is reached through a trait defined
//! next to its implementations: drive motors, gripper servos, ultrasonic
//! range finder, status display. Real GPIO implementations live behind the
//! `hw-rpi` feature; recording/logging stubs are always available so the
//! control stack runs anywhere.
//!
//! All handles are owned by the single control thread for the process
//! lifetime; there is no concurrent access and no locking.

pub mod display;
pub mod motors;
pub mod range;
pub mod servo;

use anyhow::Result;

pub use display::{LogDisplay, StatusDisplay, StubDisplay};
pub use motors::{Drive, DriveCommand, RotationCalib, StubDrive};
pub use range::{distance_from_echo, EchoTimeout, RangeFinder, StubRangeFinder, SPEED_OF_SOUND_CM_S};
pub use servo::{GestureSettings, ServoPair, StubServoPair};

#[cfg(feature = "hw-rpi")]
pub use display::Pcf8574Lcd;
#[cfg(feature = "hw-rpi")]
pub use motors::GpioDrive;
#[cfg(feature = "hw-rpi")]
pub use range::HcSr04;
#[cfg(feature = "hw-rpi")]
pub use servo::GpioServoPair;

use crate::config::BotConfig;

/// The actuator and sensor set the daemon hands to the controller.
pub struct Rig {
    pub drive: Box<dyn Drive>,
    pub servos: Box<dyn ServoPair>,
    pub range: Box<dyn RangeFinder>,
}

/// Build the rig from configuration.
///
/// With `hw-rpi` this claims the configured GPIO pins; without it the rig
/// is made of recording stubs so bench runs exercise the full decision
/// loop with no hardware attached.
pub fn rig_from_config(config: &BotConfig) -> Result<Rig> {
    #[cfg(feature = "hw-rpi")]
    {
        Ok(Rig {
            drive: Box::new(GpioDrive::new(&config.motors)?),
            servos: Box::new(GpioServoPair::new(&config.servo)?),
            range: Box::new(HcSr04::new(&config.range)?),
        })
    }
    #[cfg(not(feature = "hw-rpi"))]
    {
        log::warn!("hw-rpi feature disabled, actuators and range finder are stubs");
        // First approach misses, the next lands mid-band, so a scripted
        // bench run terminates instead of circling.
        let mut range = StubRangeFinder::new((config.control.band_min_cm + config.control.band_max_cm) / 2.0);
        range.push_sample(200.0);
        Ok(Rig {
            drive: Box::new(StubDrive::new()),
            servos: Box::new(StubServoPair::new()),
            range: Box::new(range),
        })
    }
}

/// Build the status display from configuration.
pub fn display_from_config(config: &BotConfig) -> Result<Box<dyn StatusDisplay>> {
    #[cfg(feature = "hw-rpi")]
    {
        Ok(Box::new(Pcf8574Lcd::new(&config.display)?))
    }
    #[cfg(not(feature = "hw-rpi"))]
    {
        let _ = config;
        Ok(Box::new(LogDisplay::new()))
    }
}

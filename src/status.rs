//! Status reporting.
//!
//! Mirrors every controller transition to the two-line display and the log
//! channel. Strictly a side channel: the reporter never feeds anything back
//! into control decisions. There is no silent path - each outcome lands in
//! both sinks.

use anyhow::Result;

use crate::control::DistanceBand;
use crate::hw::StatusDisplay;

pub struct StatusReporter<'a> {
    display: &'a mut dyn StatusDisplay,
}

impl<'a> StatusReporter<'a> {
    pub fn new(display: &'a mut dyn StatusDisplay) -> Self {
        Self { display }
    }

    /// No target in the sampled frame; the robot keeps sweeping.
    pub fn not_found(&mut self) -> Result<()> {
        log::info!("bottle not found, rotating to search");
        self.display.clear()?;
        self.display.write_line(0, "BottleFound: False")
    }

    /// Target acquired at the given vertical angle.
    pub fn found(&mut self, angle_degrees: f64) -> Result<()> {
        log::info!("bottle found, angle {:.2} deg", angle_degrees);
        self.display.clear()?;
        self.display.write_line(0, "BottleFound: True")?;
        self.display
            .write_line(1, &format!("Angle: {:.2} deg", angle_degrees))
    }

    /// Open-loop advance toward the target has started.
    pub fn moving_forward(&mut self) -> Result<()> {
        log::info!("moving forward towards the bottle");
        self.display.clear()?;
        self.display.write_line(0, "Moving forward")
    }

    /// Stopped inside the target distance band.
    pub fn within_range(&mut self, distance_cm: f64, band: DistanceBand) -> Result<()> {
        log::info!(
            "within {:.0}-{:.0} cm (measured {:.1} cm), stopping",
            band.min_cm,
            band.max_cm,
            distance_cm
        );
        self.display.clear()?;
        self.display.write_line(
            0,
            &format!("Within {:.0}-{:.0}cm", band.min_cm, band.max_cm),
        )
    }

    /// Terminal message for the cleanup path.
    pub fn cleanup_done(&mut self) -> Result<()> {
        log::info!("cleanup completed");
        self.display.clear()?;
        self.display.write_line(0, "Cleanup done")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::StubDisplay;

    #[test]
    fn found_reports_state_and_angle() {
        let mut display = StubDisplay::new();
        {
            let mut reporter = StatusReporter::new(&mut display);
            reporter.found(12.34).unwrap();
        }
        assert!(display.saw("BottleFound: True"));
        assert_eq!(display.last_line(), Some("Angle: 12.34 deg"));
        assert_eq!(display.clears, 1);
    }

    #[test]
    fn every_message_clears_before_writing() {
        let mut display = StubDisplay::new();
        {
            let mut reporter = StatusReporter::new(&mut display);
            reporter.not_found().unwrap();
            reporter.moving_forward().unwrap();
            reporter.within_range(20.0, DistanceBand::default()).unwrap();
            reporter.cleanup_done().unwrap();
        }
        assert_eq!(display.clears, 4);
        assert!(display.saw("BottleFound: False"));
        assert!(display.saw("Moving forward"));
        assert!(display.saw("Within 15-35cm"));
        assert_eq!(display.last_line(), Some("Cleanup done"));
    }
}

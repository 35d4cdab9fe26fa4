//! Status display.
//!
//! A two-line character surface with clear/write, used as a side channel
//! only: nothing the controller decides ever depends on what the display
//! shows. The robot carries an HD44780 LCD behind a PCF8574 I2C expander;
//! off-robot builds fall back to a display that only mirrors to the log.

use anyhow::Result;

/// Two-line text surface.
pub trait StatusDisplay {
    fn clear(&mut self) -> Result<()>;

    /// Write a line at the given row (0-based). Text beyond the surface
    /// width is truncated by the implementation.
    fn write_line(&mut self, row: usize, text: &str) -> Result<()>;
}

/// Display that mirrors everything to the log and nothing else.
#[derive(Default)]
pub struct LogDisplay;

impl LogDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl StatusDisplay for LogDisplay {
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
        log::info!("display[{}]: {}", row, text);
        Ok(())
    }
}

/// Recording stub display for tests.
#[derive(Default)]
pub struct StubDisplay {
    pub clears: u32,
    pub lines: Vec<(usize, String)>,
}

impl StubDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when any written line contains the fragment.
    pub fn saw(&self, fragment: &str) -> bool {
        self.lines.iter().any(|(_, text)| text.contains(fragment))
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(|(_, text)| text.as_str())
    }
}

impl StatusDisplay for StubDisplay {
    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
        self.lines.push((row, text.to_string()));
        Ok(())
    }
}

#[cfg(feature = "hw-rpi")]
pub use lcd::Pcf8574Lcd;

#[cfg(feature = "hw-rpi")]
mod lcd {
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use rppal::i2c::I2c;

    use super::StatusDisplay;
    use crate::config::DisplaySettings;

    // PCF8574 bit wiring: P0=RS, P2=EN, P3=backlight, P4-P7=data nibble.
    const RS_DATA: u8 = 0x01;
    const ENABLE: u8 = 0x04;
    const BACKLIGHT: u8 = 0x08;

    const CMD_CLEAR: u8 = 0x01;
    const CMD_ENTRY_MODE: u8 = 0x06;
    const CMD_DISPLAY_ON: u8 = 0x0C;
    const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
    const CMD_SET_DDRAM: u8 = 0x80;
    const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

    /// HD44780 character LCD behind a PCF8574 I2C expander.
    pub struct Pcf8574Lcd {
        i2c: I2c,
        cols: usize,
        rows: usize,
    }

    impl Pcf8574Lcd {
        pub fn new(settings: &DisplaySettings) -> Result<Self> {
            let mut i2c = I2c::new().context("open I2C bus")?;
            i2c.set_slave_address(settings.i2c_addr as u16)
                .with_context(|| format!("select LCD at 0x{:02x}", settings.i2c_addr))?;
            let mut lcd = Self {
                i2c,
                cols: settings.cols,
                rows: settings.rows,
            };
            lcd.init()?;
            Ok(lcd)
        }

        fn init(&mut self) -> Result<()> {
            thread::sleep(Duration::from_millis(50));
            // Reset sequence into 4-bit mode.
            for nibble in [0x30u8, 0x30, 0x30, 0x20] {
                self.strobe(nibble | BACKLIGHT)?;
                thread::sleep(Duration::from_millis(5));
            }
            self.command(CMD_FUNCTION_4BIT_2LINE)?;
            self.command(CMD_DISPLAY_ON)?;
            self.command(CMD_ENTRY_MODE)?;
            self.command(CMD_CLEAR)?;
            thread::sleep(Duration::from_millis(2));
            Ok(())
        }

        fn strobe(&mut self, value: u8) -> Result<()> {
            self.i2c.write(&[value | ENABLE])?;
            thread::sleep(Duration::from_micros(500));
            self.i2c.write(&[value & !ENABLE])?;
            thread::sleep(Duration::from_micros(100));
            Ok(())
        }

        fn send(&mut self, value: u8, flags: u8) -> Result<()> {
            for nibble in [value & 0xF0, (value << 4) & 0xF0] {
                self.strobe(nibble | flags | BACKLIGHT)?;
            }
            Ok(())
        }

        fn command(&mut self, value: u8) -> Result<()> {
            self.send(value, 0)
        }

        fn data(&mut self, value: u8) -> Result<()> {
            self.send(value, RS_DATA)
        }
    }

    impl StatusDisplay for Pcf8574Lcd {
        fn clear(&mut self) -> Result<()> {
            self.command(CMD_CLEAR)?;
            thread::sleep(Duration::from_millis(2));
            Ok(())
        }

        fn write_line(&mut self, row: usize, text: &str) -> Result<()> {
            if row >= self.rows {
                return Ok(());
            }
            self.command(CMD_SET_DDRAM | ROW_OFFSETS[row.min(1)])?;
            for byte in text.bytes().take(self.cols) {
                self.data(byte)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_display_records_writes() {
        let mut display = StubDisplay::new();
        display.clear().unwrap();
        display.write_line(0, "BottleFound: True").unwrap();
        display.write_line(1, "Angle: 1.20 deg").unwrap();

        assert_eq!(display.clears, 1);
        assert!(display.saw("BottleFound"));
        assert_eq!(display.last_line(), Some("Angle: 1.20 deg"));
    }
}

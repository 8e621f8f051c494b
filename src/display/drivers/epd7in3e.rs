/*
 *  display/drivers/epd7in3e.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Waveshare 7.3" (E) six colour e-paper over spidev and gpio-cdev
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::thread::sleep;
use std::time::{Duration, Instant};

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevDevice};
use log::{debug, info, warn};

use crate::config::DisplaySettings;
use crate::constants::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::display::error::DisplayError;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplayDriver};

const SPI_SPEED_HZ: u32 = 4_000_000;
// spidev default buffer is 4096 bytes
const SPI_CHUNK: usize = 4096;
const CONSUMER: &str = "lyticker";
const WHITE_PAIR: u8 = 0x11;

// controller commands
const CMD_PANEL_SETTING: u8 = 0x00;
const CMD_POWER_SETTING: u8 = 0x01;
const CMD_POWER_OFF: u8 = 0x02;
const CMD_POWER_OFF_SEQ: u8 = 0x03;
const CMD_POWER_ON: u8 = 0x04;
const CMD_BOOSTER_A: u8 = 0x05;
const CMD_BOOSTER_B: u8 = 0x06;
const CMD_DEEP_SLEEP: u8 = 0x07;
const CMD_BOOSTER_C: u8 = 0x08;
const CMD_DATA_START: u8 = 0x10;
const CMD_DISPLAY_REFRESH: u8 = 0x12;
const CMD_PLL: u8 = 0x30;
const CMD_VCOM_DATA: u8 = 0x50;
const CMD_TCON: u8 = 0x60;
const CMD_RESOLUTION: u8 = 0x61;
const CMD_T_VDCS: u8 = 0x84;
const CMD_PWS: u8 = 0xE3;
const CMD_CMDH: u8 = 0xAA;

/// Panel setup, command then data bytes
const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (CMD_CMDH, &[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]),
    (CMD_POWER_SETTING, &[0x3F]),
    (CMD_PANEL_SETTING, &[0x5F, 0x69]),
    (CMD_POWER_OFF_SEQ, &[0x00, 0x54, 0x00, 0x44]),
    (CMD_BOOSTER_A, &[0x40, 0x1F, 0x1F, 0x2C]),
    (CMD_BOOSTER_B, &[0x6F, 0x1F, 0x17, 0x49]),
    (CMD_BOOSTER_C, &[0x6F, 0x1F, 0x1F, 0x22]),
    (CMD_PLL, &[0x03]),
    (CMD_VCOM_DATA, &[0x3F]),
    (CMD_TCON, &[0x02, 0x00]),
    (CMD_RESOLUTION, &[0x03, 0x20, 0x01, 0xE0]),
    (CMD_T_VDCS, &[0x01]),
    (CMD_PWS, &[0x2F]),
];

fn gpio_err(e: impl std::fmt::Debug) -> DisplayError {
    DisplayError::GpioError(format!("{e:?}"))
}

fn spi_err(e: impl std::fmt::Debug) -> DisplayError {
    DisplayError::SpiError(format!("{e:?}"))
}

/// Waveshare 7.3" (E) driver
///
/// Drives the controller directly: chip select is handled by spidev,
/// DC/RST/PWR are outputs and BUSY is an input that reads low while the
/// controller is working.
pub struct Epd7in3eDriver {
    spi: SpidevDevice,
    dc: CdevPin,
    rst: CdevPin,
    busy: CdevPin,
    pwr: Option<CdevPin>,
    busy_timeout: Duration,
    capabilities: DisplayCapabilities,
}

impl Epd7in3eDriver {
    pub fn new_spi(settings: &DisplaySettings) -> Result<Self, DisplayError> {
        info!(
            "Opening 7.3\" e-paper on {} (DC {}, RST {}, BUSY {}, PWR {})",
            settings.spi_bus, settings.dc_pin, settings.rst_pin, settings.busy_pin, settings.pwr_pin
        );

        let mut spi = SpidevDevice::open(&settings.spi_bus)
            .map_err(|e| DisplayError::InitializationFailed(format!("{}: {e:?}", settings.spi_bus)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).map_err(spi_err)?;

        let mut chip = Chip::new(&settings.gpio_chip)
            .map_err(|e| DisplayError::InitializationFailed(format!("{}: {e:?}", settings.gpio_chip)))?;
        let mut output = |pin: u32, initial: u8| -> Result<CdevPin, DisplayError> {
            let handle = chip
                .get_line(pin)
                .and_then(|line| line.request(LineRequestFlags::OUTPUT, initial, CONSUMER))
                .map_err(gpio_err)?;
            CdevPin::new(handle).map_err(gpio_err)
        };
        let dc = output(settings.dc_pin, 0)?;
        let rst = output(settings.rst_pin, 1)?;
        let pwr = Some(output(settings.pwr_pin, 1)?);
        let busy_handle = chip
            .get_line(settings.busy_pin)
            .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
            .map_err(gpio_err)?;
        let busy = CdevPin::new(busy_handle).map_err(gpio_err)?;

        Ok(Self {
            spi,
            dc,
            rst,
            busy,
            pwr,
            busy_timeout: settings.busy_timeout,
            capabilities: DisplayCapabilities {
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT,
                color_depth: ColorDepth::Palette6,
                refresh_secs: 20,
            },
        })
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(gpio_err)?;
        sleep(Duration::from_millis(20));
        self.rst.set_low().map_err(gpio_err)?;
        sleep(Duration::from_millis(2));
        self.rst.set_high().map_err(gpio_err)?;
        sleep(Duration::from_millis(20));
        Ok(())
    }

    fn command(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(gpio_err)?;
        self.spi.write(&[cmd]).map_err(spi_err)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(gpio_err)?;
        for chunk in bytes.chunks(SPI_CHUNK) {
            self.spi.write(chunk).map_err(spi_err)?;
        }
        Ok(())
    }

    fn send(&mut self, cmd: u8, bytes: &[u8]) -> Result<(), DisplayError> {
        self.command(cmd)?;
        if !bytes.is_empty() {
            self.data(bytes)?;
        }
        Ok(())
    }

    fn wait_idle(&mut self, stage: &'static str) -> Result<(), DisplayError> {
        let started = Instant::now();
        while self.busy.is_low().map_err(gpio_err)? {
            if started.elapsed() > self.busy_timeout {
                return Err(DisplayError::Timeout(stage));
            }
            sleep(Duration::from_millis(5));
        }
        debug!("panel idle after {} in {:?}", stage, started.elapsed());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        self.send(CMD_POWER_ON, &[])?;
        self.wait_idle("power on")?;
        self.send(CMD_DISPLAY_REFRESH, &[0x00])?;
        self.wait_idle("refresh")?;
        self.send(CMD_POWER_OFF, &[0x00])?;
        self.wait_idle("power off")
    }
}

impl DisplayDriver for Epd7in3eDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.wait_idle("reset")?;
        sleep(Duration::from_millis(30));
        for (cmd, bytes) in INIT_SEQUENCE {
            self.send(*cmd, bytes)?;
        }
        self.send(CMD_POWER_ON, &[])?;
        self.wait_idle("init")?;
        info!("7.3\" e-paper initialized");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = vec![WHITE_PAIR; self.capabilities.buffer_len()];
        self.write_buffer(&blank)
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.capabilities.buffer_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: buffer.len() });
        }
        self.send(CMD_DATA_START, buffer)?;
        self.refresh()
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.send(CMD_DEEP_SLEEP, &[0xA5])?;
        info!("7.3\" e-paper asleep");
        Ok(())
    }

    fn release_resources(&mut self) -> Result<(), DisplayError> {
        // lines are returned to the kernel when the handles drop
        let mut result = Ok(());
        if let Err(e) = self.dc.set_low().and_then(|_| self.rst.set_low()) {
            warn!("could not park control lines: {e:?}");
            result = Err(gpio_err(e));
        }
        if let Some(mut pwr) = self.pwr.take() {
            pwr.set_low().map_err(gpio_err)?;
        }
        result
    }
}

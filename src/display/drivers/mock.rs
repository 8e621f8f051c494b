/*
 *  display/drivers/mock.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock panel driver, runs the dashboard without hardware
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

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::config::DisplaySettings;
use crate::constants::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::display::error::DisplayError;
use crate::display::frame::DisplayFrame;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplayDriver};

const KEEP_FRAMES: usize = 4;
const KEEP_OPS: usize = 256;

/// One driver call, in the order received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Init,
    Clear,
    Push { symbol: String, degraded: bool },
    Sleep,
    Release,
}

/// Mock display driver
///
/// Records recent operations and keeps the last few pushed frames so tests
/// and desktop runs can inspect what the panel would have shown. With a
/// `dump_path` each pushed frame is also written out as `<symbol>.bmp`.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    dump_path: Option<PathBuf>,
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Most recent calls, failed ones included, oldest first
    pub ops: VecDeque<DisplayOp>,

    /// Most recent pushed frames, oldest first
    pub frames: VecDeque<DisplayFrame>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Whether sleep() has been called since the last init()
    pub is_asleep: bool,

    /// Total bytes written via write_buffer
    pub bytes_written: usize,

    /// Simulate failures (for error testing)
    pub simulate_init_failure: bool,
    pub simulate_clear_failure: bool,
    pub simulate_push_failure: bool,
    pub simulate_sleep_failure: bool,
    pub simulate_release_failure: bool,
}

impl MockDriverState {
    fn record(&mut self, op: DisplayOp) {
        if self.ops.len() == KEEP_OPS {
            self.ops.pop_front();
        }
        self.ops.push_back(op);
    }
}

impl MockDriver {
    pub fn new(settings: &DisplaySettings) -> Result<Self, DisplayError> {
        let mut driver = Self::new_with_size(CANVAS_WIDTH, CANVAS_HEIGHT);
        driver.dump_path = settings.dump_path.clone();
        if let Some(dir) = driver.dump_path.as_ref() {
            std::fs::create_dir_all(dir).map_err(|e| {
                DisplayError::InvalidConfiguration(format!("dump_path {}: {}", dir.display(), e))
            })?;
            info!("Mock panel dumping frames to {}", dir.display());
        }
        Ok(driver)
    }

    /// Create a mock driver with specific dimensions
    pub fn new_with_size(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: ColorDepth::Rgb888,
                refresh_secs: 0,
            },
            dump_path: None,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Snapshot of the operation log
    pub fn ops(&self) -> Vec<DisplayOp> {
        self.lock().ops.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        // a panicking test thread must not hide the log from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dump(&self, frame: &DisplayFrame) {
        let Some(dir) = self.dump_path.as_ref() else { return };
        let path = dir.join(format!("{}.bmp", frame.symbol()));
        match std::fs::write(&path, frame.to_bmp()) {
            Ok(()) => debug!("Mock panel frame written to {}", path.display()),
            Err(e) => warn!("Mock panel could not write {}: {}", path.display(), e),
        }
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.record(DisplayOp::Init);
        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }
        state.is_initialized = true;
        state.is_asleep = false;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.record(DisplayOp::Clear);
        if state.simulate_clear_failure {
            return Err(DisplayError::Other("Simulated clear failure".to_string()));
        }
        state.frames.clear();
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.capabilities.buffer_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: buffer.len() });
        }
        let mut state = self.lock();
        if state.simulate_push_failure {
            return Err(DisplayError::Other("Simulated push failure".to_string()));
        }
        state.bytes_written += buffer.len();
        Ok(())
    }

    fn push(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        self.lock().record(DisplayOp::Push {
            symbol: frame.symbol().to_string(),
            degraded: frame.is_degraded(),
        });
        self.write_buffer(&frame.to_panel_buffer())?;
        {
            let mut state = self.lock();
            if state.frames.len() == KEEP_FRAMES {
                state.frames.pop_front();
            }
            state.frames.push_back(frame.clone());
        }
        self.dump(frame);
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.record(DisplayOp::Sleep);
        if state.simulate_sleep_failure {
            return Err(DisplayError::Other("Simulated sleep failure".to_string()));
        }
        state.is_asleep = true;
        Ok(())
    }

    fn release_resources(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.record(DisplayOp::Release);
        if state.simulate_release_failure {
            return Err(DisplayError::GpioError("Simulated release failure".to_string()));
        }
        state.is_initialized = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vframebuf::VarFrameBuf;
    use chrono::Local;
    use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

    fn frame(w: u32, h: u32, symbol: &str) -> DisplayFrame {
        DisplayFrame::new(VarFrameBuf::new(w, h, Rgb888::WHITE), symbol, Local::now(), false)
    }

    #[test]
    fn test_mock_driver_creation() {
        let driver = MockDriver::new(&DisplaySettings::default()).unwrap();
        assert_eq!(driver.dimensions(), (800, 480));
        assert!(driver.ops().is_empty());
    }

    #[test]
    fn test_mock_driver_lifecycle_is_logged() {
        let mut driver = MockDriver::new_with_size(16, 8);
        driver.init().unwrap();
        driver.clear().unwrap();
        driver.push(&frame(16, 8, "AAPL")).unwrap();
        driver.sleep().unwrap();
        driver.release_resources().unwrap();

        assert_eq!(
            driver.ops(),
            vec![
                DisplayOp::Init,
                DisplayOp::Clear,
                DisplayOp::Push { symbol: "AAPL".into(), degraded: false },
                DisplayOp::Sleep,
                DisplayOp::Release,
            ]
        );
        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.bytes_written, 8 * 8);
        assert!(state.is_asleep);
        assert!(!state.is_initialized);
    }

    #[test]
    fn test_mock_driver_simulated_failure() {
        let mut driver = MockDriver::new_with_size(16, 8);
        driver.state().lock().unwrap().simulate_push_failure = true;
        assert!(driver.push(&frame(16, 8, "MSFT")).is_err());
        assert!(driver.state().lock().unwrap().frames.is_empty());

        driver.state().lock().unwrap().simulate_push_failure = false;
        assert!(driver.push(&frame(16, 8, "MSFT")).is_ok());
        assert_eq!(driver.state().lock().unwrap().frames.len(), 1);
    }

    #[test]
    fn test_mock_driver_buffer_size_mismatch() {
        let mut driver = MockDriver::new_with_size(16, 8);
        assert!(matches!(
            driver.push(&frame(8, 8, "X")),
            Err(DisplayError::BufferSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_mock_driver_keeps_recent_frames() {
        let mut driver = MockDriver::new_with_size(4, 2);
        for s in ["A", "B", "C", "D", "E"] {
            driver.push(&frame(4, 2, s)).unwrap();
        }
        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.frames.len(), KEEP_FRAMES);
        assert_eq!(state.frames.front().map(|f| f.symbol().to_string()), Some("B".into()));
    }

    #[test]
    fn test_mock_driver_op_log_is_bounded() {
        let mut driver = MockDriver::new_with_size(4, 2);
        driver.init().unwrap();
        for i in 0..(KEEP_OPS + 50) {
            driver.push(&frame(4, 2, &format!("S{}", i))).unwrap();
        }
        let ops = driver.ops();
        assert_eq!(ops.len(), KEEP_OPS);
        assert_eq!(
            ops.last(),
            Some(&DisplayOp::Push { symbol: format!("S{}", KEEP_OPS + 49), degraded: false })
        );
        assert!(!ops.contains(&DisplayOp::Init));
    }

    #[test]
    fn test_dump_path_writes_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DisplaySettings { dump_path: Some(dir.path().to_path_buf()), ..Default::default() };
        let mut driver = MockDriver::new(&settings).unwrap();
        driver.push(&frame(800, 480, "TSLA")).unwrap();
        assert!(dir.path().join("TSLA.bmp").exists());
    }
}

/*
 *  display/error.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display subsystem
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

use std::fmt;
use std::error::Error;
use std::path::PathBuf;

/// Unified error type for all panel operations
#[derive(Debug)]
pub enum DisplayError {
    /// Hardware initialization failed
    InitializationFailed(String),

    /// SPI communication error
    SpiError(String),

    /// GPIO pin error
    GpioError(String),

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Frame buffer does not match the panel geometry
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Panel stayed busy past the allowed wait
    Timeout(&'static str),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::SpiError(msg) =>
                write!(f, "SPI communication error: {}", msg),
            DisplayError::GpioError(msg) =>
                write!(f, "GPIO error: {}", msg),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {} bytes, got {}", expected, actual),
            DisplayError::Timeout(stage) =>
                write!(f, "Panel busy timeout during {}", stage),
            DisplayError::Other(msg) =>
                write!(f, "{}", msg),
        }
    }
}

impl Error for DisplayError {}

/// Failure to turn a record and its artifacts into a frame
#[derive(Debug)]
pub enum ComposeError {
    /// The referenced chart bitmap is not on disk
    MissingArtifact(PathBuf),

    /// The chart bitmap exists but cannot be decoded
    InvalidArtifact { path: PathBuf, reason: String },

    /// Drawing onto the canvas failed
    Draw(String),
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::MissingArtifact(path) =>
                write!(f, "Chart artifact missing: {}", path.display()),
            ComposeError::InvalidArtifact { path, reason } =>
                write!(f, "Chart artifact {} unreadable: {}", path.display(), reason),
            ComposeError::Draw(msg) =>
                write!(f, "Drawing error: {}", msg),
        }
    }
}

impl Error for ComposeError {}

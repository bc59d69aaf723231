//! Audio stream formats and error types
//!
//! This module defines the sample encodings an equalizer can be bound to and
//! the errors reported by the processing front door.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur in the equalizer subsystem
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// An operation was requested before a successful `initialize`
    #[error("Equalizer is not initialized")]
    NotInitialized,

    /// The requested sample format has no numeric representation
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(SampleFormat),

    /// Buffers handed to `process` do not match the initialized format
    #[error("Sample format mismatch: equalizer runs {expected}, buffer is {found}")]
    FormatMismatch {
        expected: SampleFormat,
        found: SampleFormat,
    },

    /// A buffer holds fewer samples than `frames * channels`
    #[error("Buffer too short: need {needed} samples, got {actual}")]
    BufferTooShort { needed: usize, actual: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Sample encodings accepted by the equalizer
///
/// The `*On*` variants store a narrow value inside a wider container, which
/// leaves headroom for intermediate filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleFormat {
    Double,
    #[default]
    Float,
    Int8,
    Int8On16,
    Int16,
    Int16On32,
    Int24On32,
    Int32,
    Int32On64,
    Int64,
    Unknown,
}

impl SampleFormat {
    /// Every format with a processing representation
    pub const ALL: [SampleFormat; 10] = [
        SampleFormat::Double,
        SampleFormat::Float,
        SampleFormat::Int8,
        SampleFormat::Int8On16,
        SampleFormat::Int16,
        SampleFormat::Int16On32,
        SampleFormat::Int24On32,
        SampleFormat::Int32,
        SampleFormat::Int32On64,
        SampleFormat::Int64,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::Double => "double",
            SampleFormat::Float => "float",
            SampleFormat::Int8 => "int8",
            SampleFormat::Int8On16 => "int8-on-int16",
            SampleFormat::Int16 => "int16",
            SampleFormat::Int16On32 => "int16-on-int32",
            SampleFormat::Int24On32 => "int24-on-int32",
            SampleFormat::Int32 => "int32",
            SampleFormat::Int32On64 => "int32-on-int64",
            SampleFormat::Int64 => "int64",
            SampleFormat::Unknown => "unknown",
        }
    }

    /// Lenient lookup: anything unrecognized maps to `Unknown`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name() == name)
            .unwrap_or(SampleFormat::Unknown)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self> {
        match Self::from_name(s) {
            SampleFormat::Unknown if s != "unknown" => Err(AudioError::InvalidConfiguration(
                format!("unknown sample format '{s}'"),
            )),
            format => Ok(format),
        }
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = AudioError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SampleFormat> for String {
    fn from(format: SampleFormat) -> Self {
        format.name().to_string()
    }
}

//! Registry configuration
//!
//! The only knob is the per-device buffer capacity. It can be built
//! directly, parsed from JSON, or taken from the `ENCDEV_BUFF_LEN`
//! environment variable.

use std::fmt;

use serde::Deserialize;

/// Default per-device buffer length in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 128;

/// Environment variable holding the buffer capacity
pub const BUFF_LEN_ENV: &str = "ENCDEV_BUFF_LEN";

/// Errors that can occur while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration source could not be read
    Read(String),
    /// The configuration could not be parsed
    Parse(String),
    /// A value is outside the accepted range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(msg) => write!(f, "Failed to read config: {msg}"),
            Self::Parse(msg) => write!(f, "Failed to parse config: {msg}"),
            Self::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

/// Startup parameters of a device registry
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    #[serde(default = "default_buffer_capacity", alias = "buffLen")]
    pub buffer_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl DeviceConfig {
    /// Create a configuration with the given capacity
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the capacity is zero.
    pub fn with_capacity(buffer_capacity: usize) -> Result<Self, ConfigError> {
        let config = Self { buffer_capacity };
        config.validate()?;
        Ok(config)
    }

    /// Read JSON configuration from a reader.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are I/O errors reading from the provided reader
    /// - The JSON input is invalid or malformed
    /// - The capacity is zero
    pub fn from_reader(mut reader: impl embedded_io::Read) -> Result<Self, ConfigError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            match embedded_io::Read::read(&mut reader, &mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(chunk.get(..n).unwrap_or_default()),
                Err(e) => return Err(ConfigError::Read(format!("{e:?}"))),
            }
        }

        let config: Self =
            serde_json::from_slice(&buffer).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Take the capacity from `ENCDEV_BUFF_LEN`, or use the default when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(BUFF_LEN_ENV) {
            Ok(value) => Self::parse_capacity(&value),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Read(format!("{BUFF_LEN_ENV}: {e}"))),
        }
    }

    /// Parse a textual capacity value
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a positive integer.
    pub fn parse_capacity(value: &str) -> Result<Self, ConfigError> {
        let buffer_capacity = value
            .trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::Parse(format!("buffer capacity {value:?}: {e}")))?;
        Self::with_capacity(buffer_capacity)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

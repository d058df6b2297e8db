//! Error types returned by device operations
//!
//! Every failure is returned to the immediate caller. Logging is a side
//! channel only and never replaces the returned error.

use std::fmt;

use crate::idgen::{Handle, Minor};

pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;
pub const EBADF: i32 = 9;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;
pub const EPIPE: i32 = 32;

/// Errors that can occur in device operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Memory for a registry entry, store or session could not be obtained
    Allocation(String),
    /// A byte could not be moved across the session boundary
    Transfer {
        /// Position within the caller's area where the copy failed
        index: usize,
    },
    /// Control parameter outside the accepted domain
    InvalidArgument(String),
    /// Byte-stream write on a full device
    ///
    /// Only reported through the `embedded_io::Write` adapter; the plain
    /// write operation returns a count of 0 instead.
    NoSpace(Minor),
    /// No open session is registered under this handle
    BadDescriptor(Handle),
    /// The host stopped serving requests
    HostClosed,
}

impl DeviceError {
    pub(crate) fn store_allocation(minor: Minor, capacity: usize) -> Self {
        Self::Allocation(format!(
            "cannot allocate {capacity} bytes for device {minor}"
        ))
    }

    /// Positive errno value a character device would report for this error
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::Allocation(_) => ENOMEM,
            Self::Transfer { .. } => EFAULT,
            Self::InvalidArgument(_) => EINVAL,
            Self::NoSpace(_) => ENOSPC,
            Self::BadDescriptor(_) => EBADF,
            Self::HostClosed => EPIPE,
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation(msg) => write!(f, "Allocation error: {msg}"),
            Self::Transfer { index } => write!(f, "Transfer error at byte {index}"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::NoSpace(minor) => write!(f, "No space left on device {minor}"),
            Self::BadDescriptor(handle) => write!(f, "Bad descriptor: {handle}"),
            Self::HostClosed => write!(f, "Device host is closed"),
        }
    }
}

impl std::error::Error for DeviceError {}

impl embedded_io::Error for DeviceError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            // ENOMEM and ENOSPC both map to OutOfMemory
            Self::Allocation(_) | Self::NoSpace(_) => embedded_io::ErrorKind::OutOfMemory,
            Self::Transfer { .. } => embedded_io::ErrorKind::Other,
            Self::InvalidArgument(_) | Self::BadDescriptor(_) => {
                embedded_io::ErrorKind::InvalidInput
            }
            Self::HostClosed => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

//! Control commands (ioctl) on an open session
//!
//! | Code | Command      | Parameter      | Result            |
//! |------|--------------|----------------|-------------------|
//! | 10   | GET_IDENTITY | ignored        | registry major    |
//! | 20   | SET_KEY      | low byte used  | 0                 |
//! | 30   | SET_CIPHER   | 0 or 1         | 0, or EINVAL      |
//! | 40   | REWIND       | ignored        | 0                 |
//!
//! Any other code is accepted and ignored, returning 0.

use tracing::{info, trace};

use crate::error::DeviceError;
use crate::session::Session;

pub const IOCTL_OP_GETMAJOR: u32 = 10;
pub const IOCTL_OP_SETKEY: u32 = 20;
pub const IOCTL_OP_ENCRYPT: u32 = 30;
pub const IOCTL_OP_REWIND: u32 = 40;

/// A decoded control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Return the registry identifier
    GetIdentity,
    /// Set the session's cipher key
    SetKey(u8),
    /// Enable (1) or disable (0) the cipher; other values are rejected on dispatch
    SetCipher(u64),
    /// Move the cursor back to offset 0
    Rewind,
    /// Unrecognized code, accepted as a no-op
    Unknown(u32),
}

impl Command {
    /// Decode a raw command code and its parameter
    #[must_use]
    pub fn decode(code: u32, param: u64) -> Self {
        match code {
            IOCTL_OP_GETMAJOR => Self::GetIdentity,
            #[allow(clippy::cast_possible_truncation)]
            IOCTL_OP_SETKEY => Self::SetKey(param as u8),
            IOCTL_OP_ENCRYPT => Self::SetCipher(param),
            IOCTL_OP_REWIND => Self::Rewind,
            other => Self::Unknown(other),
        }
    }

    /// Raw command code
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::GetIdentity => IOCTL_OP_GETMAJOR,
            Self::SetKey(_) => IOCTL_OP_SETKEY,
            Self::SetCipher(_) => IOCTL_OP_ENCRYPT,
            Self::Rewind => IOCTL_OP_REWIND,
            Self::Unknown(code) => *code,
        }
    }
}

impl Session {
    /// Execute a control command against this session
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidArgument` for `SetCipher` with a value
    /// other than 0 or 1; the cipher flag is left as it was.
    pub fn control(&mut self, command: Command) -> Result<i64, DeviceError> {
        let result = match command {
            Command::GetIdentity => {
                info!(major = %self.major, "GET_IDENTITY");
                return Ok(self.major.id());
            }
            Command::SetKey(key) => {
                self.cipher.set_key(key);
                trace!(key, "SET_KEY");
                0
            }
            Command::SetCipher(flag @ (0 | 1)) => {
                self.cipher.set_enabled(flag == 1);
                trace!(flag, "SET_CIPHER");
                0
            }
            Command::SetCipher(flag) => {
                log::warn!(
                    "cannot set cipher flag {flag} for device {}",
                    self.minor()
                );
                return Err(DeviceError::InvalidArgument(format!(
                    "cipher flag must be 0 or 1, got {flag}"
                )));
            }
            Command::Rewind => {
                trace!(from = self.cursor, "REWIND");
                self.cursor = 0;
                0
            }
            Command::Unknown(code) => {
                trace!(code, "ignoring unknown control command");
                0
            }
        };

        trace!(
            minor = %self.minor(),
            key = self.cipher.key(),
            enabled = self.cipher.is_enabled(),
            cursor = self.cursor,
            "session state after control"
        );
        Ok(result)
    }

    /// Decode and execute a raw control request
    ///
    /// # Errors
    ///
    /// See [`Session::control`].
    pub fn ioctl(&mut self, code: u32, param: u64) -> Result<i64, DeviceError> {
        self.control(Command::decode(code, param))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(Command::decode(10, 99), Command::GetIdentity);
        assert_eq!(Command::decode(20, 0x5A), Command::SetKey(0x5A));
        assert_eq!(Command::decode(30, 1), Command::SetCipher(1));
        assert_eq!(Command::decode(40, 0), Command::Rewind);
    }

    #[test]
    fn test_decode_truncates_key_to_low_byte() {
        assert_eq!(Command::decode(IOCTL_OP_SETKEY, 0x1234), Command::SetKey(0x34));
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(Command::decode(99, 1), Command::Unknown(99));
        assert_eq!(Command::Unknown(99).code(), 99);
    }

    #[test]
    fn test_code_matches_decode() {
        for code in [IOCTL_OP_GETMAJOR, IOCTL_OP_SETKEY, IOCTL_OP_ENCRYPT, IOCTL_OP_REWIND] {
            assert_eq!(Command::decode(code, 0).code(), code);
        }
    }
}

//! Per-open session state
//!
//! A session binds one store for its whole lifetime and carries its own
//! cursor and cipher configuration. Two sessions on the same minor share the
//! bytes but nothing else.

use tracing::debug;

use crate::cipher::Cipher;
use crate::error::DeviceError;
use crate::idgen::{Major, Minor};
use crate::io::Store;

/// State of one open device
///
/// Created by [`DeviceRegistry::open`](crate::io::DeviceRegistry::open).
/// Reads and writes live in [`crate::transfer`], control commands in
/// [`crate::control`].
pub struct Session {
    pub(crate) major: Major,
    pub(crate) store: Store,
    pub(crate) cipher: Cipher,
    pub(crate) cursor: usize,
}

impl Session {
    pub(crate) fn new(major: Major, store: Store) -> Self {
        Self {
            major,
            store,
            cipher: Cipher::default(),
            cursor: 0,
        }
    }

    /// Minor number of the bound store
    #[must_use]
    pub fn minor(&self) -> Minor {
        self.store.minor()
    }

    /// Identifier of the registry this session was opened from
    #[must_use]
    pub fn major(&self) -> Major {
        self.major
    }

    /// The store this session reads and writes
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Current read/write offset
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Release the session
    ///
    /// The store is untouched and stays in the registry.
    pub fn close(self) {
        debug!(
            minor = %self.minor(),
            cipher_enabled = self.cipher.is_enabled(),
            cipher_key = self.cipher.key(),
            "device release"
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("minor", &self.minor())
            .field("cipher", &self.cipher)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Close a session if there is one; closing nothing succeeds
pub fn close(session: Option<Session>) {
    if let Some(session) = session {
        session.close();
    }
}

impl embedded_io::ErrorType for Session {
    type Error = DeviceError;
}

impl embedded_io::Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let length = buf.len();
        self.read_into(buf, length)
    }
}

impl embedded_io::Write for Session {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = self.write_from(buf)?;
        if n == 0 && !buf.is_empty() {
            return Err(DeviceError::NoSpace(self.minor()));
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

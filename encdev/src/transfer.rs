//! Bounded sequential read and write
//!
//! Bytes cross the session boundary one at a time through [`UserSink`] and
//! [`UserSource`], the equivalents of `put_user`/`get_user`. A single failed
//! byte aborts the whole call.
//!
//! Failure semantics:
//! - the cursor only advances after every byte of the call was transferred,
//!   so on error it keeps its pre-call value
//! - a failed read leaves the store untouched
//! - a failed write keeps the bytes it already stored

use tracing::{trace, warn};

use crate::error::DeviceError;
use crate::session::Session;

/// Caller-side destination of a read
pub trait UserSink {
    /// Store `byte` at `index` of the caller's area
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if the byte cannot be placed.
    fn put_user(&mut self, index: usize, byte: u8) -> Result<(), DeviceError>;
}

/// Caller-side origin of a write
pub trait UserSource {
    /// Number of bytes the caller offers
    fn user_len(&self) -> usize;

    /// Fetch the byte at `index` of the caller's area
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if the byte cannot be fetched.
    fn get_user(&self, index: usize) -> Result<u8, DeviceError>;
}

impl UserSink for [u8] {
    fn put_user(&mut self, index: usize, byte: u8) -> Result<(), DeviceError> {
        let slot = self
            .get_mut(index)
            .ok_or(DeviceError::Transfer { index })?;
        *slot = byte;
        Ok(())
    }
}

impl UserSink for Vec<u8> {
    fn put_user(&mut self, index: usize, byte: u8) -> Result<(), DeviceError> {
        self.as_mut_slice().put_user(index, byte)
    }
}

impl UserSource for [u8] {
    fn user_len(&self) -> usize {
        self.len()
    }

    fn get_user(&self, index: usize) -> Result<u8, DeviceError> {
        self.get(index).copied().ok_or(DeviceError::Transfer { index })
    }
}

impl UserSource for Vec<u8> {
    fn user_len(&self) -> usize {
        self.len()
    }

    fn get_user(&self, index: usize) -> Result<u8, DeviceError> {
        self.as_slice().get_user(index)
    }
}

/// Number of bytes a transfer of `requested` bytes at `cursor` may move
#[must_use]
pub fn bounded_count(cursor: usize, requested: usize, capacity: usize) -> usize {
    requested.min(capacity.saturating_sub(cursor))
}

impl Session {
    /// Read up to `length` bytes at the cursor into `sink`
    ///
    /// When the cipher is enabled each byte is XOR-ed with the key on its
    /// way out; the store keeps its content. Returns the number of bytes
    /// read, 0 at or past the end of the store.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if a byte cannot be delivered. The
    /// cursor is then unchanged.
    pub fn read_into<S: UserSink + ?Sized>(
        &mut self,
        sink: &mut S,
        length: usize,
    ) -> Result<usize, DeviceError> {
        trace!(minor = %self.minor(), cursor = self.cursor, length, "device read");

        let store = self.store.read();
        let count = bounded_count(self.cursor, length, store.len());
        let window = store.iter().skip(self.cursor).take(count);

        for (index, &byte) in window.enumerate() {
            if let Err(e) = sink.put_user(index, self.cipher.apply(byte)) {
                warn!(minor = %self.minor(), index, "put_user failed");
                return Err(e);
            }
        }
        drop(store);

        self.cursor += count;
        Ok(count)
    }

    /// Write bytes from `source` into the store at the cursor
    ///
    /// Each byte is stored raw first, then replaced by its XOR with the key
    /// when the cipher is enabled. Returns the number of bytes written, 0
    /// when the store is full.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if a byte cannot be fetched. The
    /// cursor is then unchanged.
    pub fn write_from<S: UserSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<usize, DeviceError> {
        let length = source.user_len();
        trace!(minor = %self.minor(), cursor = self.cursor, length, "device write");

        let mut store = self.store.write();
        let count = bounded_count(self.cursor, length, store.len());
        let window = store.iter_mut().skip(self.cursor).take(count);

        for (index, slot) in window.enumerate() {
            match source.get_user(index) {
                Ok(byte) => *slot = byte,
                Err(e) => {
                    warn!(minor = %self.minor(), index, "get_user failed");
                    return Err(e);
                }
            }
            *slot = self.cipher.apply(*slot);
        }
        drop(store);

        self.cursor += count;
        Ok(count)
    }

    /// Read up to `length` bytes at the cursor
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if the read fails.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>, DeviceError> {
        let count = bounded_count(self.cursor, length, self.store.capacity());
        let mut out = vec![0u8; count];
        let n = self.read_into(out.as_mut_slice(), count)?;
        out.truncate(n);
        Ok(out)
    }

    /// Write `data` at the cursor, returning how many bytes fit
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Transfer` if the write fails.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        self.write_from(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_count() {
        assert_eq!(bounded_count(0, 5, 128), 5);
        assert_eq!(bounded_count(126, 5, 128), 2);
        assert_eq!(bounded_count(128, 5, 128), 0);
        assert_eq!(bounded_count(200, 5, 128), 0);
        assert_eq!(bounded_count(0, 500, 128), 128);
    }

    #[test]
    fn test_slice_sink_faults_out_of_range() {
        let mut buf = [0u8; 2];
        assert!(buf.put_user(1, 7).is_ok());
        assert_eq!(buf, [0, 7]);
        assert_eq!(buf.put_user(2, 7), Err(DeviceError::Transfer { index: 2 }));
    }

    #[test]
    fn test_slice_source_faults_out_of_range() {
        let data: &[u8] = b"ab";
        assert_eq!(data.user_len(), 2);
        assert_eq!(data.get_user(1), Ok(b'b'));
        assert_eq!(data.get_user(2), Err(DeviceError::Transfer { index: 2 }));
    }
}

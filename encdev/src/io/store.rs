//! Fixed-capacity device storage with internal locking
//!
//! One store backs one minor number. Its length is fixed when the store is
//! created and never changes afterwards.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::DeviceError;
use crate::idgen::Minor;

struct StoreInner {
    minor: Minor,
    capacity: usize,
    bytes: RwLock<Box<[u8]>>,
}

/// Read-only guard to store contents
///
/// Holds the shared lock until dropped.
pub struct StoreReadGuard<'a>(RwLockReadGuard<'a, Box<[u8]>>);

impl Deref for StoreReadGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for StoreReadGuard<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Mutable guard to store contents
///
/// Holds the exclusive lock until dropped. The slice can be modified in
/// place but never resized.
pub struct StoreWriteGuard<'a>(RwLockWriteGuard<'a, Box<[u8]>>);

impl Deref for StoreWriteGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for StoreWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Shared fixed-capacity byte store
///
/// Clones share the same bytes. The registry keeps one clone per minor and
/// every session opened on that minor holds another.
///
/// # Thread Safety
///
/// Access goes through a `parking_lot::RwLock`:
/// - `read()` takes the shared lock, so concurrent readers do not block each other
/// - `write()` takes the exclusive lock
///
/// The I/O engine holds a guard only for the duration of one bounded transfer.
///
/// # Example
///
/// ```
/// use encdev::idgen::Minor;
/// use encdev::io::Store;
///
/// let store = Store::zeroed(Minor::new(0), 4).unwrap();
/// store.write()[0] = b'x';
///
/// let guard = store.read();
/// assert_eq!(&*guard, b"x\0\0\0");
/// ```
#[derive(Clone)]
pub struct Store(Arc<StoreInner>);

impl Store {
    /// Create a zero-filled store of `capacity` bytes
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Allocation` if the backing bytes cannot be reserved.
    pub fn zeroed(minor: Minor, capacity: usize) -> Result<Self, DeviceError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| DeviceError::store_allocation(minor, capacity))?;
        bytes.resize(capacity, 0);

        Ok(Self(Arc::new(StoreInner {
            minor,
            capacity,
            bytes: RwLock::new(bytes.into_boxed_slice()),
        })))
    }

    /// Minor number this store belongs to
    #[must_use]
    pub fn minor(&self) -> Minor {
        self.0.minor
    }

    /// Fixed length of the store, available without taking the lock
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.0.capacity
    }

    /// Lock the store for reading
    #[must_use]
    pub fn read(&self) -> StoreReadGuard<'_> {
        StoreReadGuard(self.0.bytes.read())
    }

    /// Lock the store for writing
    #[must_use]
    pub fn write(&self) -> StoreWriteGuard<'_> {
        StoreWriteGuard(self.0.bytes.write())
    }

    /// Copy of the raw stored bytes
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.read().to_vec()
    }

    /// Whether both references point at the same store
    #[must_use]
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("minor", &self.0.minor)
            .field("capacity", &self.0.capacity)
            .finish()
    }
}

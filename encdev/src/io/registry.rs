//! Minor-number keyed device registry
//!
//! The first access to a minor creates its store. Later accesses return the
//! same store, so data written through one session is visible to every
//! later session on that minor.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

use super::store::Store;
use crate::config::DeviceConfig;
use crate::error::DeviceError;
use crate::idgen::{IdGen, Major, Minor};
use crate::session::Session;

/// Registry of device stores, keyed by minor number
///
/// Uses interior mutability via `Mutex` so that `resolve_or_create` is atomic
/// and the registry can be shared by reference between callers.
pub struct DeviceRegistry {
    major: Major,
    capacity: usize,
    stores: Mutex<HashMap<Minor, Store>>,
}

impl DeviceRegistry {
    /// Create an empty registry and allocate its identifier
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Allocation` if the entry table cannot be allocated.
    pub fn initialize(config: DeviceConfig, id_gen: &IdGen) -> Result<Self, DeviceError> {
        let mut stores = HashMap::new();
        stores
            .try_reserve(1)
            .map_err(|_| DeviceError::Allocation("cannot allocate device registry".to_string()))?;

        let major = id_gen.next_major();
        info!(%major, capacity = config.buffer_capacity, "device registry initialized");

        Ok(Self {
            major,
            capacity: config.buffer_capacity,
            stores: Mutex::new(stores),
        })
    }

    /// Registry-wide identifier
    #[must_use]
    pub fn major(&self) -> Major {
        self.major
    }

    /// Capacity of every store in this registry
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the store for `minor`, creating a zeroed one if absent
    ///
    /// Either the new store is fully created and inserted, or the registry
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Allocation` if the entry or its bytes cannot be
    /// allocated.
    pub fn resolve_or_create(&self, minor: Minor) -> Result<Store, DeviceError> {
        let mut stores = self.stores.lock();

        if let Some(store) = stores.get(&minor) {
            return Ok(store.clone());
        }

        stores
            .try_reserve(1)
            .map_err(|_| DeviceError::Allocation(format!("cannot register device {minor}")))?;
        let store = Store::zeroed(minor, self.capacity)?;
        stores.insert(minor, store.clone());

        debug!(%minor, capacity = self.capacity, "created device store");
        Ok(store)
    }

    /// Open a new session on `minor`
    ///
    /// Each call yields an independent session with its own cursor and
    /// cipher configuration, even for a repeated minor.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Allocation` if the store cannot be resolved.
    pub fn open(&self, minor: Minor) -> Result<Session, DeviceError> {
        debug!(%minor, "device open");
        let store = self.resolve_or_create(minor)?;
        Ok(Session::new(self.major, store))
    }

    /// Minor numbers that have a store, in ascending order
    #[must_use]
    pub fn minors(&self) -> Vec<Minor> {
        let stores = self.stores.lock();
        let mut minors: Vec<Minor> = stores.keys().copied().collect();
        minors.sort();
        minors
    }

    /// Number of materialized stores
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.lock().is_empty()
    }

    /// Release every store and the registry itself
    ///
    /// Sessions that are still open keep their store alive until they close.
    pub fn teardown(self) {
        let mut stores = self.stores.into_inner();
        let released = stores.len();
        stores.clear();
        info!(major = %self.major, released, "device registry torn down");
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("major", &self.major)
            .field("capacity", &self.capacity)
            .field("devices", &self.len())
            .finish()
    }
}

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Identifier of an open session in the host's descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    id: i64,
}

impl Handle {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Registry-wide identifier, assigned once when the registry is initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Major(i64);

impl Major {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device number within the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Minor(u32);

impl Minor {
    #[must_use]
    pub fn new(minor: u32) -> Self {
        Self(minor)
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Minor {
    fn from(minor: u32) -> Self {
        Self(minor)
    }
}

impl fmt::Display for Minor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe ID generator
///
/// Handles and majors are counted separately, both starting at 1, so the
/// first major from a fresh generator is always 1 no matter how many
/// handles were allocated before it.
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicI64,
    next_major: AtomicI64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            next_major: AtomicI64::new(1),
        }
    }

    /// Get the next unique ID
    pub fn get_next(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate a fresh session handle
    pub fn next_handle(&self) -> Handle {
        Handle::new(self.get_next())
    }

    /// Allocate a fresh registry identifier
    pub fn next_major(&self) -> Major {
        Major::new(self.next_major.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let id_gen = IdGen::new();
        let a = id_gen.get_next();
        let b = id_gen.get_next();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn test_majors_do_not_depend_on_handle_allocation() {
        let id_gen = IdGen::new();
        id_gen.next_handle();
        id_gen.next_handle();

        assert_eq!(id_gen.next_major(), Major::new(1));
        assert_eq!(id_gen.next_major(), Major::new(2));
        assert_eq!(id_gen.next_handle(), Handle::new(3));
    }
}

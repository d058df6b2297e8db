//! Single-byte XOR stream transform
//!
//! This is a toy transform with no confidentiality guarantees.

/// Per-session cipher configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cipher {
    key: u8,
    enabled: bool,
}

impl Cipher {
    #[must_use]
    pub fn new(key: u8, enabled: bool) -> Self {
        Self { key, enabled }
    }

    #[must_use]
    pub fn key(&self) -> u8 {
        self.key
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_key(&mut self, key: u8) {
        self.key = key;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Transform one byte: `byte ^ key` when enabled, unchanged otherwise
    #[must_use]
    pub fn apply(&self, byte: u8) -> u8 {
        if self.enabled {
            byte ^ self.key
        } else {
            byte
        }
    }
}

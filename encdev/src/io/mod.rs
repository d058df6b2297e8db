//! Storage layer for encdev
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Session (per open)                 │
//! │  - cursor                           │
//! │  - cipher key and flag              │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ holds a clone of one Store
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Store (shared storage)             │
//! │  - Arc<RwLock<Box<[u8]>>>           │
//! │  - fixed capacity, zero-filled      │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ created/managed by
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  DeviceRegistry                     │
//! │  - minor number -> Store            │
//! │  - first access creates             │
//! └─────────────────────────────────────┘
//! ```

pub mod registry;
pub mod store;

pub use registry::DeviceRegistry;
pub use store::{Store, StoreReadGuard, StoreWriteGuard};

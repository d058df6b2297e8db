pub mod cipher;
pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod idgen;
pub mod io;
pub mod session;
pub mod transfer;

// Re-export identifier types for convenience
pub use idgen::{Handle, IdGen, Major, Minor};

// Re-export storage types for convenience
pub use io::{DeviceRegistry, Store};

// Re-export session and I/O types for convenience
pub use cipher::Cipher;
pub use session::{close, Session};
pub use transfer::{UserSink, UserSource};

// Re-export control protocol
pub use control::Command;

// Re-export configuration and errors
pub use config::{ConfigError, DeviceConfig};
pub use error::DeviceError;

// Re-export host types
pub use host::{DeviceHost, DeviceRequest, HostClient};

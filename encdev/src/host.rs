//! In-process host for the device registry
//!
//! Plays the role of the character-device layer: it owns the registry,
//! keeps a descriptor table of open sessions, and routes open, read, write,
//! control and close requests to them. Clients talk to the host over a
//! channel and wait for a oneshot reply, so any number of tasks can share
//! one registry while every core call runs on the host task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::config::DeviceConfig;
use crate::error::DeviceError;
use crate::idgen::{Handle, IdGen, Major, Minor};
use crate::io::DeviceRegistry;
use crate::session::Session;

/// Name under which the device range is registered
pub const DEVICE_RANGE_NAME: &str = "encdev";

type Reply<T> = oneshot::Sender<Result<T, DeviceError>>;

/// Requests sent from a `HostClient` to the `DeviceHost`
pub enum DeviceRequest {
    /// Open a session on a minor (returns its handle)
    Open { minor: Minor, response: Reply<Handle> },
    /// Read up to `length` bytes at the session cursor
    Read {
        handle: Handle,
        length: usize,
        response: Reply<Vec<u8>>,
    },
    /// Write bytes at the session cursor (returns bytes written)
    Write {
        handle: Handle,
        data: Vec<u8>,
        response: Reply<usize>,
    },
    /// Raw control command
    Control {
        handle: Handle,
        code: u32,
        param: u64,
        response: Reply<i64>,
    },
    /// Close a session; unknown handles are ignored
    Close { handle: Handle, response: Reply<()> },
}

/// Registry plus descriptor table, driven by the host loop
struct HostState {
    registry: DeviceRegistry,
    /// Descriptor table: handle -> open session
    sessions: HashMap<Handle, Session>,
    id_gen: Arc<IdGen>,
}

impl HostState {
    fn session_mut(&mut self, handle: Handle) -> Result<&mut Session, DeviceError> {
        self.sessions.get_mut(&handle).ok_or_else(|| {
            warn!(?handle, "no session for handle");
            DeviceError::BadDescriptor(handle)
        })
    }

    fn handle_open(&mut self, minor: Minor) -> Result<Handle, DeviceError> {
        self.sessions
            .try_reserve(1)
            .map_err(|_| DeviceError::Allocation(format!("cannot allocate session for {minor}")))?;
        let session = self.registry.open(minor)?;
        let handle = self.id_gen.next_handle();
        self.sessions.insert(handle, session);
        debug!(%minor, ?handle, "session opened");
        Ok(handle)
    }

    fn handle_read(&mut self, handle: Handle, length: usize) -> Result<Vec<u8>, DeviceError> {
        self.session_mut(handle)?.read(length)
    }

    fn handle_write(&mut self, handle: Handle, data: &[u8]) -> Result<usize, DeviceError> {
        self.session_mut(handle)?.write(data)
    }

    fn handle_control(&mut self, handle: Handle, code: u32, param: u64) -> Result<i64, DeviceError> {
        self.session_mut(handle)?.ioctl(code, param)
    }

    fn handle_close(&mut self, handle: Handle) {
        match self.sessions.remove(&handle) {
            Some(session) => session.close(),
            None => log::warn!("close: handle {handle:?} is not open"),
        }
    }

    fn dispatch(&mut self, request: DeviceRequest) {
        match request {
            DeviceRequest::Open { minor, response } => {
                let _ = response.send(self.handle_open(minor));
            }
            DeviceRequest::Read {
                handle,
                length,
                response,
            } => {
                let _ = response.send(self.handle_read(handle, length));
            }
            DeviceRequest::Write {
                handle,
                data,
                response,
            } => {
                let _ = response.send(self.handle_write(handle, &data));
            }
            DeviceRequest::Control {
                handle,
                code,
                param,
                response,
            } => {
                let _ = response.send(self.handle_control(handle, code, param));
            }
            DeviceRequest::Close { handle, response } => {
                self.handle_close(handle);
                let _ = response.send(Ok(()));
            }
        }
    }

    fn shutdown(mut self) {
        debug!(open = self.sessions.len(), "closing leftover sessions");
        for (_, session) in self.sessions.drain() {
            session.close();
        }
        self.registry.teardown();
    }
}

/// Owner of the registry and of every open session
///
/// Requests are processed one at a time on the task running [`DeviceHost::run`].
pub struct DeviceHost {
    state: HostState,
    system_tx: mpsc::UnboundedSender<DeviceRequest>,
    request_rx: mpsc::UnboundedReceiver<DeviceRequest>,
}

impl DeviceHost {
    /// Initialize a registry and register it under a freshly allocated major
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Allocation` if the registry cannot be created.
    pub fn register(config: DeviceConfig, id_gen: Arc<IdGen>) -> Result<Self, DeviceError> {
        let registry = DeviceRegistry::initialize(config, &id_gen)?;
        let major = registry.major();
        let (system_tx, request_rx) = mpsc::unbounded_channel();

        info!(name = DEVICE_RANGE_NAME, %major, "device range registered");
        info!("to talk to the device, create a device file: mknod /dev/<name> c {major} 0");

        Ok(Self {
            state: HostState {
                registry,
                sessions: HashMap::new(),
                id_gen,
            },
            system_tx,
            request_rx,
        })
    }

    #[must_use]
    pub fn major(&self) -> Major {
        self.state.registry.major()
    }

    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.state.registry
    }

    /// Create a client for sending requests to this host
    #[must_use]
    pub fn client(&self) -> HostClient {
        HostClient {
            system_tx: self.system_tx.clone(),
        }
    }

    /// Main loop - serves requests until every client is dropped,
    /// then closes leftover sessions and tears the registry down
    pub async fn run(self) {
        let Self {
            mut state,
            system_tx,
            mut request_rx,
        } = self;
        // Drop our copy of the sender so the channel closes with the last client
        drop(system_tx);

        while let Some(request) = request_rx.recv().await {
            trace!("received request");
            state.dispatch(request);
        }

        debug!("request channel closed");
        state.shutdown();
        info!(name = DEVICE_RANGE_NAME, "device range unregistered");
    }
}

/// Async front end to a running `DeviceHost`
///
/// Cheap to clone. Every method fails with `DeviceError::HostClosed` once
/// the host has stopped.
#[derive(Clone)]
pub struct HostClient {
    system_tx: mpsc::UnboundedSender<DeviceRequest>,
}

impl HostClient {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> DeviceRequest,
    ) -> Result<T, DeviceError> {
        let (tx, rx) = oneshot::channel();
        self.system_tx
            .send(make(tx))
            .map_err(|_| DeviceError::HostClosed)?;
        rx.await.map_err(|_| DeviceError::HostClosed)?
    }

    /// Open a session on `minor`
    ///
    /// # Errors
    ///
    /// `Allocation` if the store or session cannot be created.
    pub async fn open(&self, minor: Minor) -> Result<Handle, DeviceError> {
        self.request(|response| DeviceRequest::Open { minor, response })
            .await
    }

    /// Read up to `length` bytes
    ///
    /// # Errors
    ///
    /// `BadDescriptor` for an unknown handle, `Transfer` if the copy fails.
    pub async fn read(&self, handle: Handle, length: usize) -> Result<Vec<u8>, DeviceError> {
        self.request(|response| DeviceRequest::Read {
            handle,
            length,
            response,
        })
        .await
    }

    /// Write `data`, returning how many bytes fit
    ///
    /// # Errors
    ///
    /// `BadDescriptor` for an unknown handle, `Transfer` if the copy fails.
    pub async fn write(&self, handle: Handle, data: &[u8]) -> Result<usize, DeviceError> {
        let data = data.to_vec();
        self.request(|response| DeviceRequest::Write {
            handle,
            data,
            response,
        })
        .await
    }

    /// Issue a raw control command
    ///
    /// # Errors
    ///
    /// `BadDescriptor` for an unknown handle, `InvalidArgument` for a bad
    /// cipher flag.
    pub async fn control(&self, handle: Handle, code: u32, param: u64) -> Result<i64, DeviceError> {
        self.request(|response| DeviceRequest::Control {
            handle,
            code,
            param,
            response,
        })
        .await
    }

    /// Close a session; closing an unknown handle succeeds
    ///
    /// # Errors
    ///
    /// `HostClosed` if the host has stopped.
    pub async fn close(&self, handle: Handle) -> Result<(), DeviceError> {
        self.request(|response| DeviceRequest::Close { handle, response })
            .await
    }
}

//! Local endpoint discovery and ownership.
//!
//! The endpoint is a Unix stream socket. On Linux it lives in the abstract
//! namespace: binding is atomic and the kernel drops the name when the owning
//! process exits, so a crashed primary never leaves a stale registration.
//! Abstract names carry no file permissions, so the service checks the peer
//! uid of every connection instead.
//!
//! Elsewhere it is a socket file in the per-user runtime directory. Claims
//! there are serialised through an advisory lock on `<name>.lock` so a stale
//! socket file is removed and rebound by exactly one contender.

use jukebox_core::{AppDirs, RemoteConfig};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no running instance on endpoint '{0}'")]
    NoInstanceRunning(String),
    #[error("endpoint '{0}' is already claimed by another instance")]
    AlreadyClaimed(String),
    #[error("connection to endpoint '{0}' refused")]
    ConnectionRefused(String),
    #[error("timed out talking to endpoint '{0}'")]
    Timeout(String),
    #[error("failed to bind endpoint '{name}': {source}")]
    Bind { name: String, source: io::Error },
    #[error("i/o error on endpoint '{name}': {source}")]
    Io { name: String, source: io::Error },
}

/// Effective uid of this process.
pub fn current_uid() -> libc::uid_t {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

/// Identity of the primary instance: endpoint name plus the object path calls
/// are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
    object_path: String,
    address: PathBuf,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, object_path: impl Into<String>, runtime_dir: &Path) -> Self {
        let name = name.into();
        let address = runtime_dir.join(format!("{name}.sock"));
        Self {
            name,
            object_path: object_path.into(),
            address,
        }
    }

    pub fn from_config(config: &RemoteConfig, dirs: &AppDirs) -> Self {
        Self::new(&config.endpoint, &config.object_path, dirs.runtime_dir())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    /// Socket address: an abstract name on Linux, a file path elsewhere.
    pub fn address(&self) -> &Path {
        &self.address
    }
}

/// Ownership of the endpoint. Dropping it unregisters.
#[derive(Debug)]
pub struct EndpointHandle {
    endpoint: Endpoint,
    listener: UnixListener,
}

impl EndpointHandle {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// A non-blocking listener for the async accept loop, sharing the socket.
    pub(crate) fn async_listener(&self) -> Result<tokio::net::UnixListener, TransportError> {
        let io_err = |source| TransportError::Io {
            name: self.endpoint.name.clone(),
            source,
        };
        let listener = self.listener.try_clone().map_err(io_err)?;
        listener.set_nonblocking(true).map_err(io_err)?;
        tokio::net::UnixListener::from_std(listener).map_err(io_err)
    }
}

impl Drop for EndpointHandle {
    fn drop(&mut self) {
        sys::release(&self.endpoint.address);
        tracing::debug!(endpoint = %self.endpoint.name, "endpoint released");
    }
}

/// Finds, claims and connects to the endpoint.
#[derive(Debug, Clone)]
pub struct TransportLink {
    endpoint: Endpoint,
    timeout: Duration,
}

impl TransportLink {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a primary instance currently owns the endpoint.
    pub fn probe(&self) -> bool {
        sys::connect(&self.endpoint.address).is_ok()
    }

    /// Register this process as the primary instance.
    ///
    /// Losing a race to another process yields `AlreadyClaimed`; callers
    /// should become a client instead.
    pub fn claim(&self) -> Result<EndpointHandle, TransportError> {
        let name = &self.endpoint.name;
        let listener = sys::bind(&self.endpoint.address).map_err(|source| {
            if source.kind() == io::ErrorKind::AddrInUse {
                TransportError::AlreadyClaimed(name.clone())
            } else {
                TransportError::Bind {
                    name: name.clone(),
                    source,
                }
            }
        })?;
        tracing::info!(endpoint = %name, object = %self.endpoint.object_path, "endpoint claimed");
        Ok(EndpointHandle {
            endpoint: self.endpoint.clone(),
            listener,
        })
    }

    /// Open a client connection with the configured read/write timeout.
    pub fn connect(&self) -> Result<UnixStream, TransportError> {
        let name = &self.endpoint.name;
        let stream = sys::connect(&self.endpoint.address)
            .map_err(|err| sys::connect_error(name, err))?;
        let io_err = |source| TransportError::Io {
            name: name.clone(),
            source,
        };
        stream.set_read_timeout(Some(self.timeout)).map_err(io_err)?;
        stream.set_write_timeout(Some(self.timeout)).map_err(io_err)?;
        Ok(stream)
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use super::TransportError;
    use std::io;
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::net::{SocketAddr, UnixListener, UnixStream};
    use std::path::Path;

    fn abstract_addr(address: &Path) -> io::Result<SocketAddr> {
        SocketAddr::from_abstract_name(address.as_os_str().as_bytes())
    }

    pub fn bind(address: &Path) -> io::Result<UnixListener> {
        UnixListener::bind_addr(&abstract_addr(address)?)
    }

    pub fn connect(address: &Path) -> io::Result<UnixStream> {
        UnixStream::connect_addr(&abstract_addr(address)?)
    }

    /// Abstract names disappear with their socket.
    pub fn release(_address: &Path) {}

    pub fn connect_error(name: &str, err: io::Error) -> TransportError {
        match err.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => {
                TransportError::NoInstanceRunning(name.to_string())
            }
            _ => TransportError::Io {
                name: name.to_string(),
                source: err,
            },
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod sys {
    use super::TransportError;
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::Path;

    /// Exclusive advisory lock on `<name>.lock`, held until the file is dropped.
    fn lock(address: &Path) -> io::Result<fs::File> {
        if let Some(dir) = address.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(address.with_extension("lock"))?;
        // SAFETY: the descriptor stays owned by `file` for the whole call.
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(file)
    }

    fn bind_socket(address: &Path) -> io::Result<UnixListener> {
        let listener = UnixListener::bind(address)?;
        fs::set_permissions(address, fs::Permissions::from_mode(0o600))?;
        Ok(listener)
    }

    /// Bind, replacing a socket file nobody answers on. Checking for a live
    /// owner and rebinding both happen under the lock.
    pub fn bind(address: &Path) -> io::Result<UnixListener> {
        let _lock = lock(address)?;
        match bind_socket(address) {
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => match UnixStream::connect(address) {
                Err(refused) if refused.kind() == io::ErrorKind::ConnectionRefused => {
                    tracing::warn!(path = %address.display(), "removing stale endpoint socket");
                    fs::remove_file(address)?;
                    bind_socket(address)
                }
                _ => Err(err),
            },
            other => other,
        }
    }

    pub fn connect(address: &Path) -> io::Result<UnixStream> {
        UnixStream::connect(address)
    }

    pub fn release(address: &Path) {
        let _lock = lock(address);
        let _ = fs::remove_file(address);
    }

    pub fn connect_error(name: &str, err: io::Error) -> TransportError {
        match err.kind() {
            io::ErrorKind::NotFound => TransportError::NoInstanceRunning(name.to_string()),
            io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(name.to_string()),
            _ => TransportError::Io {
                name: name.to_string(),
                source: err,
            },
        }
    }
}

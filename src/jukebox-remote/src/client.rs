//! Client side of the remote-control protocol.

use crate::protocol::{
    RemoteError, RemoteErrorKind, RemoteMethod, RemoteRequest, RemoteResponse, RemoteResult,
};
use crate::transport::{TransportError, TransportLink};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from remote calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote call failed: {0}")]
    Remote(RemoteError),
    #[error("failed to write to primary instance: {0}")]
    Write(io::Error),
    #[error("failed to read from primary instance: {0}")]
    Read(io::Error),
    #[error("failed to parse remote response: {0}")]
    Parse(serde_json::Error),
    #[error("unexpected response to {method}")]
    UnexpectedResponse { method: &'static str },
    #[error("request/response ID mismatch: sent {sent}, received {received}")]
    IdMismatch { sent: u64, received: u64 },
    #[error("primary instance closed the connection")]
    Disconnected,
}

/// Every way a remote command can fail, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoInstanceRunning,
    AlreadyClaimed,
    ConnectionRefused,
    Timeout,
    BadArgument,
    NotPlaying,
    Unsupported,
    InternalFault,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Transport(err) => match err {
                TransportError::NoInstanceRunning(_) => FailureKind::NoInstanceRunning,
                TransportError::AlreadyClaimed(_) => FailureKind::AlreadyClaimed,
                TransportError::Timeout(_) => FailureKind::Timeout,
                TransportError::ConnectionRefused(_)
                | TransportError::Bind { .. }
                | TransportError::Io { .. } => FailureKind::ConnectionRefused,
            },
            ClientError::Remote(err) => match err.kind {
                RemoteErrorKind::BadArgument => FailureKind::BadArgument,
                RemoteErrorKind::NotPlaying => FailureKind::NotPlaying,
                RemoteErrorKind::Unsupported => FailureKind::Unsupported,
                RemoteErrorKind::InternalFault => FailureKind::InternalFault,
            },
            ClientError::Write(_) | ClientError::Read(_) | ClientError::Disconnected => {
                FailureKind::ConnectionRefused
            }
            ClientError::Parse(_)
            | ClientError::UnexpectedResponse { .. }
            | ClientError::IdMismatch { .. } => FailureKind::InternalFault,
        }
    }
}

struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

/// Typed proxy for the primary instance's player object.
///
/// Calls on one client are answered in the order they are made.
pub struct RemoteClient {
    endpoint: String,
    object_path: String,
    connection: Mutex<Connection>,
    request_id: AtomicU64,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.endpoint)
            .field("object_path", &self.object_path)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Connect to the primary instance behind `link`.
    pub fn connect(link: &TransportLink) -> Result<Self, ClientError> {
        let stream = link.connect()?;
        let writer = stream.try_clone().map_err(ClientError::Write)?;
        tracing::debug!(endpoint = %link.endpoint().name(), "connected to primary instance");
        Ok(Self {
            endpoint: link.endpoint().name().to_string(),
            object_path: link.endpoint().object_path().to_string(),
            connection: Mutex::new(Connection {
                reader: BufReader::new(stream),
                writer,
            }),
            request_id: AtomicU64::new(1),
        })
    }

    /// Send one call and wait for its reply. Error replies become
    /// [`ClientError::Remote`].
    pub fn call(&self, method: RemoteMethod) -> Result<RemoteResult, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let name = method.name();
        let request = RemoteRequest {
            id,
            object: self.object_path.clone(),
            call: method,
        };
        let json = serde_json::to_string(&request).map_err(ClientError::Parse)?;
        tracing::debug!(id, method = name, "remote call");

        let response_line = {
            let mut connection = self
                .connection
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            writeln!(connection.writer, "{}", json).map_err(|err| self.io_error(err, ClientError::Write))?;
            connection
                .writer
                .flush()
                .map_err(|err| self.io_error(err, ClientError::Write))?;

            let mut line = String::new();
            connection
                .reader
                .read_line(&mut line)
                .map_err(|err| self.io_error(err, ClientError::Read))?;
            if line.is_empty() {
                return Err(ClientError::Disconnected);
            }
            line
        };

        let response: RemoteResponse =
            serde_json::from_str(&response_line).map_err(ClientError::Parse)?;
        if response.id != id {
            return Err(ClientError::IdMismatch {
                sent: id,
                received: response.id,
            });
        }
        match response.result {
            RemoteResult::Error(err) => Err(ClientError::Remote(err)),
            result => Ok(result),
        }
    }

    fn io_error(&self, err: io::Error, wrap: fn(io::Error) -> ClientError) -> ClientError {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                ClientError::Transport(TransportError::Timeout(self.endpoint.clone()))
            }
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => ClientError::Disconnected,
            _ => wrap(err),
        }
    }

    fn call_unit(&self, method: RemoteMethod) -> Result<(), ClientError> {
        let name = method.name();
        match self.call(method)? {
            RemoteResult::Unit => Ok(()),
            _ => Err(ClientError::UnexpectedResponse { method: name }),
        }
    }

    fn call_text(&self, method: RemoteMethod) -> Result<String, ClientError> {
        let name = method.name();
        match self.call(method)? {
            RemoteResult::Text(text) => Ok(text),
            _ => Err(ClientError::UnexpectedResponse { method: name }),
        }
    }

    pub fn test_service(&self, message: &str) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::TestService {
            message: message.to_string(),
        })
    }

    pub fn is_playing(&self) -> Result<bool, ClientError> {
        match self.call(RemoteMethod::IsPlaying)? {
            RemoteResult::Bool(playing) => Ok(playing),
            _ => Err(ClientError::UnexpectedResponse {
                method: "is_playing",
            }),
        }
    }

    pub fn get_track_attr(&self, attr: &str) -> Result<String, ClientError> {
        self.call_text(RemoteMethod::GetTrackAttr { attr: attr.into() })
    }

    pub fn set_track_attr(&self, attr: &str, value: serde_json::Value) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::SetTrackAttr {
            attr: attr.into(),
            value,
        })
    }

    pub fn change_volume(&self, action: &str, value: i64) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::ChangeVolume {
            action: action.into(),
            value,
        })
    }

    pub fn prev(&self) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::Prev)
    }

    pub fn stop(&self) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::Stop)
    }

    pub fn next(&self) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::Next)
    }

    pub fn play(&self) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::Play)
    }

    pub fn play_pause(&self) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::PlayPause)
    }

    /// `"NN%"`, or empty when the position is unknown.
    pub fn current_position(&self) -> Result<String, ClientError> {
        self.call_text(RemoteMethod::CurrentPosition)
    }

    pub fn get_volume(&self) -> Result<String, ClientError> {
        self.call_text(RemoteMethod::GetVolume)
    }

    pub fn get_version(&self) -> Result<String, ClientError> {
        self.call_text(RemoteMethod::GetVersion)
    }

    pub fn play_file(&self, filename: &str) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::PlayFile {
            filename: filename.into(),
        })
    }

    /// Acknowledged before the files are resolved. The next call on this
    /// client is answered once they are queued.
    pub fn enqueue(&self, filenames: Vec<String>) -> Result<(), ClientError> {
        self.call_unit(RemoteMethod::Enqueue { filenames })
    }
}

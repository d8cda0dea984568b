//! Wire types for the remote-control protocol.
//!
//! Requests and responses are single-line JSON documents; each request gets
//! exactly one response carrying the same `id`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request sent from a client to the primary instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Unique request ID for correlation.
    pub id: u64,
    /// Object path the call is addressed to.
    pub object: String,
    /// The method to invoke with its arguments.
    pub call: RemoteMethod,
}

/// Response from the primary instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    /// Request ID this response correlates to.
    pub id: u64,
    /// The result of the method invocation.
    pub result: RemoteResult,
}

/// Remotely invokable methods.
///
/// Arguments travel as the caller wrote them; the service validates them
/// before touching the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum RemoteMethod {
    /// Diagnostic echo; the message is logged by the service.
    TestService { message: String },
    IsPlaying,
    GetTrackAttr { attr: String },
    SetTrackAttr {
        attr: String,
        value: serde_json::Value,
    },
    ChangeVolume { action: String, value: i64 },
    Prev,
    Stop,
    Next,
    Play,
    PlayPause,
    CurrentPosition,
    GetVolume,
    GetVersion,
    PlayFile { filename: String },
    Enqueue { filenames: Vec<String> },
}

impl RemoteMethod {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteMethod::TestService { .. } => "test_service",
            RemoteMethod::IsPlaying => "is_playing",
            RemoteMethod::GetTrackAttr { .. } => "get_track_attr",
            RemoteMethod::SetTrackAttr { .. } => "set_track_attr",
            RemoteMethod::ChangeVolume { .. } => "change_volume",
            RemoteMethod::Prev => "prev",
            RemoteMethod::Stop => "stop",
            RemoteMethod::Next => "next",
            RemoteMethod::Play => "play",
            RemoteMethod::PlayPause => "play_pause",
            RemoteMethod::CurrentPosition => "current_position",
            RemoteMethod::GetVolume => "get_volume",
            RemoteMethod::GetVersion => "get_version",
            RemoteMethod::PlayFile { .. } => "play_file",
            RemoteMethod::Enqueue { .. } => "enqueue",
        }
    }
}

/// Result of a method invocation. There are no partial or streamed replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RemoteResult {
    Unit,
    Bool(bool),
    Text(String),
    Error(RemoteError),
}

/// Structured failure carried in a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::BadArgument, message)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Failure categories that cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Unrecognized attribute key or malformed value.
    BadArgument,
    /// The call needs a current track and there is none.
    NotPlaying,
    /// Attribute not settable or command not implemented.
    Unsupported,
    /// Unexpected failure inside the primary; logged there.
    InternalFault,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteErrorKind::BadArgument => "bad argument",
            RemoteErrorKind::NotPlaying => "not playing",
            RemoteErrorKind::Unsupported => "unsupported",
            RemoteErrorKind::InternalFault => "internal fault",
        })
    }
}

//! Remote control of a running Jukebox instance.
//!
//! One process per user owns a named local endpoint (the primary instance)
//! and serves [`RemoteService`] on it. Later invocations find the endpoint
//! through [`TransportLink`] and drive the primary's player with
//! [`RemoteClient`] instead of starting a second player.
//!
//! Calls are newline-delimited JSON: each [`RemoteRequest`] names the object
//! path and method, and gets exactly one [`RemoteResponse`] with the same id.

pub mod client;
pub mod protocol;
pub mod service;
pub mod transport;

pub use client::{ClientError, FailureKind, RemoteClient};
pub use protocol::{
    RemoteError, RemoteErrorKind, RemoteMethod, RemoteRequest, RemoteResponse, RemoteResult,
    PROTOCOL_VERSION,
};
pub use service::{format_position, RemoteService, ServiceState};
pub use transport::{current_uid, Endpoint, EndpointHandle, TransportError, TransportLink};

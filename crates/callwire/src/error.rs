//! Error types for the call engine.
//!
//! [`Error`] captures the infrastructure faults the engine itself can raise:
//! channel misuse, call termination observed while suspended, message
//! decoding failures, transport loss and registry problems. Handlers rarely
//! build these directly; they surface through `?` on channel operations and
//! convert into a [`Status`] via `From<Error> for Status`.
//!
//! ## Error Cases
//! - `ChannelClosed`: `send` after end-of-input or after the peer closed.
//! - `Terminated`: the call reached a non-OK terminal status while suspended.
//! - `Decode`: a frame could not be decoded into the expected message.
//! - `Transport`: the transport could not carry the call.
//! - `UnknownMethod`: no handler is registered for a descriptor.
//! - `DuplicateMethod`: a descriptor was registered twice.
//! - `PatternMismatch`: a descriptor was invoked with the wrong call pattern.
//! - `ServiceShutdown`: the dispatch loop is shutting down.

use crate::Status;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified infrastructure error type for the engine.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The send direction was already closed.
    #[error("Channel closed")]
    ChannelClosed,

    /// The call ended with a non-OK status while an operation was pending.
    #[error("Call terminated: {0}")]
    Terminated(Status),

    /// A frame could not be decoded.
    #[error("Malformed message: {context}")]
    Decode { context: String },

    /// The transport failed to open or carry the call.
    #[error("Transport error: {context}")]
    Transport { context: String },

    /// No handler registered for the method path.
    #[error("Unknown method: {path}")]
    UnknownMethod { path: String },

    /// A handler is already registered for the method path.
    #[error("Method already registered: {path}")]
    DuplicateMethod { path: String },

    /// The method was invoked with a call pattern it was not declared with.
    #[error("Method {path} is not a {expected} method")]
    PatternMismatch { path: String, expected: &'static str },

    /// The dispatch loop is shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Terminated(status) => status,
            Error::UnknownMethod { path } => Status::not_found(format!("Unknown method: {path}")),
            Error::ServiceShutdown => Status::cancelled("Service is shutting down"),
            err @ (Error::ChannelClosed
            | Error::Decode { .. }
            | Error::Transport { .. }
            | Error::DuplicateMethod { .. }
            | Error::PatternMismatch { .. }) => Status::internal(err.to_string()),
        }
    }
}

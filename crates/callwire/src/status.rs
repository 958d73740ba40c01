//! Terminal call outcomes.
//!
//! A [`Status`] pairs a [`Code`] from a fixed, closed enumeration with a
//! human-readable message. Every call resolves to exactly one status, produced
//! either by the handler or by the engine (whichever finishes first), and both
//! ends of the call observe the same value.
//!
//! This module is also the translator between handler outcomes and statuses:
//!
//! - Domain validation failures are built by handlers with the dedicated
//!   constructors (e.g. [`Status::invalid_argument`]).
//! - Infrastructure faults arrive as [`crate::Error`] and convert through
//!   `From<Error> for Status`.
//! - Panics and foreign errors map through [`Status::from_join_error`] and
//!   [`Status::from_error`].
//! - On the wire, codes travel as `i32` using the gRPC numbering.

use core::fmt;
use tokio::task::JoinError;

/// The closed set of status codes surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    /// The call completed successfully.
    Ok,
    /// The call was cancelled, typically by the caller.
    Cancelled,
    /// An error that fits no other code.
    Unknown,
    /// The caller supplied an invalid argument.
    InvalidArgument,
    /// The call deadline expired before a terminal status was produced.
    DeadlineExceeded,
    /// No handler is registered for the requested method.
    NotFound,
    /// An invariant of the engine or transport was broken.
    Internal,
}

impl Code {
    /// Returns the gRPC wire number for this code.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::Internal => 13,
        }
    }

    /// Decodes a wire number. Numbers outside the enumeration become
    /// [`Code::Unknown`].
    pub const fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            13 => Self::Internal,
            _ => Self::Unknown,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "The operation completed successfully",
            Self::Cancelled => "The operation was cancelled",
            Self::Unknown => "Unknown error",
            Self::InvalidArgument => "Client specified an invalid argument",
            Self::DeadlineExceeded => "Deadline expired before operation could complete",
            Self::NotFound => "Requested entity was not found",
            Self::Internal => "Internal error",
        }
    }
}

impl From<i32> for Code {
    fn from(value: i32) -> Self {
        Self::from_i32(value)
    }
}

impl From<Code> for i32 {
    fn from(code: Code) -> Self {
        code.as_i32()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The single, immutable outcome of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Code::Unknown, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Maps an arbitrary error raised outside the engine to [`Code::Unknown`].
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(status) = err.downcast_ref::<Self>() {
            return status.clone();
        }
        Self::unknown(err.to_string())
    }

    /// Converts a failed handler task into a status.
    ///
    /// A panic becomes [`Code::Internal`] carrying the panic message when it
    /// is a string; an aborted task becomes [`Code::Cancelled`].
    pub fn from_join_error(err: JoinError) -> Self {
        if err.is_cancelled() {
            return Self::cancelled("handler task was aborted");
        }

        let payload = err.into_panic();
        let reason = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        Self::internal(format!("handler panicked: {reason}"))
    }

    pub const fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self.code, Code::Ok)
    }

    /// `Ok(())` for an OK status, otherwise the status itself as the error.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {:?}, message: {:?}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

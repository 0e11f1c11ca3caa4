//! Error types for parley
//!
//! Two layers of errors live here:
//!
//! - **Error**: the local error taxonomy shared by client and server (thiserror)
//! - **ErrorObject**: the `{ code, message }` object carried in a response envelope
//!
//! # Wire codes
//!
//! Only a handful of codes ever cross the socket:
//! - `-32700`: parse error (malformed envelope)
//! - `-32601`: method not found
//! - `-32602`: invalid params (typed handlers that could not decode `params`)
//! - `-32000`: handler failure
//!
//! Client-side conditions such as timeouts or cancellation never leave the
//! process; they surface as `Error` variants to the caller of `call()`.
//!
//! # Examples
//!
//! ```rust
//! use parley_core::{Error, ErrorObject};
//!
//! let err = Error::MethodNotFound("unknownMethod".into());
//! let wire: ErrorObject = err.to_error_object();
//! assert_eq!(wire.code, -32601);
//! assert_eq!(wire.message, "method not found");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RequestId;

/// Result type for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Parse error: the envelope was not valid JSON or lacked required fields
pub const PARSE_ERROR: i32 = -32700;
/// The requested method has no registered handler
pub const METHOD_NOT_FOUND: i32 = -32601;
/// The handler rejected its `params`
pub const INVALID_PARAMS: i32 = -32602;
/// The handler ran and failed
pub const HANDLER_ERROR: i32 = -32000;

/// Error taxonomy for parley operations
///
/// # Error Categories
///
/// - **Connection errors**: ConnectionTimeout, NotConnected
/// - **Call outcomes**: RequestTimeout, Remote, Cancelled, Backpressure
/// - **Dispatch errors**: Parse, MethodNotFound, InvalidParams, Handler
/// - **Plumbing**: Serialization, WebSocket, Io, Internal
///
/// Dispatch errors are converted into an [`ErrorObject`] with
/// [`Error::to_error_object`] before being written to the socket.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The transport handshake did not complete within the connect window
    #[error("connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    /// A call was attempted while the connection is not open
    #[error("not connected")]
    NotConnected,

    /// No matching response arrived within the request timeout
    #[error("request timed out")]
    RequestTimeout,

    /// The server answered the call with an error object
    ///
    /// This variant holds errors exactly as received from the peer; the
    /// code and message are preserved.
    #[error("remote error: {0}")]
    Remote(ErrorObject),

    /// The call was abandoned because the client was closed
    #[error("request cancelled")]
    Cancelled,

    /// Too many requests are in flight for this client
    #[error("too many pending requests (limit={limit})")]
    Backpressure {
        /// The configured in-flight limit
        limit: usize,
    },

    /// The inbound envelope could not be parsed
    ///
    /// `id` is kept when it could still be extracted from the payload so
    /// that the error response can be correlated by the caller.
    #[error("parse error: {reason}")]
    Parse {
        /// Id recovered from the malformed envelope, if any
        id: Option<RequestId>,
        /// Why parsing failed
        reason: String,
    },

    /// No handler registered for the requested method
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The method exists but rejected its parameters
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// A handler failed while executing
    #[error("handler error: {0}")]
    Handler(String),

    /// Serialization or deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// WebSocket transport layer error
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Input/output error
    #[error("io error: {0}")]
    Io(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert this error into the object written to the wire
    ///
    /// `Remote` passes through untouched. `Parse`, `MethodNotFound` and
    /// `InvalidParams` map to their reserved codes. Everything else is a
    /// handler failure (`-32000`) carrying the error's message.
    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            Error::Remote(obj) => obj.clone(),
            Error::Parse { .. } => ErrorObject::parse_error(),
            Error::MethodNotFound(_) => ErrorObject::method_not_found(),
            Error::InvalidParams(msg) => ErrorObject::invalid_params(msg.clone()),
            Error::Handler(msg) => ErrorObject::handler_error(msg.clone()),
            other => ErrorObject::handler_error(other.to_string()),
        }
    }

    /// Returns true when the error terminated a call without a response
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::ConnectionTimeout(_)
                | Error::NotConnected
                | Error::RequestTimeout
                | Error::Cancelled
                | Error::Backpressure { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Error object carried in the `error` field of a response envelope
///
/// # Examples
///
/// ```rust
/// use parley_core::ErrorObject;
/// use serde_json::json;
///
/// let err = ErrorObject::handler_error("model unavailable");
/// assert_eq!(err.code, -32000);
///
/// let custom = ErrorObject::with_data(4001, "quota exceeded", json!({"retryAfter": 30}));
/// assert!(custom.data.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code
    pub code: i32,

    /// Short human-readable description
    pub message: String,

    /// Optional structured context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorObject {
    /// Create an error object with an arbitrary code
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error object with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// `-32700 parse error`
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "parse error")
    }

    /// `-32601 method not found`
    ///
    /// The message is fixed; the method name is not echoed back.
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "method not found")
    }

    /// `-32602` with the decoding failure as message
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, msg)
    }

    /// `-32000` with the handler's failure message
    pub fn handler_error(msg: impl Into<String>) -> Self {
        Self::new(HANDLER_ERROR, msg)
    }
}

impl std::fmt::Display for ErrorObject {
    /// Formats as "[code] message", e.g. "[-32601] method not found"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorObject {}

//! Wire types for parley socket RPC
//!
//! Every frame on the socket is one JSON envelope:
//!
//! ```text
//! Request:  { "id": "<uuid>", "method": "<name>", "params": <any-json> }
//! Response: { "id": "<uuid>", "result": <any-json> }
//!        or { "id": "<uuid>", "error": { "code": <int>, "message": "<string>" } }
//! ```
//!
//! A response carries exactly one of `result` or `error`. Fields the protocol
//! does not know about (a `jsonrpc` version marker, for instance) are ignored
//! on input and never produced on output.
//!
//! # Request IDs
//!
//! Ids are opaque strings. The client generates a fresh UUID v4 for every
//! call so that ids are unique for the lifetime of a connection and responses
//! can be matched strictly by id, never by arrival order.

use crate::error::ErrorObject;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id shared by a request and its response
///
/// # Examples
///
/// ```rust
/// use parley_core::RequestId;
///
/// let a = RequestId::new_v4();
/// let b = RequestId::new_v4();
/// assert_ne!(a, b);
///
/// let fixed: RequestId = "req-1".into();
/// assert_eq!(fixed.as_str(), "req-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a random UUID v4 id
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A method call sent from client to server
///
/// `params` is passed to the handler untouched; its shape is entirely up to
/// the method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id echoed by the response
    pub id: RequestId,

    /// Name of the method to invoke
    pub method: String,

    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a request with an explicit id
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: RequestId) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// Outcome carried by a response: exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The handler succeeded
    Result(serde_json::Value),
    /// The request failed
    Error(ErrorObject),
}

/// Reply to a request
///
/// `id` is absent only for parse errors where no id could be recovered
/// from the malformed input.
///
/// # Examples
///
/// ```rust
/// use parley_core::{ErrorObject, RequestId, Response};
/// use serde_json::json;
///
/// let ok = Response::success(json!("hello"), RequestId::from("1"));
/// assert!(ok.is_success());
///
/// let parse = Response::error(ErrorObject::parse_error(), None);
/// assert_eq!(
///     serde_json::to_value(&parse).unwrap(),
///     json!({"error": {"code": -32700, "message": "parse error"}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Result or error
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Create a successful response
    pub fn success(result: serde_json::Value, id: RequestId) -> Self {
        Self {
            id: Some(id),
            outcome: Outcome::Result(result),
        }
    }

    /// Create an error response
    pub fn error(error: ErrorObject, id: Option<RequestId>) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// True if the response carries a `result`
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    /// True if the response carries an `error`
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Split into the plain `Result` a caller expects
    pub fn into_result(self) -> std::result::Result<serde_json::Value, ErrorObject> {
        match self.outcome {
            Outcome::Result(value) => Ok(value),
            Outcome::Error(err) => Err(err),
        }
    }
}

/// A classified inbound envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Envelope carrying `method`
    Request(Request),
    /// Envelope carrying `result` or `error`
    Response(Response),
}

impl Message {
    /// Id of the envelope, if it has one
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Request(req) => Some(&req.id),
            Message::Response(resp) => resp.id.as_ref(),
        }
    }
}

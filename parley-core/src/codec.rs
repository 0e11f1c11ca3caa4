//! Codec for parley envelopes
//!
//! Outbound messages are plain serde serialization. Inbound text goes through
//! [`decode`], which classifies the envelope by the fields it carries:
//!
//! - `method` present → [`Message::Request`] (an `id` is then required)
//! - `result` or `error` present → [`Message::Response`]
//! - anything else → [`Error::Parse`]
//!
//! Key presence is checked on the raw JSON object, so `"result": null` is a
//! valid success and not a missing field.
//!
//! # Parse errors
//!
//! When decoding fails after the text was valid JSON, the error still carries
//! the envelope's `id` if it was a string. The dispatcher echoes it back so
//! the caller's pending call resolves instead of timing out.
//!
//! # Examples
//!
//! ```rust
//! use parley_core::{codec, Message};
//!
//! let msg = codec::decode(r#"{"id":"1","method":"chat","params":{"message":"hi"}}"#).unwrap();
//! assert!(matches!(msg, Message::Request(_)));
//!
//! let err = codec::decode(r#"{"id":"9","params":{}}"#).unwrap_err();
//! assert!(matches!(err, parley_core::Error::Parse { id: Some(_), .. }));
//! ```

use crate::error::{Error, ErrorObject, Result};
use crate::types::{Message, Outcome, Request, RequestId, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode and classify one inbound envelope
///
/// # Errors
///
/// Returns `Error::Parse` for invalid JSON, non-object payloads, non-string
/// ids, a request without an id, a response carrying both `result` and
/// `error`, or an envelope carrying neither `method` nor an outcome.
pub fn decode(data: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(data).map_err(|e| parse_failure(None, e))?;

    let mut obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(parse_failure(
                None,
                format!("expected a JSON object, got {}", kind_of(&other)),
            ))
        }
    };

    let id = take_id(&mut obj)?;

    if let Some(method) = obj.remove("method") {
        let method = match method {
            Value::String(m) => m,
            _ => return Err(parse_failure(id, "method must be a string")),
        };
        let id = id.ok_or_else(|| parse_failure(None, "request is missing an id"))?;
        let params = match obj.remove("params") {
            None | Some(Value::Null) => None,
            Some(p) => Some(p),
        };
        return Ok(Message::Request(Request { id, method, params }));
    }

    match (obj.remove("result"), obj.remove("error")) {
        (Some(_), Some(_)) => Err(parse_failure(id, "response carries both result and error")),
        (Some(result), None) => Ok(Message::Response(Response {
            id,
            outcome: Outcome::Result(result),
        })),
        (None, Some(error)) => {
            let error: ErrorObject = serde_json::from_value(error)
                .map_err(|e| parse_failure(id.clone(), format!("malformed error object: {}", e)))?;
            Ok(Message::Response(Response::error(error, id)))
        }
        (None, None) => Err(parse_failure(id, "envelope has neither method nor result/error")),
    }
}

/// Deserialize a JSON value (typically a `result` or `params`) into `T`
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Serialize `T` into a JSON value
pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn take_id(obj: &mut Map<String, Value>) -> Result<Option<RequestId>> {
    match obj.remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(RequestId::from(s))),
        Some(other) => Err(parse_failure(
            None,
            format!("id must be a string, got {}", kind_of(&other)),
        )),
    }
}

fn parse_failure(id: Option<RequestId>, reason: impl ToString) -> Error {
    Error::Parse {
        id,
        reason: reason.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

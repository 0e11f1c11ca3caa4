//! Method handlers
//!
//! A handler turns the `params` of one request into either a result value or
//! an [`Error`]. The dispatcher maps the error onto the wire:
//!
//! - [`Error::InvalidParams`] → `-32602`
//! - [`Error::Remote`] → the carried [`ErrorObject`](parley_core::ErrorObject), untouched
//! - anything else → `-32000` with the error's message
//!
//! # Examples
//!
//! ```rust
//! use parley_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//!
//! let ping = from_fn(|_params| async { Ok(serde_json::json!("pong")) });
//!
//! #[derive(Deserialize)]
//! struct Echo { text: String }
//!
//! let echo = from_typed_fn(|p: Echo| async move { Ok(p.text) });
//! ```

use parley_core::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by [`Handler::handle`]
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Implementation of one RPC method
pub trait Handler: Send + Sync {
    fn handle(&self, params: Option<Value>) -> HandlerResult;
}

/// Handler backed by an async closure over raw JSON
pub struct AsyncHandler<F> {
    func: F,
}

impl<F> AsyncHandler<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Handler for AsyncHandler<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn handle(&self, params: Option<Value>) -> HandlerResult {
        Box::pin((self.func)(params))
    }
}

/// Wrap an async closure taking raw `params`
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Box::new(AsyncHandler::new(func))
}

/// Wrap an async closure taking deserialized params
///
/// Params that do not decode into `P` fail with `-32602` before the closure
/// runs. Absent params decode from `null`, so `()` and `Option<_>` accept them.
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Option<Value>| {
        let func = Arc::clone(&func);
        async move {
            let params: P = serde_json::from_value(params.unwrap_or(Value::Null))
                .map_err(|e| Error::InvalidParams(e.to_string()))?;

            let result = func(params).await?;
            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }
    })
}

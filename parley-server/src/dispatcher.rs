//! Inbound envelope → outbound response
//!
//! Every text frame a connection receives goes through
//! [`Dispatcher::on_message`], which always produces exactly one response:
//!
//! | inbound | response |
//! |---|---|
//! | not JSON, not an object, missing `id` or `method` | `-32700 parse error`, id echoed if it was a string |
//! | a response envelope | `-32700 parse error` with its id |
//! | unregistered method | `-32601 method not found` |
//! | handler `Ok(v)` | `{ id, result: v }` |
//! | handler `Err(e)` | `{ id, error: e.to_error_object() }` |
//! | handler panic | `-32000 handler panicked` |
//!
//! Handlers run on their own task, so a panic is contained to the request
//! that triggered it.

use crate::metrics::ServerMetrics;
use crate::registry::HandlerRegistry;
use parley_core::{codec, Error, ErrorObject, Message, Request, Response};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    metrics: Option<Arc<ServerMetrics>>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Decode `raw` and produce its response
    pub async fn on_message(&self, raw: &str) -> Response {
        let request = match codec::decode(raw) {
            Ok(Message::Request(request)) => request,
            Ok(Message::Response(response)) => {
                tracing::warn!(id = ?response.id, "Received a response envelope, expected a request");
                return self.parse_error(response.id);
            }
            Err(Error::Parse { id, reason }) => {
                tracing::warn!(id = ?id, reason = %reason, "Rejecting malformed envelope");
                return self.parse_error(id);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting undecodable envelope");
                return self.parse_error(None);
            }
        };

        self.dispatch(request).await
    }

    /// Run the handler for an already decoded request
    #[tracing::instrument(skip(self, request), fields(method = %request.method, id = %request.id))]
    pub async fn dispatch(&self, request: Request) -> Response {
        let start = Instant::now();
        let Request { id, method, params } = request;

        let Some(handler) = self.registry.get(&method) else {
            tracing::debug!("Method not found");
            self.record(&method, "not_found", start);
            return Response::error(Error::MethodNotFound(method).to_error_object(), Some(id));
        };

        let outcome = match tokio::spawn(async move { handler.handle(params).await }).await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => Err(Error::Handler("handler panicked".to_string())),
            Err(_) => Err(Error::Handler("handler cancelled".to_string())),
        };

        match outcome {
            Ok(result) => {
                self.record(&method, "success", start);
                Response::success(result, id)
            }
            Err(e) => {
                let error = e.to_error_object();
                tracing::info!(code = error.code, error = %e, "Handler failed");
                self.record(&method, "error", start);
                Response::error(error, Some(id))
            }
        }
    }

    fn parse_error(&self, id: Option<parley_core::RequestId>) -> Response {
        if let Some(ref m) = self.metrics {
            m.record_parse_error();
        }
        Response::error(ErrorObject::parse_error(), id)
    }

    fn record(&self, method: &str, status: &str, start: Instant) {
        if let Some(ref m) = self.metrics {
            m.record_request(method, status, start.elapsed().as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{from_fn, from_typed_fn};
    use crate::registry::RegistryBuilder;
    use parley_core::{Outcome, RequestId};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::time::Duration;

    #[derive(Deserialize)]
    struct ChatIn {
        message: String,
    }

    fn dispatcher() -> Dispatcher {
        let registry = RegistryBuilder::new()
            .handler(
                "chat",
                from_typed_fn(|p: ChatIn| async move {
                    Ok(if p.message == "hi" { "hello".to_string() } else { p.message })
                }),
            )
            .handler("fail", from_fn(|_| async { Err(Error::Handler("generator unavailable".into())) }))
            .handler(
                "boom",
                from_fn(|_| async {
                    if true {
                        panic!("handler blew up");
                    }
                    Ok(Value::Null)
                }),
            )
            .handler(
                "sleep",
                from_fn(|params| async move {
                    let ms = params.and_then(|p| p["ms"].as_u64()).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(json!(ms))
                }),
            )
            .build();
        Dispatcher::new(registry)
    }

    fn error_of(response: &Response) -> &ErrorObject {
        match &response.outcome {
            Outcome::Error(err) => err,
            Outcome::Result(v) => panic!("Expected error, got result {}", v),
        }
    }

    #[tokio::test]
    async fn test_success() {
        let response = dispatcher()
            .on_message(r#"{"id":"1","method":"chat","params":{"message":"hi"}}"#)
            .await;

        assert_eq!(response, Response::success(json!("hello"), RequestId::from("1")));
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error_without_id() {
        let response = dispatcher().on_message("{not json").await;

        assert_eq!(response.id, None);
        assert_eq!(error_of(&response), &ErrorObject::parse_error());
        assert_eq!(error_of(&response).code, -32700);
    }

    #[tokio::test]
    async fn test_missing_method_echoes_id() {
        let response = dispatcher().on_message(r#"{"id":"7","params":{}}"#).await;

        assert_eq!(response.id, Some(RequestId::from("7")));
        assert_eq!(error_of(&response).code, -32700);
        assert_eq!(error_of(&response).message, "parse error");
    }

    #[tokio::test]
    async fn test_missing_id_is_parse_error() {
        let response = dispatcher().on_message(r#"{"method":"chat","params":{"message":"hi"}}"#).await;

        assert_eq!(response.id, None);
        assert_eq!(error_of(&response).code, -32700);
    }

    #[tokio::test]
    async fn test_response_envelope_is_rejected() {
        let response = dispatcher().on_message(r#"{"id":"3","result":1}"#).await;

        assert_eq!(response.id, Some(RequestId::from("3")));
        assert_eq!(error_of(&response).code, -32700);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = dispatcher().on_message(r#"{"id":"2","method":"deleteEverything"}"#).await;

        assert_eq!(response.id, Some(RequestId::from("2")));
        assert_eq!(error_of(&response), &ErrorObject::new(-32601, "method not found"));
        assert!(!error_of(&response).message.contains("deleteEverything"));
    }

    #[tokio::test]
    async fn test_handler_failure() {
        let response = dispatcher().on_message(r#"{"id":"4","method":"fail"}"#).await;

        assert_eq!(response.id, Some(RequestId::from("4")));
        assert_eq!(error_of(&response), &ErrorObject::new(-32000, "generator unavailable"));
    }

    #[tokio::test]
    async fn test_bad_params_are_invalid_params() {
        let response = dispatcher().on_message(r#"{"id":"5","method":"chat","params":{"text":1}}"#).await;

        assert_eq!(error_of(&response).code, -32602);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let dispatcher = dispatcher();

        let response = dispatcher.on_message(r#"{"id":"6","method":"boom"}"#).await;
        assert_eq!(response.id, Some(RequestId::from("6")));
        assert_eq!(error_of(&response), &ErrorObject::new(-32000, "handler panicked"));

        let next = dispatcher
            .on_message(r#"{"id":"8","method":"chat","params":{"message":"again"}}"#)
            .await;
        assert_eq!(next, Response::success(json!("again"), RequestId::from("8")));
    }

    #[tokio::test]
    async fn test_dispatches_run_concurrently() {
        let dispatcher = dispatcher();
        let start = Instant::now();

        let (slow, fast) = tokio::join!(
            dispatcher.on_message(r#"{"id":"a","method":"sleep","params":{"ms":200}}"#),
            dispatcher.on_message(r#"{"id":"b","method":"sleep","params":{"ms":200}}"#)
        );

        assert!(slow.is_success() && fast.is_success());
        assert!(start.elapsed() < Duration::from_millis(390));
    }
}

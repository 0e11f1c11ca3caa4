//! Client ↔ server integration tests
//!
//! A real `ParleyServer` driven through `ParleyClient`.

mod common;

use common::{connect_client, rpc_url, spawn_server, Greeter, Unavailable};
use parley_client::ClientBuilder;
use parley_core::{ChatParams, Error, ScreenAnalysisParams};
use parley_server::{from_fn, ParleyServer};
use serde_json::{json, Value};
use std::time::Duration;

const PNG_URL: &str = "data:image/png;base64,aGk=";

#[tokio::test]
async fn test_chat_handler_result_reaches_caller() {
    let addr = spawn_server(
        ParleyServer::builder().handler("chat", from_fn(|_| async { Ok(json!("hello")) })),
    )
    .await;
    let client = connect_client(addr).await;

    let result = client.call_value("chat", Some(json!({"message": "hi"}))).await.unwrap();
    assert_eq!(result, json!("hello"));

    client.close().await;
}

#[tokio::test]
async fn test_chat_through_generator() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;
    let client = connect_client(addr).await;

    let reply = client.chat(ChatParams::text("hi")).await.unwrap();
    assert_eq!(reply.message, "hello");
    assert!(reply.timestamp.ends_with('Z'));

    let reply = client.chat(ChatParams::text("look").with_image(PNG_URL)).await.unwrap();
    assert_eq!(reply.message, "echo: look [1 image(s), image/png]");

    client.close().await;
}

#[tokio::test]
async fn test_screen_analysis_through_generator() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;
    let client = connect_client(addr).await;

    let reply = client
        .analyze_screen(ScreenAnalysisParams {
            message: "what is this?".into(),
            image: PNG_URL.into(),
            metadata: Some(json!({"source": "window"})),
        })
        .await
        .unwrap();
    assert_eq!(reply.message, "echo: what is this? [1 image(s), image/png]");

    client.close().await;
}

#[tokio::test]
async fn test_unknown_method() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;
    let client = connect_client(addr).await;

    match client.call_value("translate", Some(json!({}))).await {
        Err(Error::Remote(err)) => {
            assert_eq!(err.code, -32601);
            assert_eq!(err.message, "method not found");
        }
        other => panic!("Expected method not found, got {:?}", other),
    }

    client.close().await;
}

#[tokio::test]
async fn test_generator_failure() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Unavailable)).await;
    let client = connect_client(addr).await;

    match client.chat(ChatParams::text("hi")).await {
        Err(Error::Remote(err)) => {
            assert_eq!(err.code, -32000);
            assert_eq!(err.message, "generator unavailable");
        }
        other => panic!("Expected handler error, got {:?}", other),
    }

    client.close().await;
}

#[tokio::test]
async fn test_invalid_image_is_invalid_params() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;
    let client = connect_client(addr).await;

    let result = client.chat(ChatParams::text("look").with_image("https://example.com/cat.png")).await;
    assert!(matches!(result, Err(Error::Remote(ref err)) if err.code == -32602));

    let result = client.call_value("chat", Some(json!({"images": []}))).await;
    assert!(matches!(result, Err(Error::Remote(ref err)) if err.code == -32602));

    client.close().await;
}

#[tokio::test]
async fn test_panicking_handler_keeps_session() {
    let addr = spawn_server(
        ParleyServer::builder()
            .handler(
                "boom",
                from_fn(|_| async {
                    if true {
                        panic!("handler blew up");
                    }
                    Ok(Value::Null)
                }),
            )
            .handler("ping", from_fn(|_| async { Ok(json!("pong")) })),
    )
    .await;
    let client = connect_client(addr).await;

    match client.call_value("boom", None).await {
        Err(Error::Remote(err)) => assert_eq!(err.code, -32000),
        other => panic!("Expected handler error, got {:?}", other),
    }
    assert!(client.is_connected());
    assert_eq!(client.call_value("ping", None).await.unwrap(), json!("pong"));

    client.close().await;
}

#[tokio::test]
async fn test_concurrent_calls_resolve_independently() {
    let addr = spawn_server(ParleyServer::builder().handler(
        "sleep",
        from_fn(|params| async move {
            let ms = params.and_then(|p| p["ms"].as_u64()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!(ms))
        }),
    ))
    .await;
    let client = connect_client(addr).await;

    let calls = [300u64, 10, 150, 0].map(|ms| client.call_value("sleep", Some(json!({"ms": ms}))));
    let results = futures::future::join_all(calls).await;

    let values: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(values, vec![json!(300), json!(10), json!(150), json!(0)]);

    client.close().await;
}

#[tokio::test]
async fn test_wrong_path_is_rejected() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;

    let client = ClientBuilder::new(format!("ws://{}/api/ws", addr))
        .without_reconnect()
        .build();
    assert!(matches!(client.connect().await, Err(Error::WebSocket(_))));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_custom_path() {
    let addr = spawn_server(ParleyServer::builder().path("/api/ws").with_generator(Greeter)).await;

    let client = ClientBuilder::new(format!("ws://{}/api/ws", addr))
        .without_reconnect()
        .connect()
        .await
        .unwrap();
    assert_eq!(client.chat(ChatParams::text("hi")).await.unwrap().message, "hello");
    client.close().await;

    let default_path = ClientBuilder::new(rpc_url(addr)).without_reconnect().build();
    assert!(default_path.connect().await.is_err());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let addr = spawn_server(ParleyServer::builder().with_generator(Greeter)).await;

    let first = connect_client(addr).await;
    let second = connect_client(addr).await;

    first.close().await;
    assert_eq!(second.chat(ChatParams::text("hi")).await.unwrap().message, "hello");

    let third = connect_client(addr).await;
    assert_eq!(third.chat(ChatParams::text("again")).await.unwrap().message, "echo: again");

    second.close().await;
    third.close().await;
}

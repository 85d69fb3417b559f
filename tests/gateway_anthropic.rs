use std::time::Duration;

use ideaforge::gateway::anthropic::AnthropicAdapter;
use ideaforge::gateway::openai::ChatProvider;
use ideaforge::gateway::{
    Attribution, ChatModel, ChatRequest, FinishReason, Message, ProviderError,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn anthropic_parses_content_blocks_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "Title: Refined idea\n" },
                { "type": "text", "text": "Description: better" }
            ],
            "usage": { "input_tokens": 12, "output_tokens": 34 },
            "stop_reason": "end_turn"
        })))
        .mount(&server)
        .await;

    let adapter =
        AnthropicAdapter::with_config("sk-ant", server.uri(), Duration::from_secs(5)).unwrap();

    let req = ChatRequest::new(
        ChatModel::anthropic("claude-3-haiku-20240307"),
        vec![Message::system("You are an editor."), Message::user("hi")],
        Attribution::new("test"),
    )
    .max_tokens(4000);

    let resp = adapter.chat(&req).await.unwrap();
    assert_eq!(resp.text(), "Title: Refined idea\nDescription: better");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 12);
    assert_eq!(resp.output_tokens, 34);
}

#[tokio::test]
async fn anthropic_lifts_system_message_to_top_level_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "ok" }],
            "usage": { "input_tokens": 1, "output_tokens": 1 },
            "stop_reason": "end_turn"
        })))
        .mount(&server)
        .await;

    let adapter =
        AnthropicAdapter::with_config("sk-ant", server.uri(), Duration::from_secs(5)).unwrap();

    let req = ChatRequest::new(
        ChatModel::anthropic("claude-3-haiku-20240307"),
        vec![Message::system("You are an editor."), Message::user("hi")],
        Attribution::new("test"),
    );
    adapter.chat(&req).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["system"], json!("You are an editor."));
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], json!("user"));
}

#[tokio::test]
async fn anthropic_rejects_multi_sample_requests_before_any_network_call() {
    let server = MockServer::start().await;

    let adapter =
        AnthropicAdapter::with_config("sk-ant", server.uri(), Duration::from_secs(5)).unwrap();

    let req = ChatRequest::new(
        ChatModel::anthropic("claude-3-haiku-20240307"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    )
    .samples(3);

    let err = adapter.chat(&req).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn anthropic_classifies_http_429_as_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "type": "rate_limit_error", "message": "slow down" }
        })))
        .mount(&server)
        .await;

    let adapter =
        AnthropicAdapter::with_config("sk-ant", server.uri(), Duration::from_secs(5)).unwrap();

    let err = adapter
        .chat(&ChatRequest::new(
            ChatModel::anthropic("claude-3-haiku-20240307"),
            vec![Message::user("hi")],
            Attribution::new("test"),
        ))
        .await
        .unwrap_err();
    match err {
        ProviderError::RateLimited { context, .. } => {
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(429));
            assert_eq!(ctx.provider_code.as_deref(), Some("rate_limit_error"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn anthropic_maps_refusal_stop_reason_to_refused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "I can't help with that." }],
            "usage": { "input_tokens": 1, "output_tokens": 1 },
            "stop_reason": "refusal"
        })))
        .mount(&server)
        .await;

    let adapter =
        AnthropicAdapter::with_config("sk-ant", server.uri(), Duration::from_secs(5)).unwrap();

    let err = adapter
        .chat(&ChatRequest::new(
            ChatModel::anthropic("claude-3-haiku-20240307"),
            vec![Message::user("hi")],
            Attribution::new("test"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Refused { .. }));
}

//! HTTP-level tests for the remote embedding and chat clients, against a
//! mock server speaking the OpenAI wire formats.

use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;

use docrag::answer::{AnswerModel, OpenAiChatModel};
use docrag::embedding::{EmbeddingClient, OpenAiEmbeddings};

fn embeddings_client(base_url: String) -> OpenAiEmbeddings {
    OpenAiEmbeddings::new(
        "text-embedding-3-small".to_string(),
        base_url,
        "test-key".to_string(),
        0, // no retries: mock failures should fail fast
        5,
    )
}

#[tokio::test]
async fn embed_sends_batch_and_parses_vectors_in_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{"model": "text-embedding-3-small"}"#);
            then.status(200).json_body(json!({
                "data": [
                    {"index": 0, "embedding": [0.1, 0.2, 0.3]},
                    {"index": 1, "embedding": [0.4, 0.5, 0.6]},
                ]
            }));
        })
        .await;

    let client = embeddings_client(server.base_url());
    let vectors = client
        .embed(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1f32, 0.2, 0.3]);
    assert_eq!(vectors[1], vec![0.4f32, 0.5, 0.6]);
}

#[tokio::test]
async fn embed_client_error_fails_without_retry() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(401)
                .json_body(json!({"error": {"message": "bad key"}}));
        })
        .await;

    let client = embeddings_client(server.base_url());
    let err = client.embed(&["text".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("embedding service failure"));
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn embed_empty_batch_skips_the_network() {
    let server = MockServer::start_async().await;
    let client = embeddings_client(server.base_url());
    let vectors = client.embed(&[]).await.unwrap();
    assert!(vectors.is_empty());
}

#[tokio::test]
async fn complete_returns_trimmed_message_content() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  The answer.  "}}
                ]
            }));
        })
        .await;

    let model = OpenAiChatModel::new(
        "gpt-4.1-mini".to_string(),
        server.base_url(),
        "test-key".to_string(),
        5,
    );
    let answer = model.complete("prompt").await.unwrap();
    assert_eq!(answer, "The answer.");
}

#[tokio::test]
async fn stream_parses_sse_deltas_in_order() {
    let server = MockServer::start_async().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(r#"{"stream": true}"#);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse_body);
        })
        .await;

    let model = OpenAiChatModel::new(
        "gpt-4.1-mini".to_string(),
        server.base_url(),
        "test-key".to_string(),
        5,
    );

    let (tx, mut rx) = mpsc::channel(16);
    model.stream("prompt", tx).await.unwrap();

    let mut tokens = Vec::new();
    while let Some(token) = rx.recv().await {
        tokens.push(token);
    }
    assert_eq!(tokens, vec!["Hel".to_string(), "lo".to_string()]);
}

#[tokio::test]
async fn stream_surfaces_http_errors_before_any_token() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("upstream exploded");
        })
        .await;

    let model = OpenAiChatModel::new(
        "gpt-4.1-mini".to_string(),
        server.base_url(),
        "test-key".to_string(),
        5,
    );

    let (tx, mut rx) = mpsc::channel(16);
    let err = model.stream("prompt", tx).await.unwrap_err();
    assert!(err.to_string().contains("answer service failure"));
    assert!(rx.recv().await.is_none());
}

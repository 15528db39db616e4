//! HTTP clients exercised against wiremock servers standing in for
//! the OpenAI embeddings endpoint and the Anthropic Messages API.

use claude_rag::anthropic::{AnthropicClient, AnthropicConfig};
use claude_rag::embeddings::{Embedding, OpenAiClient, OpenAiConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn openai_client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(OpenAiConfig {
        api_key: "sk-test".to_string(),
        base_url: format!("{}/v1", server.uri()),
        model: "text-embedding-ada-002".to_string(),
    })
}

fn claude_client(server: &MockServer) -> AnthropicClient {
    AnthropicClient::new(AnthropicConfig::new(
        "sk-ant-test".to_string(),
        server.uri(),
        "claude-3-5-sonnet-20241022".to_string(),
    ))
}

#[tokio::test]
async fn embeddings_are_returned_in_input_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-ada-002"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = openai_client(&server);
    let embeddings = client
        .embed_documents(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(
        embeddings,
        vec![
            Embedding { values: vec![1.0, 0.0] },
            Embedding { values: vec![0.0, 1.0] },
        ]
    );
}

/// Embeds "text-N" as `[N]`, listing the results in reverse order
struct NumberedEmbeddings;

impl Respond for NumberedEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let inputs = body["input"].as_array().unwrap();

        let data: Vec<serde_json::Value> = inputs
            .iter()
            .enumerate()
            .rev()
            .map(|(index, input)| {
                let number: f32 = input
                    .as_str()
                    .unwrap()
                    .trim_start_matches("text-")
                    .parse()
                    .unwrap();
                json!({"object": "embedding", "index": index, "embedding": [number]})
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({"object": "list", "data": data}))
    }
}

#[tokio::test]
async fn large_inputs_are_sent_in_batches_of_1000() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(NumberedEmbeddings)
        .expect(2)
        .mount(&server)
        .await;

    let texts: Vec<String> = (0..1001).map(|i| format!("text-{}", i)).collect();
    let embeddings = openai_client(&server).embed_documents(&texts).await.unwrap();

    assert_eq!(embeddings.len(), 1001);
    for (i, embedding) in embeddings.iter().enumerate() {
        assert_eq!(embedding.values, vec![i as f32]);
    }

    let batch_sizes: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            body["input"].as_array().unwrap().len()
        })
        .collect();
    assert_eq!(batch_sizes, vec![1000, 1]);
}

#[tokio::test]
async fn empty_document_list_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let embeddings = openai_client(&server).embed_documents(&[]).await.unwrap();
    assert!(embeddings.is_empty());
}

#[tokio::test]
async fn embeddings_error_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = openai_client(&server)
        .embed_query("hello")
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("401"));
    assert!(err.contains("invalid api key"));
}

#[tokio::test]
async fn claude_answer_is_first_text_block() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 500,
            "messages": [{"role": "user", "content": "What wood do you use?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [{"type": "text", "text": "Mostly white oak."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = claude_client(&server)
        .ask("What wood do you use?")
        .await
        .unwrap();

    assert_eq!(answer, "Mostly white oak.");
}

#[tokio::test]
async fn claude_reply_without_text_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "tool_use", "id": "t1", "name": "lookup", "input": {}}]
        })))
        .mount(&server)
        .await;

    let err = claude_client(&server).ask("hi").await.unwrap_err().to_string();
    assert!(err.contains("No response generated"));
}

#[tokio::test]
async fn claude_skips_non_text_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                {"type": "text", "text": "Open on Saturdays."}
            ]
        })))
        .mount(&server)
        .await;

    let answer = claude_client(&server).ask("hi").await.unwrap();
    assert_eq!(answer, "Open on Saturdays.");
}

#[tokio::test]
async fn claude_http_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = claude_client(&server).ask("hi").await.unwrap_err().to_string();
    assert!(err.contains("overloaded"));
}

#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Generation client error mapping against a mock chat-completions service
// Run with: cargo test --test integration_generation

use documind::config::GenerationConfig;
use documind::generation::{
    GenerationClient, GenerationError, GenerationOptions, Task, build_prompt,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GenerationClient {
    let config = GenerationConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        ..GenerationConfig::default()
    };

    GenerationClient::new(&config)
        .expect("client should build")
        .with_api_key(Some("test-key".to_string()))
        .with_timeout(Duration::from_secs(5))
}

async fn respond_with(template: ResponseTemplate) -> (MockServer, GenerationClient) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(template)
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);
    (server, client)
}

fn classify_request(client: &GenerationClient) -> documind::generation::GenerationRequest {
    client.request(
        build_prompt("Quarterly revenue grew by ten percent.", &Task::Classify),
        GenerationOptions::default(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": GenerationConfig::default().model,
            "max_tokens": 64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "A financial report." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = client.request(
        build_prompt("Quarterly revenue grew by ten percent.", &Task::Classify),
        GenerationOptions {
            temperature: None,
            max_tokens: Some(64),
        },
    );

    assert_eq!(
        client.generate(&request),
        Ok("A financial report.".to_string())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_maps_to_authentication() {
    let (_server, client) = respond_with(ResponseTemplate::new(401)).await;
    let error = client
        .generate(&classify_request(&client))
        .expect_err("401 should fail");

    assert_eq!(error, GenerationError::Authentication);
    assert!(error.user_message().contains("API key"));
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_maps_to_access_denied() {
    let (_server, client) = respond_with(ResponseTemplate::new(403)).await;
    assert_eq!(
        client.generate(&classify_request(&client)),
        Err(GenerationError::AccessDenied)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unprocessable_maps_to_validation() {
    let (_server, client) =
        respond_with(ResponseTemplate::new(422).set_body_string("max_tokens too large")).await;
    assert_eq!(
        client.generate(&classify_request(&client)),
        Err(GenerationError::Validation("max_tokens too large".to_string()))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_maps_to_service_without_retry() {
    let (_server, client) =
        respond_with(ResponseTemplate::new(500).set_body_string("internal")).await;
    assert_eq!(
        client.generate(&classify_request(&client)),
        Err(GenerationError::Service {
            status: 500,
            message: "internal".to_string()
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_choices_map_to_empty_response() {
    let (_server, client) =
        respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] }))).await;
    assert_eq!(
        client.generate(&classify_request(&client)),
        Err(GenerationError::EmptyResponse)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_maps_to_invalid_response() {
    let (_server, client) =
        respond_with(ResponseTemplate::new(200).set_body_string("not json")).await;
    assert!(matches!(
        client.generate(&classify_request(&client)),
        Err(GenerationError::InvalidResponse(_))
    ));
}

//! REST Integration Tests
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use cord_common::RestConfig;
use cord_rest::{MessagesQuery, RestClient, RestError, Route};
use integration_tests::*;
use serde_json::json;

fn config(api: &MockApi) -> RestConfig {
    RestConfig {
        api_base: api.base_url(),
        ..RestConfig::default()
    }
}

fn bot_client(api: &MockApi) -> RestClient {
    RestClient::bot(&config(api), TEST_TOKEN)
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_request_headers() {
    let api = MockApi::start().await.unwrap();
    let client = bot_client(&api);

    let echoed = client.request(Route::get("/echo"), None).await.unwrap().unwrap();

    assert_eq!(echoed["authorization"], "Bot test-token");
    assert_eq!(echoed["user_agent"], "DiscordBot");
    assert_eq!(echoed["content_type"], "application/json");
}

#[tokio::test]
async fn test_request_body() {
    let api = MockApi::start().await.unwrap();
    let client = bot_client(&api);
    let body = json!({"content": "hello", "tts": false});

    let echoed = client
        .request(Route::post("/echo"), Some(&body))
        .await
        .unwrap();

    assert_eq!(echoed, Some(body));
}

#[tokio::test]
async fn test_unreachable_api() {
    let client = RestClient::bot(
        &RestConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            ..RestConfig::default()
        },
        TEST_TOKEN,
    );

    let err = client.get_current_user().await.unwrap_err();
    assert!(matches!(err, RestError::Http(_)));
}

// ============================================================================
// User Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_get_current_user() {
    let api = MockApi::start().await.unwrap();

    let user = bot_client(&api).get_current_user().await.unwrap();

    assert_eq!(user["id"], BOT_USER_ID);
    assert_eq!(user["bot"], true);
}

#[tokio::test]
async fn test_get_current_user_unauthorized() {
    let api = MockApi::start().await.unwrap();
    let client = RestClient::new(&config(&api));

    let err = client.get_current_user().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    match err {
        RestError::Api { body, .. } => assert!(body.contains("Unauthorized")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_get_current_user_guilds() {
    let api = MockApi::start().await.unwrap();

    let guilds = bot_client(&api).get_current_user_guilds().await.unwrap();

    assert_eq!(guilds.as_array().map(Vec::len), Some(1));
    assert_eq!(guilds[0]["id"], "100");
}

// ============================================================================
// Guild Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_get_guild_not_found() {
    let api = MockApi::start().await.unwrap();

    let err = bot_client(&api).get_guild("999", false).await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_guild_channels() {
    let api = MockApi::start().await.unwrap();

    let channels = bot_client(&api).get_guild_channels("100").await.unwrap();

    assert_eq!(channels[0]["name"], "general");
    assert_eq!(channels[0]["guild_id"], "100");
    assert_eq!(channels[1]["type"], 2);
}

// ============================================================================
// Channel Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_create_message() {
    let api = MockApi::start().await.unwrap();

    let message = bot_client(&api)
        .create_message("200", "pong")
        .await
        .unwrap();

    assert_eq!(message["id"], "300");
    assert_eq!(message["channel_id"], "200");
    assert_eq!(message["content"], "pong");
}

#[tokio::test]
async fn test_get_channel_messages_query() {
    let api = MockApi::start().await.unwrap();
    let query = MessagesQuery::before("5").limit(10);

    let echoed = bot_client(&api)
        .get_channel_messages("200", &query)
        .await
        .unwrap();

    assert_eq!(echoed["channel_id"], "200");
    assert_eq!(echoed["query"], json!({"before": "5", "limit": "10"}));
}

#[tokio::test]
async fn test_no_content_responses() {
    let api = MockApi::start().await.unwrap();
    let client = bot_client(&api);

    client.delete_message("200", "300").await.unwrap();
    client.pin_message("200", "300").await.unwrap();

    let raw = client
        .request(Route::delete("/channels/200/messages/300"), None)
        .await
        .unwrap();
    assert_eq!(raw, None);
}

//! Pipeline Notifier Integration Tests
//!
//! Posts status lines to a local mock webhook.

use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;

use pipeline_relay::adapters::SlackWebhook;
use pipeline_relay::config::SlackConfig;
use pipeline_relay::{Handler, HandlerResponse, PipelineNotifier};

fn notifier_for(url: String) -> PipelineNotifier {
    let slack = SlackConfig {
        webhook_url: url,
        channel: "#code-lambda-alerts".to_string(),
        username: "sample-user".to_string(),
    };
    let sink = Arc::new(SlackWebhook::from_config(&slack));
    PipelineNotifier::new(slack, sink)
}

#[tokio::test]
async fn test_posts_status_line() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/services/T05J/B90/abc")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "channel": "#code-lambda-alerts",
            "username": "sample-user",
            "text": "Pipeline Orders-Service has started"
        })))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let notifier = notifier_for(format!("{}/services/T05J/B90/abc", server.url()));
    let resp = notifier
        .handle(json!({
            "version": "0",
            "detail-type": "CodePipeline Pipeline Execution State Change",
            "detail": { "pipeline": "Orders-Service", "state": "STARTED" }
        }))
        .await;

    assert_eq!(resp, HandlerResponse::ok("Event processed successfully"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_is_swallowed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .with_status(404)
        .with_body("no_service")
        .expect(1)
        .create_async()
        .await;

    let notifier = notifier_for(format!("{}/hook", server.url()));
    let resp = notifier
        .handle(json!({ "detail": { "pipeline": "p", "state": "SUCCEEDED" } }))
        .await;

    assert_eq!(resp.status_code, 200);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_webhook_is_swallowed() {
    let notifier = notifier_for("http://127.0.0.1:9/hook".to_string());

    let resp = notifier
        .handle(json!({ "detail": { "pipeline": "p", "state": "FAILED" } }))
        .await;

    assert_eq!(resp.status_code, 200);
}

//! End-to-end runs of the resource verbs with in-memory stdin/stdout.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use slack_notify_core::{FixedClock, Resource, ResourceError, RetryPolicy};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_env() -> HashMap<&'static str, &'static str> {
    [
        ("ATC_EXTERNAL_URL", "https://ci.example.com"),
        ("BUILD_TEAM_NAME", "main"),
        ("BUILD_PIPELINE_NAME", "api"),
        ("BUILD_JOB_NAME", "deploy"),
        ("BUILD_NAME", "17"),
    ]
    .into_iter()
    .collect()
}

fn resource() -> Resource {
    let env = build_env();
    Resource::new()
        .with_clock(FixedClock(1_700_000_000))
        .with_env(move |key| env.get(key).map(|v| v.to_string()))
        .with_retry_policy(RetryPolicy::new([1, 3, 9].map(Duration::from_millis)))
}

fn out_request(api_url: &str, state: &str) -> String {
    json!({
        "source": {
            "state": state,
            "token": "xoxb-test",
            "channel": "#deploys",
            "api_url": api_url
        },
        "version": {},
        "params": {}
    })
    .to_string()
}

async fn run(verb: &str, args: &[&str], stdin: &str) -> (Result<(), ResourceError>, String) {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let mut stdout = Vec::new();
    let result = resource()
        .exec(verb, &args, stdin.as_bytes(), &mut stdout)
        .await;
    (result, String::from_utf8(stdout).expect("utf8 stdout"))
}

#[tokio::test]
async fn test_check_emits_empty_version_list() {
    let (result, stdout) = run("check", &[], "").await;
    assert!(result.is_ok());
    assert_eq!(stdout, r#"{"version":[]}"#);
}

#[tokio::test]
async fn test_in_echoes_timestamp() {
    let (result, stdout) = run(
        "in",
        &["/tmp/build/get"],
        r#"{"source":{},"version":{"timestamp":"42"},"params":{}}"#,
    )
    .await;
    assert!(result.is_ok());
    let body: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body, json!({"version": {"timestamp": "42"}}));
}

#[tokio::test]
async fn test_in_without_timestamp_reports_none() {
    for stdin in [r#"{"version":{"timestamp":""}}"#, r#"{"source":{}}"#] {
        let (result, stdout) = run("in", &["/tmp/dest"], stdin).await;
        assert!(result.is_ok());
        let body: Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(body, json!({"version": {"timestamp": "none"}}));
    }
}

#[tokio::test]
async fn test_malformed_json_writes_nothing() {
    for verb in ["in", "out"] {
        let (result, stdout) = run(verb, &["/tmp/x"], "{not json").await;
        assert!(matches!(result, Err(ResourceError::InvalidRequest(_))));
        assert!(stdout.is_empty());
    }
}

#[tokio::test]
async fn test_unknown_verb() {
    let (result, stdout) = run("deploy", &[], "").await;
    let err = result.unwrap_err();
    assert!(matches!(err, ResourceError::UnknownVerb(_)));
    assert!(err.to_string().contains("check, in, out"));
    assert!(stdout.is_empty());
}

#[tokio::test]
async fn test_out_sends_message_and_reports_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({
            "channel": "#deploys",
            "attachments": [{
                "fallback": "Build #17 api/deploy was a success : \
                    https://ci.example.com/teams/main/pipelines/api/jobs/deploy/builds/17",
                "color": "#2ECC71"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (result, stdout) = run(
        "out",
        &["/tmp/build/put"],
        &out_request(&server.uri(), "success"),
    )
    .await;
    assert!(result.is_ok(), "out failed: {:?}", result.err());

    let body: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["version"], json!({"timestamp": "1700000000"}));
    assert_eq!(
        body["metadata"],
        json!([
            {"name": "channel", "value": "#deploys"},
            {"name": "state", "value": "success"},
            {
                "name": "build_url",
                "value": "https://ci.example.com/teams/main/pipelines/api/jobs/deploy/builds/17"
            },
            {"name": "attempts", "value": "1"}
        ])
    );
}

#[tokio::test]
async fn test_out_params_status_overrides_source_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({"attachments": [{"color": "#E74C3C"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let stdin = json!({
        "source": {"state": "success", "token": "t", "channel": "#c", "api_url": server.uri()},
        "params": {"status": "failure"}
    })
    .to_string();

    let (result, _) = run("out", &["/tmp/put"], &stdin).await;
    assert!(result.is_ok(), "out failed: {:?}", result.err());
}

#[tokio::test]
async fn test_out_fails_after_four_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "invalid_auth"})),
        )
        .expect(4)
        .mount(&server)
        .await;

    let (result, stdout) = run("out", &["/tmp/put"], &out_request(&server.uri(), "failure")).await;

    match result {
        Err(ResourceError::DeliveryFailed { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected DeliveryFailed, got {:?}", other),
    }
    assert!(stdout.is_empty());
}

#[tokio::test]
async fn test_out_via_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let stdin = json!({
        "source": {
            "state": "errored",
            "channel": "#ci",
            "webhook_url": format!("{}/hook", server.uri())
        }
    })
    .to_string();

    let (result, stdout) = run("out", &["/tmp/put"], &stdin).await;
    assert!(result.is_ok(), "out failed: {:?}", result.err());
    let body: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["metadata"][1], json!({"name": "state", "value": "errored"}));
}

use std::time::Duration;

use algoliasearch_client::{
    AttemptOutcome, Client, ClientConfig, Error, ErrorKind, Method, TrafficKind,
};
use algoliasearch_test_fixtures::{MockHost, MockResponse, unreachable_host};
use serde_json::json;

fn test_config(hosts: Vec<String>) -> ClientConfig {
    let mut config = ClientConfig::new("TESTAPP", "test-api-key").with_hosts(hosts);
    config.scheme = "http".to_string();
    config.observability.metrics_enabled = false;
    config
}

fn test_client(hosts: Vec<String>) -> Client {
    Client::from_config(&test_config(hosts)).unwrap()
}

#[tokio::test]
async fn test_unreachable_hosts_fail_over_to_last() {
    let healthy = MockHost::respond(200, r#"{"items":[{"name":"products"}]}"#).await;
    let client = test_client(vec![unreachable_host(), unreachable_host(), healthy.host()]);

    let response = client.list_indexes().await.unwrap();

    assert_eq!(response["items"][0]["name"], "products");
    assert_eq!(healthy.hits(), 1);
    assert_eq!(healthy.requests()[0].path, "/1/indexes");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let rejecting =
        MockHost::respond(400, r#"{"message":"Invalid index name","status":400}"#).await;
    let healthy = MockHost::respond(200, "{}").await;
    let client = test_client(vec![rejecting.host(), healthy.host()]);

    let err = client.list_indexes().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("Invalid index name"));
    assert_eq!(rejecting.hits(), 1);
    assert_eq!(healthy.hits(), 0);
}

#[tokio::test]
async fn test_all_hosts_unreachable() {
    let hosts = vec![unreachable_host(), unreachable_host(), unreachable_host()];
    let client = test_client(hosts.clone());

    let err = client.list_indexes().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Exhausted);
    assert!(err.to_string().contains(&hosts[2]));
    match err {
        Error::Exhausted { attempts, last } => {
            let attempted: Vec<_> = attempts.iter().map(|a| a.host.clone()).collect();
            assert_eq!(attempted, hosts);
            assert!(
                attempts.iter().all(|a| matches!(a.outcome, AttemptOutcome::NetworkError { .. }))
            );
            match *last {
                Error::TransientHost { host, .. } => assert_eq!(host, hosts[2]),
                other => panic!("unexpected last error: {other:?}"),
            }
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_fails_over() {
    let failing = MockHost::respond(503, r#"{"message":"Service unavailable"}"#).await;
    let healthy = MockHost::respond(200, r#"{"nbHits":0,"hits":[]}"#).await;
    let client = test_client(vec![failing.host(), healthy.host()]);

    let response = client.init_index("products").search("phone").await.unwrap();

    assert_eq!(response["nbHits"], 0);
    assert_eq!(failing.hits(), 1);
    assert_eq!(healthy.hits(), 1);
}

#[tokio::test]
async fn test_server_errors_everywhere_surface_last_status() {
    let first = MockHost::respond(500, r#"{"message":"internal"}"#).await;
    let second = MockHost::respond(502, r#"{"message":"bad gateway"}"#).await;
    let client = test_client(vec![first.host(), second.host()]);

    let err = client.list_indexes().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Exhausted);
    assert_eq!(err.status_code(), Some(502));
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn test_slow_host_times_out_and_fails_over() {
    let slow = MockHost::delayed(Duration::from_secs(5), 200, r#"{"from":"slow"}"#).await;
    let healthy = MockHost::respond(200, r#"{"from":"healthy"}"#).await;

    let mut config = test_config(vec![slow.host(), healthy.host()]);
    config.timeouts.connect_ms = 100;
    config.timeouts.read_ms = 300;
    config.timeouts.write_ms = 600;
    let client = Client::from_config(&config).unwrap();

    let response = client.list_indexes().await.unwrap();

    assert_eq!(response["from"], "healthy");
    assert_eq!(slow.hits(), 1);
    assert_eq!(healthy.hits(), 1);
}

#[tokio::test]
async fn test_invalid_json_fails_over() {
    let broken = MockHost::respond(200, "<html>captive portal</html>").await;
    let healthy = MockHost::respond(200, r#"{"ok":true}"#).await;
    let client = test_client(vec![broken.host(), healthy.host()]);

    let response = client.list_indexes().await.unwrap();
    assert_eq!(response["ok"], true);
}

#[tokio::test]
async fn test_recovered_host_answers_next_call() {
    let flaky = MockHost::sequence(vec![
        MockResponse::new(503, r#"{"message":"warming up"}"#),
        MockResponse::json(200, json!({"from": "flaky"})),
    ])
    .await;
    let backup = MockHost::respond(200, r#"{"from":"backup"}"#).await;
    let client = test_client(vec![flaky.host(), backup.host()]);

    assert_eq!(client.list_indexes().await.unwrap()["from"], "backup");
    assert_eq!(client.list_indexes().await.unwrap()["from"], "flaky");
    assert_eq!(flaky.hits(), 2);
    assert_eq!(backup.hits(), 1);
}

#[tokio::test]
async fn test_write_is_resent_to_next_host() {
    let failing = MockHost::respond(500, "{}").await;
    let healthy = MockHost::respond(200, r#"{"taskID":42,"objectIDs":["1"]}"#).await;
    let client = test_client(vec![failing.host(), healthy.host()]);

    let response =
        client.init_index("products").add_objects(&[json!({"objectID": "1"})]).await.unwrap();

    assert_eq!(response["taskID"], 42);
    let first = failing.requests()[0].json();
    let second = healthy.requests()[0].json();
    assert_eq!(first, second);
    assert_eq!(second["requests"][0]["action"], "addObject");
}

#[tokio::test]
async fn test_headers_sent_with_every_request() {
    let host = MockHost::respond(200, "{}").await;
    let config =
        test_config(vec![host.host()]).with_extra_header("X-Algolia-UserToken", "user-42");
    let client = Client::from_config(&config).unwrap();

    client
        .execute(Method::POST, "/1/indexes/products/query", Some(&json!({})), TrafficKind::Read)
        .await
        .unwrap();

    let request = &host.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("x-algolia-application-id"), Some("TESTAPP"));
    assert_eq!(request.header("x-algolia-api-key"), Some("test-api-key"));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-algolia-usertoken"), Some("user-42"));
    assert!(request.header("user-agent").unwrap().starts_with("Algolia for Rust "));
}

#[tokio::test]
async fn test_failing_host_demoted_when_enabled() {
    let healthy = MockHost::respond(200, "{}").await;
    let unreachable = unreachable_host();
    let mut config = test_config(vec![unreachable.clone(), healthy.host()]);
    config.hosts.demote_failing_hosts = true;
    config.hosts.failure_threshold = 1;
    let client = Client::from_config(&config).unwrap();

    client.list_indexes().await.unwrap();

    let order: Vec<_> = client.hosts(TrafficKind::Read).into_iter().map(|h| h.name).collect();
    assert_eq!(order, vec![healthy.host(), unreachable]);
}

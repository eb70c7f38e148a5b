//! Callback transport against a mocked Marathon API.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use marathon_core::events::EventKind;
use marathon_events::{ClusterClient, ClusterError, EventHub, EventsError, EventsListener};
use marathon_settings::{ClusterSettings, EventsSettings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBSCRIPTIONS: &str = "/v2/eventSubscriptions";

const STATUS_UPDATE: &str = r#"{
    "eventType": "status_update_event",
    "timestamp": "2024-05-01T10:00:00.000Z",
    "taskId": "web.1",
    "taskStatus": "TASK_RUNNING",
    "appId": "/web",
    "host": "10.0.0.7",
    "ports": [31000]
}"#;

const DEPLOYMENT_INFO: &str = r#"{
    "eventType": "deployment_info",
    "currentStep": {"actions": [{"action": "ScaleApplication", "app": "/web"}]}
}"#;

fn callback_settings() -> EventsSettings {
    EventsSettings {
        transport: "callback".into(),
        interface: "127.0.0.1".into(),
        port: 0,
        ..EventsSettings::default()
    }
}

fn hub_for(server: &MockServer, events: EventsSettings) -> EventHub {
    let cluster = ClusterClient::new(&ClusterSettings {
        url: server.uri(),
        ..ClusterSettings::default()
    })
    .unwrap();
    EventHub::with_cluster(events, Arc::new(cluster))
}

async fn mount(server: &MockServer, verb: &str, response: ResponseTemplate, expect: u64) {
    Mock::given(method(verb))
        .and(path(SUBSCRIPTIONS))
        .respond_with(response)
        .expect(expect)
        .mount(server)
        .await;
}

fn no_subscriptions() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({"callbackUrls": []}))
}

async fn requests_with(server: &MockServer, verb: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb)
        .collect()
}

async fn next(listener: &mut EventsListener) -> EventKind {
    tokio::time::timeout(Duration::from_secs(5), listener.recv())
        .await
        .expect("no event within 5s")
        .expect("listener closed")
        .kind
}

async fn post_event(url: &str, body: &'static str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(url)
        .body(body)
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn concurrent_attaches_register_once() {
    let server = MockServer::start().await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;

    let hub = hub_for(&server, callback_settings());
    let attaches = (0..8).map(|_| hub.add_events_listener(EventKind::StatusUpdate.id()));
    let listeners = futures::future::join_all(attaches).await;

    assert!(listeners.iter().all(Result::is_ok));
    assert_eq!(hub.listener_count().await, 8);

    let url = hub.subscription_url().await.unwrap();
    let posts = requests_with(&server, "POST").await;
    assert_eq!(posts.len(), 1);
    assert!(
        posts[0]
            .url
            .query_pairs()
            .any(|(k, v)| k == "callbackUrl" && v == url.as_str()),
        "registered {} instead of {url}",
        posts[0].url
    );
}

#[tokio::test]
async fn posted_events_reach_matching_listeners() {
    let server = MockServer::start().await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;

    let hub = hub_for(&server, callback_settings());
    let mut status_only = hub
        .add_events_listener(EventKind::StatusUpdate.id())
        .await
        .unwrap();
    let mut status_and_deploy = hub
        .add_events_listener(EventKind::StatusUpdate.id() | EventKind::DeploymentInfo.id())
        .await
        .unwrap();
    let url = hub.subscription_url().await.unwrap();

    assert_eq!(post_event(&url, STATUS_UPDATE).await, 200);
    assert_eq!(post_event(&url, DEPLOYMENT_INFO).await, 200);

    assert_eq!(next(&mut status_only).await, EventKind::StatusUpdate);
    assert!(status_only.try_recv().is_err());

    assert_eq!(next(&mut status_and_deploy).await, EventKind::StatusUpdate);
    assert_eq!(next(&mut status_and_deploy).await, EventKind::DeploymentInfo);
}

#[tokio::test]
async fn empty_and_invalid_posts_are_acknowledged() {
    let server = MockServer::start().await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;

    let hub = hub_for(&server, callback_settings());
    let mut listener = hub.add_events_listener(u32::MAX).await.unwrap();
    let url = hub.subscription_url().await.unwrap();

    assert_eq!(post_event(&url, "").await, 200);
    assert_eq!(post_event(&url, "{\"eventType\":").await, 200);
    assert_eq!(post_event(&url, r#"{"eventType":"pod_created_event"}"#).await, 200);
    assert!(listener.try_recv().is_err());
}

#[tokio::test]
async fn last_detach_unregisters() {
    let server = MockServer::start().await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;
    mount(&server, "DELETE", ResponseTemplate::new(200), 1).await;

    let hub = hub_for(&server, callback_settings());
    let first = hub.add_events_listener(EventKind::StatusUpdate.id()).await.unwrap();
    let second = hub.add_events_listener(EventKind::AppTerminated.id()).await.unwrap();

    assert!(hub.remove_events_listener(first.id()).await);
    assert!(requests_with(&server, "DELETE").await.is_empty());

    assert!(hub.remove_events_listener(second.id()).await);
    let deletes = requests_with(&server, "DELETE").await;
    assert_eq!(deletes.len(), 1);
    let url = hub.subscription_url().await.unwrap();
    assert!(deletes[0].url.query_pairs().any(|(k, v)| k == "callbackUrl" && v == url.as_str()));
}

#[tokio::test]
async fn unregister_failure_does_not_fail_detach() {
    let server = MockServer::start().await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;
    mount(&server, "DELETE", ResponseTemplate::new(500), 1).await;

    let hub = hub_for(&server, callback_settings());
    let listener = hub.add_events_listener(EventKind::StatusUpdate.id()).await.unwrap();
    assert!(hub.remove_events_listener(listener.id()).await);
    assert_eq!(hub.listener_count().await, 0);
}

#[tokio::test]
async fn registration_failure_is_retried_without_rebinding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SUBSCRIPTIONS))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount(&server, "GET", no_subscriptions(), 1).await;
    mount(&server, "POST", ResponseTemplate::new(200), 1).await;

    let hub = hub_for(&server, callback_settings());
    let err = hub
        .add_events_listener(EventKind::StatusUpdate.id())
        .await
        .unwrap_err();
    assert_matches!(err, EventsError::Cluster(ClusterError::Status { status: 503, .. }));
    assert_eq!(hub.listener_count().await, 0);
    let bound = hub.subscription_url().await;
    assert!(bound.is_some());

    let _listener = hub.add_events_listener(EventKind::StatusUpdate.id()).await.unwrap();
    assert_eq!(hub.subscription_url().await, bound);
}

#[tokio::test]
async fn existing_registration_is_reused() {
    let server = MockServer::start().await;
    mount(
        &server,
        "GET",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "callbackUrls": ["http://lb.example:9000/event"]
        })),
        2,
    )
    .await;
    mount(&server, "POST", ResponseTemplate::new(200), 0).await;

    let hub = hub_for(
        &server,
        EventsSettings {
            callback_url: Some("http://lb.example:9000".into()),
            ..callback_settings()
        },
    );
    let _first = hub.add_events_listener(EventKind::StatusUpdate.id()).await.unwrap();
    let _second = hub.add_events_listener(EventKind::AppTerminated.id()).await.unwrap();
    assert_eq!(requests_with(&server, "GET").await.len(), 1);
    assert!(requests_with(&server, "POST").await.is_empty());

    assert!(hub.has_subscription("http://lb.example:9000/event").await.unwrap());
    assert_eq!(requests_with(&server, "GET").await.len(), 2);
}

#[tokio::test]
async fn unsupported_transport_never_contacts_cluster() {
    let server = MockServer::start().await;
    let hub = hub_for(
        &server,
        EventsSettings {
            transport: "websocket".into(),
            ..callback_settings()
        },
    );

    let err = hub.add_events_listener(EventKind::StatusUpdate.id()).await.unwrap_err();
    assert_matches!(err, EventsError::Configuration { ref transport } if transport == "websocket");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

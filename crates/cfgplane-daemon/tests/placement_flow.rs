//! Create, place and resolve a config through both HTTP surfaces

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cfgplane_daemon::api::{create_router, create_webhook_router};
use cfgplane_daemon::config::DaemonConfig;
use cfgplane_daemon::gates::{AcceptAllValidator, AllowAllAuthorizer, OpenNamespaces};
use cfgplane_daemon::{Components, LoggingInheritanceRegistry, Wiring};
use cfgplane_placement::{
    AgentQueue, ApplyConfigCommand, ApplyConfigReply, DispatchError, InMemoryNodeRegistry, Node,
};
use cfgplane_store::InMemoryKv;
use cfgplane_types::{Config, ManualClock, NodeId, Org};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct CapturingQueue {
    sent: Mutex<Vec<(NodeId, Vec<u8>, String)>>,
}

#[async_trait]
impl AgentQueue for CapturingQueue {
    async fn dispatch(&self, node: &NodeId, command: &[u8], reply_url: &str) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .unwrap()
            .push((node.clone(), command.to_vec(), reply_url.to_string()));
        Ok(())
    }
}

struct Daemon {
    api: Router,
    webhooks: Router,
    queue: Arc<CapturingQueue>,
    clock: Arc<ManualClock>,
}

fn daemon() -> Daemon {
    let registry = InMemoryNodeRegistry::new();
    registry.register(&Org::new("acme"), Node::new("node-a").with_label("zone", "eu"));
    registry.register(&Org::new("acme"), Node::new("node-b").with_label("zone", "us"));
    registry.register(&Org::new("globex"), Node::new("node-z"));

    let queue = Arc::new(CapturingQueue::default());
    let clock = Arc::new(ManualClock::new(1_700_000_000));

    let mut config = DaemonConfig::default();
    config.placement.webhook_base_url = "http://cp.internal:8091".to_string();

    let wiring = Wiring {
        kv: Arc::new(InMemoryKv::new()),
        registry: Arc::new(registry),
        queue: queue.clone(),
        authorizer: Arc::new(AllowAllAuthorizer),
        validator: Arc::new(AcceptAllValidator),
        namespaces: Arc::new(OpenNamespaces),
        inheritance: Arc::new(LoggingInheritanceRegistry),
        clock: clock.clone(),
    };
    let components = Components::build(&config, wiring);

    Daemon {
        api: create_router(components.api, &config.server),
        webhooks: create_webhook_router(components.webhooks),
        queue,
        clock,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Vec<u8>>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn json_body(value: Value) -> Option<Vec<u8>> {
    Some(value.to_string().into_bytes())
}

const SVC: &str = "/api/v1/standalone/acme/prod/svc/v1";

async fn create_svc(daemon: &Daemon) {
    let (status, _) = call(
        &daemon.api,
        "POST",
        "/api/v1/standalone",
        json_body(json!({
            "config": {
                "meta": {"org": "acme", "namespace": "prod", "version": "v1"},
                "param_set": {"name": "svc", "params": {"replicas": "3"}}
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_gossip_placement_resolved_by_reply() {
    let daemon = daemon();
    create_svc(&daemon).await;

    let (status, placed) = call(
        &daemon.api,
        "POST",
        &format!("{SVC}/place"),
        json_body(json!({"name": "gossip", "percentage": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let tasks = placed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t["status"] == "Accepted"));
    assert!(tasks.iter().all(|t| t["accepted_at"] == 1_700_000_000));

    let sent = daemon.queue.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|(_, _, reply_url)| reply_url == "http://cp.internal:8091/standalone"));

    // The node receives the snapshot taken at placement time
    let command = ApplyConfigCommand::decode(&sent[0].1).unwrap();
    match command.decode_config().unwrap() {
        Config::Standalone(config) => assert_eq!(config.param_set.get("replicas"), Some("3")),
        other => panic!("unexpected artifact: {other:?}"),
    }
    let resolved_task = command.task_id.clone();

    daemon.clock.advance(30);
    let reply = ApplyConfigReply::placed(command).encode().unwrap();
    let (status, _) = call(&daemon.webhooks, "POST", "/standalone", Some(reply.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = call(&daemon.api, "GET", &format!("{SVC}/tasks"), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    for task in listed {
        if task["id"] == resolved_task.as_str() {
            assert_eq!(task["status"], "Placed");
            assert_eq!(task["resolved_at"], 1_700_000_030);
        } else {
            assert_eq!(task["status"], "Accepted");
            assert_eq!(task["resolved_at"], 1_700_000_000);
        }
    }

    // A repeated reply finds the task already resolved
    let (status, body) = call(&daemon.webhooks, "POST", "/standalone", Some(reply)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_query_placement_targets_matching_nodes() {
    let daemon = daemon();
    create_svc(&daemon).await;

    let (status, placed) = call(
        &daemon.api,
        "POST",
        &format!("{SVC}/place"),
        json_body(json!({
            "name": "query",
            "query": [{"label_key": "zone", "should_be": "equal", "value": "eu"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let tasks = placed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["node"], "node-a");
}

#[tokio::test]
async fn test_reply_on_wrong_webhook_is_rejected() {
    let daemon = daemon();
    create_svc(&daemon).await;
    call(
        &daemon.api,
        "POST",
        &format!("{SVC}/place"),
        json_body(json!({"name": "gossip", "percentage": 50})),
    )
    .await;

    let sent = daemon.queue.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let command = ApplyConfigCommand::decode(&sent[0].1).unwrap();
    let reply = ApplyConfigReply::failed(command).encode().unwrap();

    let (status, _) = call(&daemon.webhooks, "POST", "/groups", Some(reply)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = call(&daemon.api, "GET", &format!("{SVC}/tasks"), None).await;
    assert_eq!(listed[0]["status"], "Accepted");
}

#[tokio::test]
async fn test_placing_unknown_config_creates_nothing() {
    let daemon = daemon();
    let (status, _) = call(
        &daemon.api,
        "POST",
        &format!("{SVC}/place"),
        json_body(json!({"name": "gossip", "percentage": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(daemon.queue.sent.lock().unwrap().is_empty());
}

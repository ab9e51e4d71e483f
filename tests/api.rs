use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use interface_zero::config::{AppConfig, DEMO_KEY};
use interface_zero::error::ServiceError;
use interface_zero::gemini::{GeminiClient, GenerationService};
use interface_zero::models::GenerationRequest;
use interface_zero::routes::{router, AppState};

/// Replays canned replies, optionally waiting for a go signal first.
struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ServiceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(ServiceError::Empty))
    }
}

fn scripted(replies: Vec<Result<String, ServiceError>>, gate: Option<Arc<Notify>>) -> Router {
    let service = ScriptedService {
        replies: Mutex::new(replies.into()),
        gate,
    };
    router(AppState::new(Arc::new(service), AppConfig::default()))
}

fn record(component: &str, json_code: &str) -> String {
    json!({
        "className": "Foo",
        "tsCode": "interface Foo { a: number }",
        "jsonCode": json_code,
        "properties": [{"name": "a", "type": "number", "isArray": false, "isNullable": false}],
        "layoutStrategy": "simple-card",
        "reactComponentCode": component,
        "designRationale": "One card per item."
    })
    .to_string()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(app: &Router) -> String {
    let (status, snapshot) = send(app, "POST", "/api/demo", None).await;
    assert_eq!(status, StatusCode::CREATED);
    snapshot["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn well_formed_reply_mounts_with_one_item() {
    let app = scripted(
        vec![Ok(record(
            "export default function Foo({items}){return null}",
            "[{\"a\":1}]",
        ))],
        None,
    );
    let id = create(&app).await;

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "generated");
    assert_eq!(snapshot["step"], 2);
    assert_eq!(snapshot["result"]["className"], "Foo");
    assert_eq!(snapshot["mock_data"], json!([{"a": 1}]));

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["renderer"]["state"], "mounted");

    let (status, panel) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(panel, json!({"status": "live", "html": ""}));
}

#[tokio::test]
async fn fenced_reply_extracts_the_same_record() {
    let bare = record("const GeneratedComponent = ({ items }) => <b>{items.length}</b>;", "[{\"a\":1}]");
    let fenced = format!("Sure! Here you go:\n```json\n{bare}\n```");
    let app = scripted(vec![Ok(bare), Ok(fenced)], None);

    let first = create(&app).await;
    let (_, a) = send(&app, "POST", &format!("/api/demo/{first}/generate"), None).await;
    let second = create(&app).await;
    let (_, b) = send(&app, "POST", &format!("/api/demo/{second}/generate"), None).await;
    assert_eq!(a["result"], b["result"]);
    assert_eq!(a["mock_data"], b["mock_data"]);
}

#[tokio::test]
async fn malformed_mock_data_returns_to_editing_with_banner() {
    let app = scripted(vec![Ok(record("const GeneratedComponent = () => null;", "not json"))], None);
    let id = create(&app).await;

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "editing");
    assert_eq!(snapshot["step"], 1);
    assert_eq!(snapshot["banner"]["kind"], "malformed_mock_data");

    let (_, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/banner/dismiss"), None).await;
    assert_eq!(snapshot["banner"], Value::Null);
}

#[tokio::test]
async fn empty_service_reply_shows_service_banner() {
    let app = scripted(vec![Ok("   ".to_string())], None);
    let id = create(&app).await;
    let (_, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(snapshot["banner"]["kind"], "service");
    assert_eq!(snapshot["banner"]["message"], "API returned an empty response.");
}

#[tokio::test]
async fn missing_component_shows_error_panel() {
    let app = scripted(vec![Ok(record("const helper = 42;", "[]"))], None);
    let id = create(&app).await;
    send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;

    let (status, panel) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(panel["status"], "error");
    assert_eq!(panel["kind"], "component_not_found");
    assert_eq!(panel["title"], "Compilation Warning");
    assert_eq!(
        panel["message"],
        "Could not find a valid React Component in the generated code."
    );
}

#[tokio::test]
async fn resubmitting_replaces_the_compiled_component() {
    let app = scripted(
        vec![
            Ok(record("const GeneratedComponent = () => <p>first</p>;", "[]")),
            Ok(record("const GeneratedComponent = () => <p>second</p>;", "[]")),
        ],
        None,
    );
    let id = create(&app).await;
    send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;
    let (_, panel) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(panel["html"], "<p>first</p>");

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/step/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["renderer"], Value::Null);
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/demo/{id}/source"),
        Some(json!({"source": "public class Foo { public int A { get; set; } }"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(snapshot["state"], "generated");
    send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;
    let (_, panel) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(panel["html"], "<p>second</p>");
}

#[tokio::test]
async fn invalid_transitions_are_conflicts() {
    let app = scripted(vec![], None);
    let id = create(&app).await;

    let (status, body) = send(&app, "POST", &format!("/api/demo/{id}/step/2"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, _) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", &format!("/api/demo/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/demo/{id}/locale"),
        Some(json!({"locale": "fr"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn source_and_locale_edits_show_in_snapshot() {
    let app = scripted(vec![], None);
    let (_, snapshot) = send(&app, "POST", "/api/demo", Some(json!({"locale": "zh"}))).await;
    let id = snapshot["id"].as_str().unwrap().to_string();
    assert_eq!(snapshot["locale"], "zh");
    assert!(snapshot["source"].as_str().unwrap().contains("class GameInfo"));

    let (_, snapshot) = send(
        &app,
        "PUT",
        &format!("/api/demo/{id}/source"),
        Some(json!({"source": "class A {}"})),
    )
    .await;
    assert_eq!(snapshot["source"], "class A {}");

    let (_, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/source/reset"), None).await;
    assert!(snapshot["source"].as_str().unwrap().contains("class GameInfo"));

    let (_, snapshot) = send(
        &app,
        "PUT",
        &format!("/api/demo/{id}/locale"),
        Some(json!({"locale": "en"})),
    )
    .await;
    assert_eq!(snapshot["locale"], "en");
}

async fn wait_for_state(app: &Router, id: &str, state: &str) {
    for _ in 0..1000 {
        let (_, snapshot) = send(app, "GET", &format!("/api/demo/{id}"), None).await;
        if snapshot["state"] == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never reached {state}");
}

#[tokio::test]
async fn second_submit_while_awaiting_is_busy() {
    let gate = Arc::new(Notify::new());
    let app = scripted(
        vec![Ok(record("const GeneratedComponent = () => null;", "[]"))],
        Some(gate.clone()),
    );
    let id = create(&app).await;

    let pending = {
        let app = app.clone();
        let uri = format!("/api/demo/{id}/generate");
        tokio::spawn(async move { send(&app, "POST", &uri, None).await })
    };
    wait_for_state(&app, &id, "awaiting").await;

    let (status, body) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "busy");

    gate.notify_one();
    let (status, snapshot) = pending.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "generated");
}

#[tokio::test]
async fn result_for_closed_session_is_gone() {
    let gate = Arc::new(Notify::new());
    let app = scripted(
        vec![Ok(record("const GeneratedComponent = () => null;", "[]"))],
        Some(gate.clone()),
    );
    let id = create(&app).await;

    let pending = {
        let app = app.clone();
        let uri = format!("/api/demo/{id}/generate");
        tokio::spawn(async move { send(&app, "POST", &uri, None).await })
    };
    wait_for_state(&app, &id, "awaiting").await;

    let (status, _) = send(&app, "DELETE", &format!("/api/demo/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    gate.notify_one();
    let (status, _) = pending.await.unwrap();
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = send(&app, "GET", &format!("/api/demo/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disconnected_generate_request_still_completes() {
    let gate = Arc::new(Notify::new());
    let app = scripted(
        vec![Ok(record("const GeneratedComponent = () => <p>late</p>;", "[]"))],
        Some(gate.clone()),
    );
    let id = create(&app).await;

    let pending = {
        let app = app.clone();
        let uri = format!("/api/demo/{id}/generate");
        tokio::spawn(async move { send(&app, "POST", &uri, None).await })
    };
    wait_for_state(&app, &id, "awaiting").await;
    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    gate.notify_one();
    wait_for_state(&app, &id, "generated").await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/demo/{id}/source"),
        Some(json!({"source": "public class Bar { public int B { get; set; } }"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sessions_do_not_block_each_other_while_compiling() {
    let app = scripted(
        vec![Ok(record(
            "let spin = 0; while (spin < 3e5) { spin++; }\nconst GeneratedComponent = () => <p>{spin}</p>;",
            "[]",
        ))],
        None,
    );
    let busy = create(&app).await;
    let idle = create(&app).await;
    send(&app, "POST", &format!("/api/demo/{busy}/generate"), None).await;

    let compiling = {
        let app = app.clone();
        let uri = format!("/api/demo/{busy}/step/3");
        tokio::spawn(async move { send(&app, "POST", &uri, None).await })
    };
    let (status, snapshot) = send(&app, "GET", &format!("/api/demo/{idle}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "editing");

    let (status, snapshot) = compiling.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["renderer"]["state"], "mounted");
    let (_, panel) = send(&app, "GET", &format!("/api/demo/{busy}/preview"), None).await;
    assert_eq!(panel["html"], "<p>300000</p>");
}

#[tokio::test]
async fn restart_discards_the_result() {
    let app = scripted(vec![Ok(record("const GeneratedComponent = () => null;", "[]"))], None);
    let id = create(&app).await;
    send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/restart"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "editing");
    assert_eq!(snapshot["result"], Value::Null);
    assert_eq!(snapshot["renderer"], Value::Null);
}

#[tokio::test]
async fn demo_mode_runs_the_whole_pipeline_offline() {
    let app = router(AppState::new(
        Arc::new(GeminiClient::new(DEMO_KEY.to_string())),
        AppConfig::default(),
    ));
    let id = create(&app).await;

    let (status, snapshot) = send(&app, "POST", &format!("/api/demo/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["result"]["className"], "GameInfo");
    assert_eq!(snapshot["result"]["layoutStrategy"], "gallery");
    assert_eq!(snapshot["mock_data"].as_array().map(Vec::len), Some(5));

    send(&app, "POST", &format!("/api/demo/{id}/step/3"), None).await;
    let (_, panel) = send(&app, "GET", &format!("/api/demo/{id}/preview"), None).await;
    assert_eq!(panel["status"], "live", "{panel}");
    let html = panel["html"].as_str().unwrap();
    assert!(html.contains("Aurora Game Info"));
    assert!(html.contains("$1,250,000.50"));
    assert!(html.contains("#1001"));
    assert!(html.contains("lucide-play"));
    assert_eq!(html.matches("View Details").count(), 5);
    // The fourth item has no thumbnail and falls back to the placeholder icon.
    assert_eq!(html.matches("<img ").count(), 4);
    assert!(html.contains("lucide-image"));
}

#[tokio::test]
async fn stateless_preview_endpoint() {
    let app = scripted(vec![], None);

    let (status, panel) = send(
        &app,
        "POST",
        "/api/preview",
        Some(json!({
            "code": "```tsx\nexport default function List({ items }: { items: { n: number }[] }) {\n  return <ul>{items.map(i => <li key={i.n}>{i.n * 2}</li>)}</ul>;\n}\n```",
            "jsonCode": "[{\"n\": 1}, {\"n\": 2}]"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(panel, json!({"status": "live", "html": "<ul><li>2</li><li>4</li></ul>"}));

    let (status, panel) = send(
        &app,
        "POST",
        "/api/preview",
        Some(json!({"code": "const App = () => <p>{window.x}</p>;", "data": [{}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(panel["title"], "Runtime Render Error");
    let message = panel["message"].as_str().unwrap();
    assert!(message.starts_with("ReferenceError") && message.contains("window"), "{message}");

    let (status, body) = send(
        &app,
        "POST",
        "/api/preview",
        Some(json!({"code": "const App = () => null;", "jsonCode": "{}"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "malformed_mock_data");

    let (status, _) = send(&app, "POST", "/api/preview", Some(json!({"data": []}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

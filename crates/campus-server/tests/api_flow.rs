use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use campus_db::{create_pool, run_migrations, DbRuntimeSettings};
use campus_server::{app, config::RealtimeConfig, AppState};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

struct TestServer {
    _dir: tempfile::TempDir,
    app: Router,
}

fn setup() -> TestServer {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("campus.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    let realtime = RealtimeConfig {
        poll_interval_ms: 0,
        ..Default::default()
    };
    let state = AppState::new(pool, &realtime).expect("failed to build state");
    TestServer {
        _dir: dir,
        app: app(state),
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

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

/// Registers an account and returns `(token, user_id)`.
async fn register(app: &Router, name: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": format!("{name}@campus.test"),
            "password": "s3cret-pass",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_check_returns_ok() {
    let server = setup();
    let (status, body) = send(&server.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_live_token() {
    let server = setup();
    let (status, body) = send(&server.app, "GET", "/api/notices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_authenticated");

    let (status, _) = send(&server.app, "GET", "/api/notices", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, _) = register(&server.app, "ada", "faculty").await;
    let (status, _) = send(&server.app, "GET", "/api/notices", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&server.app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&server.app, "GET", "/api/notices", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logging in again yields a working token.
    let (status, body) = send(
        &server.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@campus.test", "password": "s3cret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["token"].as_str().unwrap();
    let (status, me) = send(&server.app, "GET", "/api/auth/me", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "faculty");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = setup();
    register(&server.app, "bo", "student").await;
    let (status, body) = send(
        &server.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "bo@campus.test", "password": "nope-nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_authenticated");
}

#[tokio::test]
async fn role_rules_are_enforced_over_http() {
    let server = setup();
    let (prof, _) = register(&server.app, "prof", "faculty").await;
    let (student, _) = register(&server.app, "sam", "student").await;
    let (alum, _) = register(&server.app, "al", "alumni").await;

    let (status, body) = send(
        &server.app,
        "POST",
        "/api/notices",
        Some(&student),
        Some(json!({"title": "Party", "content": "Friday"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    let (status, event) = send(
        &server.app,
        "POST",
        "/api/events",
        Some(&prof),
        Some(json!({
            "title": "Career fair",
            "description": "Meet employers",
            "startDate": "2026-12-01",
            "endDate": "2026-12-01",
            "location": "Gym",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap();

    let (status, joined) = send(
        &server.app,
        "POST",
        &format!("/api/events/{event_id}/participate"),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["participants"].as_array().unwrap().len(), 1);

    let (status, job) = send(
        &server.app,
        "POST",
        "/api/jobs",
        Some(&alum),
        Some(json!({
            "title": "Analyst",
            "company": "Globex",
            "description": "Numbers",
            "requirements": ["SQL"],
            "location": "Remote",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = job["id"].as_str().unwrap();

    let (status, _) = send(
        &server.app,
        "DELETE",
        &format!("/api/jobs/{job_id}"),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &server.app,
        "DELETE",
        &format!("/api/jobs/{job_id}"),
        Some(&alum),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &server.app,
        "DELETE",
        &format!("/api/jobs/{job_id}"),
        Some(&alum),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn messages_reach_recipient_inbox_once() {
    let server = setup();
    let (a, a_id) = register(&server.app, "a", "student").await;
    let (b, b_id) = register(&server.app, "b", "student").await;
    let (c, _) = register(&server.app, "c", "alumni").await;

    let (status, sent) = send(
        &server.app,
        "POST",
        "/api/messages",
        Some(&a),
        Some(json!({
            "receiverId": b_id,
            "content": "notes attached",
            "attachment": {"kind": "pdf", "url": "https://files.test/n.pdf", "name": "n.pdf"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["senderId"], a_id.as_str());
    let sent_id = sent["id"].as_str().unwrap().to_string();

    // Delivery is asynchronous; poll the inbox snapshot briefly.
    let mut inbox = Value::Null;
    for _ in 0..50 {
        let (_, body) = send(&server.app, "GET", "/api/messages", Some(&b), None).await;
        if body.as_array().is_some_and(|m| !m.is_empty()) {
            inbox = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let inbox = inbox.as_array().expect("message never arrived").clone();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["id"], sent_id.as_str());
    assert_eq!(inbox[0]["attachment"]["kind"], "pdf");

    let (_, convo) = send(
        &server.app,
        "GET",
        &format!("/api/messages/conversation/{a_id}"),
        Some(&b),
        None,
    )
    .await;
    assert_eq!(convo.as_array().unwrap().len(), 1);

    let (_, c_inbox) = send(&server.app, "GET", "/api/messages", Some(&c), None).await;
    assert!(c_inbox.as_array().unwrap().is_empty());

    let (status, body) = send(
        &server.app,
        "POST",
        "/api/messages",
        Some(&a),
        Some(json!({"content": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn inbox_stream_sends_snapshot_on_connect() {
    let server = setup();
    let (prof, _) = register(&server.app, "prof", "faculty").await;
    send(
        &server.app,
        "POST",
        "/api/messages",
        Some(&prof),
        Some(json!({"content": "welcome everyone"})),
    )
    .await;

    // A fresh login replays history into the new session's inbox.
    let (_, login) = send(
        &server.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "prof@campus.test", "password": "s3cret-pass"})),
    )
    .await;
    let token = login["token"].as_str().unwrap();

    let response = server
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/events/messages")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut frames = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: inbox"), "unexpected frame: {text}");
    assert!(text.contains("welcome everyone"), "unexpected frame: {text}");
}

//! Integration tests for the authenticated pipeline over real HTTP.
//!
//! A wiremock server stands in for the task API:
//! - TC-I-001: Valid credential passes through
//! - TC-I-002: Expired credential is renewed and the call replayed
//! - TC-I-003: Failed renewal ends the session
//! - TC-I-004: Concurrent expiries share one renewal
//! - TC-I-005: Login stores the issued credential
//! - TC-I-006: Connection error handling

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pomotask::api::{NewTask, TaskClient};
use pomotask::auth::{
    ApiRequest, AuthPipeline, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    PipelineError, ReqwestTransport, SessionSignal,
};
use pomotask::config::ApiConfig;
use pomotask::types::Credential;

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a pipeline against the mock server with an optional stored token.
fn create_pipeline(
    server: &MockServer,
    token: Option<&str>,
) -> AuthPipeline<ReqwestTransport, MemoryCredentialStore> {
    let config = ApiConfig::default().with_base_url(server.uri());
    let transport = ReqwestTransport::new(&config).unwrap();
    let store = match token {
        Some(token) => MemoryCredentialStore::with_credential(Credential::new(token)),
        None => MemoryCredentialStore::new(),
    };
    AuthPipeline::new(Arc::new(transport), Arc::new(store))
}

/// Mounts `GET /tasks` accepting only `token`; anything else gets 401.
async fn mount_tasks_accepting(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .with_priority(10)
        .mount(server)
        .await;
}

fn task_json(task_id: i64, name: &str) -> serde_json::Value {
    json!({
        "task_id": task_id,
        "name": name,
        "description": null,
        "pomodoro_count": 2,
        "category_id": 1,
        "owner_id": 7,
        "created_at": "2024-05-01T09:00:00",
        "updated_at": "2024-05-01T09:00:00"
    })
}

// ============================================================================
// TC-I-001: Valid Credential
// ============================================================================

/// TC-I-001: 有効なトークンはそのまま通過する
#[tokio::test]
async fn test_valid_credential_passes_through() {
    let server = MockServer::start().await;
    mount_tasks_accepting(&server, "good").await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("good"));
    let response = pipeline.execute(ApiRequest::get("/tasks")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "[]");
}

// ============================================================================
// TC-I-002: Renew and Replay
// ============================================================================

/// TC-I-002: 期限切れトークンは更新後に1回だけ再送される
#[tokio::test]
async fn test_expired_credential_is_renewed_and_replayed() {
    let server = MockServer::start().await;
    mount_tasks_accepting(&server, "fresh").await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("stale"));
    let mut signals = pipeline.subscribe();

    let response = pipeline.execute(ApiRequest::get("/tasks")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(pipeline.store().get(), Some(Credential::new("fresh")));
    assert_eq!(signals.try_recv().unwrap(), SessionSignal::Renewed);
}

/// TC-I-002b: 再送時にメソッドとボディが保持される
#[tokio::test]
async fn test_replay_preserves_method_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("Authorization", "Bearer fresh"))
        .and(body_partial_json(json!({"name": "Write", "pomodoro_count": 1})))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_json(3, "Write")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = TaskClient::new(create_pipeline(&server, Some("stale")));
    let task = client.create_task(&NewTask::new("Write")).await.unwrap();

    assert_eq!(task.task_id, 3);
    assert_eq!(task.name, "Write");
}

// ============================================================================
// TC-I-003: Failed Renewal
// ============================================================================

/// TC-I-003: 更新に失敗するとセッション切れになり、トークンが消去される
#[tokio::test]
async fn test_failed_renewal_ends_session() {
    let server = MockServer::start().await;
    mount_tasks_accepting(&server, "never").await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("stale"));
    let mut signals = pipeline.subscribe();

    let err = pipeline.execute(ApiRequest::get("/tasks")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(pipeline.store().get(), None);
    assert_eq!(signals.try_recv().unwrap(), SessionSignal::Expired);
}

/// TC-I-003b: 再送が再び401なら2回目の更新は行わない
#[tokio::test]
async fn test_rejected_replay_does_not_renew_twice() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("stale"));
    let err = pipeline.execute(ApiRequest::get("/tasks")).await.unwrap_err();

    assert!(matches!(err, PipelineError::SessionExpired));
    assert_eq!(pipeline.store().get(), None);
}

/// TC-I-003c: 401以外のエラーはそのまま呼び出し元に返る
#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/tasks/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("good"));
    let err = pipeline
        .execute(ApiRequest::delete("/tasks/99"))
        .await
        .unwrap_err();

    match err {
        PipelineError::Server { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("Task not found"));
        }
        other => panic!("Expected server error, got {other:?}"),
    }
}

// ============================================================================
// TC-I-004: Shared Renewal
// ============================================================================

/// TC-I-004: 同時に期限切れを検出しても更新は1回だけ
#[tokio::test]
async fn test_concurrent_expiries_share_one_renewal() {
    let server = MockServer::start().await;
    mount_tasks_accepting(&server, "fresh").await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh"}))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server, Some("stale"));

    let (a, b, c) = tokio::join!(
        pipeline.execute(ApiRequest::get("/tasks")),
        pipeline.execute(ApiRequest::get("/tasks")),
        pipeline.execute(ApiRequest::get("/tasks")),
    );

    assert_eq!(a.unwrap().status, 200);
    assert_eq!(b.unwrap().status, 200);
    assert_eq!(c.unwrap().status, 200);
    assert_eq!(pipeline.store().get(), Some(Credential::new("fresh")));
}

// ============================================================================
// TC-I-005: Login
// ============================================================================

/// TC-I-005: ログインはフォーム形式で送信し、トークンを保存する
#[tokio::test]
async fn test_login_stores_credential_on_disk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("username=ann&password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"user_id": 7, "username": "ann", "email": "ann@example.com"},
            "access_token": "issued",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_tasks_accepting(&server, "issued").await;

    let dir = tempfile::tempdir().unwrap();
    let credential_path = dir.path().join("credential.json");
    let config = ApiConfig::default().with_base_url(server.uri());
    let pipeline = AuthPipeline::new(
        Arc::new(ReqwestTransport::new(&config).unwrap()),
        Arc::new(FileCredentialStore::open(&credential_path)),
    );
    let client = TaskClient::new(pipeline);
    assert!(!client.is_authenticated());

    let auth = client.login("ann", "s3cret").await.unwrap();
    assert_eq!(auth.user.unwrap().username, "ann");
    assert!(client.is_authenticated());

    // A fresh store on the same file sees the saved token.
    let reopened = FileCredentialStore::open(&credential_path);
    assert_eq!(reopened.get(), Some(Credential::new("issued")));

    let tasks = client.list_tasks().await.unwrap();
    assert!(tasks.is_empty());
}

/// TC-I-005b: ログイン失敗はトークンを保存しない
#[tokio::test]
async fn test_login_rejected_keeps_store_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect username or password"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = TaskClient::new(create_pipeline(&server, None));
    let err = client.login("ann", "wrong").await.unwrap_err();

    assert!(!err.is_session_expired());
    assert!(!client.is_authenticated());
}

// ============================================================================
// TC-I-006: Connection Errors
// ============================================================================

/// TC-I-006: 接続できない場合は転送エラーになり、トークンは保持される
#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let config = ApiConfig::default().with_base_url("http://127.0.0.1:1");
    let pipeline = AuthPipeline::new(
        Arc::new(ReqwestTransport::new(&config).unwrap()),
        Arc::new(MemoryCredentialStore::with_credential(Credential::new("good"))),
    );

    let err = pipeline.execute(ApiRequest::get("/tasks")).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(pipeline.store().get(), Some(Credential::new("good")));
}

//! Integration tests for the API client using wiremock.
//!
//! These tests run the full request path (session, transport, envelope
//! decoding) against a mock CodeClarity server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use codeclarity_core::api::Transport;
use codeclarity_core::auth::{MemoryCredentialStore, TokenPair};
use codeclarity_core::config::{Config, Environment, Overrides};
use codeclarity_core::models::{Analysis, AnalysisCreateRequest, AnalysisStatus};
use codeclarity_core::poller::{self, Outcome};
use codeclarity_core::{ApiClient, ApiError, AuthError, CredentialStore, SessionManager, Settings};

/// Token pair whose access token expires `access_minutes` from now.
fn token_pair(access_minutes: i64) -> TokenPair {
    let now = Utc::now();
    TokenPair {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        access_expiry: now + ChronoDuration::minutes(access_minutes),
        refresh_expiry: now + ChronoDuration::days(7),
        user_id: "u1".to_string(),
        email: "dev@example.com".to_string(),
    }
}

/// Client against `server` backed by an in-memory store holding `tokens`.
fn client_with(server: &MockServer, tokens: Option<TokenPair>) -> (ApiClient, Arc<MemoryCredentialStore>) {
    let store = Arc::new(match tokens {
        Some(tokens) => MemoryCredentialStore::with_tokens(tokens),
        None => MemoryCredentialStore::new(),
    });
    let transport = Transport::new(&server.uri(), false).expect("Failed to build transport");
    let sessions = SessionManager::new(store.clone(), Arc::new(transport.clone()), None);
    (ApiClient::authenticated(transport, sessions), store)
}

fn user_body() -> serde_json::Value {
    json!({
        "status_code": 200,
        "status": "success",
        "data": {
            "id": "u1",
            "email": "dev@example.com",
            "handle": "dev",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "default_org": {"id": "org-1", "name": "Acme"},
            "activated": true
        }
    })
}

fn analysis_body(status: &str, stage: i64) -> serde_json::Value {
    json!({
        "status_code": 200,
        "status": "success",
        "data": {
            "id": "a1",
            "analyzerId": "an1",
            "projectId": "p1",
            "organizationId": "org-1",
            "status": status,
            "stage": stage,
            "branch": "main"
        }
    })
}

#[tokio::test]
async fn test_bearer_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let user = client.current_user().await.unwrap();

    assert_eq!(user.email, "dev@example.com");
    assert_eq!(user.default_org_id(), Some("org-1"));
}

#[tokio::test]
async fn test_login_is_unsigned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .and(body_json(json!({"email": "dev@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 200,
            "status": "success",
            "data": {
                "token": "access-new",
                "refresh_token": "refresh-new",
                "token_expiry": "2030-01-01T00:00:00Z",
                "refresh_token_expiry": "2030-01-08T00:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(&server.uri(), false).unwrap();
    let tokens = ApiClient::new(transport)
        .authenticate("dev@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(tokens.token, "access-new");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_query_string_passes_through_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/org-1/projects"))
        .and(query_param("page", "0"))
        .and(query_param("entries_per_page", "20"))
        .and(query_param("search_key", "my repo/core"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 200,
            "status": "success",
            "data": [{"id": "p1", "name": "core", "type": "VCS"}],
            "page": 0,
            "entry_count": 1,
            "entries_per_page": 20,
            "total_entries": 1,
            "total_pages": 1,
            "matching_count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let page = client
        .list_projects("org-1", 0, 20, Some("my repo/core"))
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].project_type, "VCS");
    assert_eq!(page.total_entries, 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].url.query(),
        Some("page=0&entries_per_page=20&search_key=my+repo%2Fcore")
    );
}

#[tokio::test]
async fn test_results_default_workspace() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/org-1/projects/p1/analysis/a1/sbom/stats"))
        .and(query_param("workspace", "."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 200,
            "status": "success",
            "data": {"number_of_dependencies": 120, "number_of_direct_dependencies": 14, "number_of_transitive_dependencies": 106}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let stats = client.sbom_stats("org-1", "p1", "a1", None).await.unwrap();
    assert_eq!(stats.total_dependencies, 120);
    assert_eq!(stats.direct_dependencies, 14);
}

#[tokio::test]
async fn test_structured_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/org-1/projects/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status_code": 404,
            "status": "failure",
            "error_code": "EntityNotFound",
            "message": "Project not found"
        })))
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let err = client.get_project("org-1", "missing").await.unwrap_err();

    match err {
        ApiError::Api(body) => {
            assert_eq!(body.status_code, 404);
            assert_eq!(body.error_code.as_deref(), Some("EntityNotFound"));
            assert_eq!(body.message.as_deref(), Some("Project not found"));
        }
        other => panic!("expected structured API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_raw_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/org-1/analyzers/x"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let err = client.get_analyzer("org-1", "x").await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Http { status: 502, ref body } if body == "Bad Gateway"
    ));
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status_code": 200,
            "status": "success",
            "data": {
                "token": "access-2",
                "refresh_token": "refresh-2",
                "token_expiry": "2030-01-01T00:00:00Z",
                "refresh_token_expiry": "2030-01-08T00:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(2)
        .mount(&server)
        .await;

    // Two minutes left is inside the refresh buffer.
    let (client, store) = client_with(&server, Some(token_pair(2)));
    client.current_user().await.unwrap();
    client.current_user().await.unwrap();

    let saved = store.load().unwrap();
    assert_eq!(saved.access_token, "access-2");
    assert_eq!(saved.refresh_token, "refresh-2");
    assert_eq!(saved.email, "dev@example.com");
}

#[tokio::test]
async fn test_refresh_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status_code": 401,
            "status": "failure",
            "error_code": "InvalidRefreshToken"
        })))
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, Some(token_pair(-10)));
    let err = client.current_user().await.unwrap_err();

    match err {
        ApiError::Auth(AuthError::RefreshFailed(source)) => assert!(source.is_unauthorized()),
        other => panic!("expected RefreshFailed, got {other:?}"),
    }
    assert_eq!(store.load().unwrap().access_token, "access-1");
}

#[tokio::test]
async fn test_missing_credentials() {
    let server = MockServer::start().await;
    let (client, _) = client_with(&server, None);

    let err = client.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(AuthError::NotAuthenticated)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_environment_key_overrides_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("authorization", "Bearer env-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let flags = Overrides {
        api_url: Some(server.uri()),
        ..Default::default()
    };
    let env = Environment {
        api_key: Some("env-key".to_string()),
        ..Default::default()
    };
    let settings = Settings::resolve(&flags, &env, &Config::default(), PathBuf::from("/nonexistent"));
    let store = Arc::new(MemoryCredentialStore::with_tokens(token_pair(60)));

    let client = ApiClient::from_settings(&settings, store).unwrap();
    client.current_user().await.unwrap();
}

#[tokio::test]
async fn test_start_analysis_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/org/org-1/projects/p1/analyses"))
        .and(body_json(json!({
            "analyzer_id": "an1",
            "config": {},
            "branch": "main",
            "schedule_type": "once",
            "is_active": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status_code": 201,
            "status": "success",
            "data": {"id": "a1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let created = client
        .start_analysis("org-1", "p1", &AnalysisCreateRequest::once("an1", "main"))
        .await
        .unwrap();
    assert_eq!(created.id, "a1");
}

#[tokio::test]
async fn test_watch_analysis_until_completed() {
    let server = MockServer::start().await;
    let analysis_path = "/org/org-1/projects/p1/analyses/a1";
    // Earlier mounts win while they still have uses left.
    Mock::given(method("GET"))
        .and(path(analysis_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body("requested", 0)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(analysis_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body("started", 1)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(analysis_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body("completed", 2)))
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, Some(token_pair(60)));
    let mut seen = Vec::new();

    let outcome = poller::watch(
        || client.get_analysis("org-1", "p1", "a1"),
        Duration::from_millis(10),
        &CancellationToken::new(),
        |analysis: &Analysis| seen.push(analysis.status.clone()),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, Outcome::Succeeded(ref a) if a.stage == 2));
    assert_eq!(
        seen,
        vec![
            AnalysisStatus::Requested,
            AnalysisStatus::Started,
            AnalysisStatus::Completed
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

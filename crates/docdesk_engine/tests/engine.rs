use std::time::{Duration, Instant};

use docdesk_core::model::{QueryRequest, SavedAnalysisDraft};
use docdesk_engine::{ApiError, ApiSettings, EngineEvent, EngineHandle, LocalStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer, temp: &TempDir) -> EngineHandle {
    let settings = ApiSettings::new(&server.uri()).unwrap();
    EngineHandle::new(settings, LocalStore::new(temp.path())).unwrap()
}

async fn next_event(engine: &EngineHandle) -> EngineEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(event) = engine.try_recv() {
            return event;
        }
        assert!(Instant::now() < deadline, "no engine event within 5s");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn query(text: &str) -> QueryRequest {
    QueryRequest {
        document_ids: vec!["a".to_string(), "b".to_string()],
        query: text.to_string(),
        include_patterns: true,
        include_contradictions: true,
    }
}

fn answer(text: &str) -> serde_json::Value {
    json!({"answer": text, "citations": [], "generatedAt": "2024-01-01T00:00:00Z"})
}

#[tokio::test]
async fn cancel_reports_cancelled_without_waiting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cross-document/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(answer("late")),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    let started = Instant::now();
    engine.query(1, query("slow"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel(1);

    match next_event(&engine).await {
        EngineEvent::QueryFinished { request_id, result } => {
            assert_eq!(request_id, 1);
            assert_eq!(result, Err(ApiError::Cancelled));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn second_query_cancels_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cross-document/query"))
        .and(body_partial_json(json!({"query": "first"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(answer("first answer")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cross-document/query"))
        .and(body_partial_json(json!({"query": "second"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("second answer")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.query(1, query("first"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.query(2, query("second"));

    let mut first = None;
    let mut second = None;
    for _ in 0..2 {
        match next_event(&engine).await {
            EngineEvent::QueryFinished { request_id: 1, result } => first = Some(result),
            EngineEvent::QueryFinished { request_id: 2, result } => second = Some(result),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(first, Some(Err(ApiError::Cancelled)));
    assert_eq!(second.unwrap().unwrap().answer, "second answer");
}

#[tokio::test]
async fn comparison_retry_issues_exactly_one_more_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cross-document/compare"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cross-document/compare"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "similarities": ["Both are NDAs"],
            "differences": ["Term length"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    let ids = vec!["a".to_string(), "b".to_string()];

    engine.compare(1, ids.clone());
    match next_event(&engine).await {
        EngineEvent::ComparisonFinished { request_id, result } => {
            assert_eq!(request_id, 1);
            assert!(matches!(result, Err(ApiError::Status { status: 503, .. })));
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.compare(2, ids);
    match next_event(&engine).await {
        EngineEvent::ComparisonFinished { request_id, result } => {
            assert_eq!(request_id, 2);
            assert_eq!(result.unwrap().differences, vec!["Term length".to_string()]);
        }
        other => panic!("unexpected event {other:?}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn catalog_loads_report_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/hierarchy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "name": "Legal"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.load_projects();
    match next_event(&engine).await {
        EngineEvent::ProjectsLoaded(Ok(projects)) => assert_eq!(projects[0].name, "Legal"),
        other => panic!("unexpected event {other:?}"),
    }

    engine.load_documents(Default::default());
    match next_event(&engine).await {
        EngineEvent::DocumentsLoaded(Err(ApiError::Status { status, .. })) => {
            assert_eq!(status, 500)
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn saved_analysis_sync_failure_is_silent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/saved-analyses"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.sync_saved_analysis(SavedAnalysisDraft {
        document_ids: vec!["a".to_string(), "b".to_string()],
        document_names: vec!["A".to_string(), "B".to_string()],
        has_comparison: false,
        has_patterns: false,
        has_contradictions: false,
        has_messages: true,
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(engine.try_recv().is_none());
    server.verify().await;
}

#[tokio::test]
async fn login_and_logout_emit_auth_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok",
            "user": {"id": "u1", "email": "robin@example.test"}
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.login("robin@example.test", "pw");
    match next_event(&engine).await {
        EngineEvent::SignedIn(user) => assert_eq!(user.id, "u1"),
        other => panic!("unexpected event {other:?}"),
    }
    engine.logout();
    assert_eq!(next_event(&engine).await, EngineEvent::SignedOut);
}

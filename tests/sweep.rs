//! End-to-end sweeps against a mock HTTP server with file storage

mod common;

use std::sync::Arc;
use std::time::Duration;

use reqsweep::expand::{FieldSpec, UrlTemplate};
use reqsweep::request::{FilePattern, ResponseRecord};
use reqsweep::types::AxisValue;
use reqsweep::{
    FileStorage, ReqwestTransport, RequestFactory, RequestState, StaticAuth, Sweep, SweepPlan,
};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn paged_factory(server: &MockServer, pages: u32) -> RequestFactory {
    RequestFactory::new(common::url(server, "/items")).param(
        FieldSpec::builder("param")
            .varying("page", AxisValue::list(1..=pages))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn template_sweep_writes_every_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/kinds/[a-c]$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let factory = RequestFactory::new(
        UrlTemplate::new(common::url(&server, "/kinds/{kind}"))
            .arg("kind", AxisValue::list(["a", "b", "c"])),
    );

    let report = Sweep::with_reqwest(factory, common::fast_config(2))
        .unwrap()
        .storage(Arc::new(FileStorage::new(dir.path())))
        .file_path(FilePattern::new("out/{index}.json"))
        .execute()
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 3);
    assert_eq!(report.storage.len(), 3);
    assert!(report.storage.iter().all(|r| r.is_ok()));

    for index in 0..3 {
        let body = std::fs::read_to_string(dir.path().join(format!("out/{index}.json"))).unwrap();
        assert_eq!(body, r#"{"ok":true}"#);
    }
}

#[tokio::test]
async fn stop_response_ends_the_sweep() {
    let server = MockServer::start().await;
    Mock::given(path("/items"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "end" })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = Sweep::with_reqwest(paged_factory(&server, 6), common::fast_config(1))
        .unwrap()
        .storage(Arc::new(FileStorage::new(dir.path())))
        .file_path(FilePattern::new("page-{page}.json"))
        .stop_when(|r: &ResponseRecord| r.status == 404)
        .execute()
        .await
        .unwrap();

    assert!(report.was_stopped());
    assert_eq!(report.completed, 3);
    assert_eq!(report.stopped, 1);
    assert_eq!(report.pending, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);

    for page in 1..=3 {
        assert!(dir.path().join(format!("page-{page}.json")).exists());
    }
    assert!(!dir.path().join("page-4.json").exists());

    let stopped = &report.descriptors[3];
    assert!(matches!(stopped.state(), RequestState::Stopped));
    assert_eq!(stopped.response().unwrap().status, 404);
}

#[tokio::test]
async fn unreadable_body_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(path("/items"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let report = Sweep::with_reqwest(paged_factory(&server, 6), common::fast_config(1))
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 3);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn storage_predicate_filters_writes() {
    let server = MockServer::start().await;
    Mock::given(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = Sweep::with_reqwest(paged_factory(&server, 4), common::fast_config(2))
        .unwrap()
        .storage(Arc::new(FileStorage::new(dir.path())))
        .file_path(FilePattern::new("{page}.json"))
        .store_when(|d: &reqsweep::RequestDescriptor| d.index() % 2 == 0)
        .execute()
        .await
        .unwrap();

    assert_eq!(report.completed, 4);
    assert_eq!(report.storage.len(), 2);
    assert!(dir.path().join("1.json").exists());
    assert!(!dir.path().join("2.json").exists());
    assert!(dir.path().join("3.json").exists());
}

#[tokio::test]
async fn auth_provider_is_sent_with_every_request() {
    let server = MockServer::start().await;
    Mock::given(path("/items"))
        .and(header("authorization", "Bearer secret"))
        .and(query_param("api_key", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let report = Sweep::with_reqwest(paged_factory(&server, 3), common::fast_config(3))
        .unwrap()
        .auth_provider(StaticAuth::new().bearer("secret").param("api_key", "k1"))
        .execute()
        .await
        .unwrap();

    assert_eq!(report.completed, 3);
}

#[tokio::test]
async fn plan_from_json_runs_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/plans/(users|teams)$"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "rows": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let text = serde_json::json!({
        "method": "get",
        "url": {
            "template": common::url(&server, "/plans/{kind}"),
            "args": { "kind": ["users", "teams"] }
        },
        "param": { "static": { "limit": 10 }, "dynamic": { "page": [1, 2] } },
        "header": { "static": { "Accept": "application/json" } },
        "config": {
            "network": { "rate": 0.001, "limit": 2 },
            "collect": true
        }
    })
    .to_string();

    let plan = SweepPlan::from_json(&text).unwrap();
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    let report = Sweep::from_plan(&plan, Arc::new(transport))
        .execute()
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.completed, 2);

    let urls: Vec<&str> = report.descriptors.iter().map(|d| d.url()).collect();
    assert_eq!(
        urls,
        vec![
            common::url(&server, "/plans/users"),
            common::url(&server, "/plans/teams"),
        ]
    );
}

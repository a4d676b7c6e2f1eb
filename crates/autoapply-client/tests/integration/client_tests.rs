use std::collections::HashSet;
use std::sync::Arc;

use autoapply_client::{ListingExtractor, ReqwestListingFetcher, ReqwestSubmitter, build_client};
use autoapply_core::apply::{ApplyService, TracingRunReporter};
use autoapply_core::config::SessionConfig;
use autoapply_core::error::AppError;
use autoapply_core::models::{LogAction, PostingId};
use autoapply_core::throttle::ThrottleConfig;
use autoapply_core::traits::{IdExtractor, Ledger, ListingSource, Submitter};

use crate::integration::common::{LISTING_JSON, MemoryLedger, StubServer, closed_port_url};

fn ids(values: &[&str]) -> HashSet<PostingId> {
    values.iter().map(|v| PostingId::from(*v)).collect()
}

#[tokio::test]
async fn fetch_listing_sends_session_headers_and_decodes_gzip() {
    let stub = StubServer::start().await;
    let fetcher = ReqwestListingFetcher::new(Arc::new(stub.config())).unwrap();

    let payload = fetcher.fetch_listing().await.unwrap();
    let extracted = ListingExtractor.extract(&payload);

    assert_eq!(extracted.ids, ids(&["101", "102", "103"]));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/search");
    assert_eq!(request.header("cookie"), Some("hhtoken=abc; _xsrf=TOKEN123; hhuid=xyz"));
    assert_eq!(request.header("accept"), Some("application/json; charset=utf-8"));
    assert_eq!(request.header("x-requested-with"), Some("XMLHttpRequest"));
    assert!(request.header("accept-encoding").unwrap().contains("gzip"));
    assert!(request.header("user-agent").unwrap().contains("autoapply"));
}

#[tokio::test]
async fn stub_listing_is_sent_gzip_encoded() {
    let stub = StubServer::start().await;
    // Without decompression the wire encoding stays visible.
    let raw = reqwest::Client::builder().no_gzip().build().unwrap();

    let response = raw
        .get(stub.url("/search"))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("content-encoding").and_then(|v| v.to_str().ok()),
        Some("gzip")
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..2], &[0x1f, 0x8b]);
    assert_ne!(&body[..], LISTING_JSON.as_bytes());
}

#[tokio::test]
async fn fetch_listing_non_200_is_http_status_error() {
    let stub = StubServer::start().await;
    let config = SessionConfig {
        search_url: stub.url("/forbidden"),
        ..stub.config()
    };
    let fetcher = ReqwestListingFetcher::new(Arc::new(config)).unwrap();

    let err = fetcher.fetch_listing().await.unwrap_err();

    assert!(matches!(err, AppError::HttpStatus { status: 403, .. }));
}

#[tokio::test]
async fn submit_posts_multipart_form_with_csrf() {
    let stub = StubServer::start().await;
    let config = SessionConfig {
        apply_extra_headers: vec![("X-Client-Build".into(), "42".into())],
        ..stub.config()
    };
    let submitter = ReqwestSubmitter::new(Arc::new(config)).unwrap();

    let outcome = submitter.submit(&PostingId::from("555")).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.status_code, 200);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/apply/ok");
    assert_eq!(request.header("x-xsrftoken"), Some("TOKEN123"));
    assert_eq!(request.header("origin"), Some(stub.base_url.as_str()));
    assert_eq!(
        request.header("referer"),
        Some(format!("{}/vacancy/555", stub.base_url).as_str())
    );
    assert_eq!(request.header("x-client-build"), Some("42"));
    assert_eq!(request.header("accept"), Some("application/json"));

    let content_type = request.header("content-type").unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    let body = request.body_text();
    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    assert!(body.contains("name=\"vacancyId\"\r\n\r\n555\r\n"));
    assert!(body.contains("name=\"resumeHash\"\r\n\r\nresume-1\r\n"));
    assert!(body.contains("name=\"_xsrf\"\r\n\r\nTOKEN123\r\n"));
    assert!(body.contains("name=\"letterRequired\"\r\n\r\nfalse\r\n"));
}

#[tokio::test]
async fn submit_rejection_keeps_status_and_body() {
    let stub = StubServer::start().await;
    let config = SessionConfig {
        apply_url: stub.url("/apply/reject"),
        ..stub.config()
    };
    let submitter = ReqwestSubmitter::new(Arc::new(config)).unwrap();

    let outcome = submitter.submit(&PostingId::from("1")).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.status_code, 403);
    assert_eq!(outcome.message, "forbidden");
}

#[tokio::test]
async fn submit_without_csrf_never_reaches_the_network() {
    let stub = StubServer::start().await;
    let config = SessionConfig {
        cookies: "hhtoken=abc".into(),
        ..stub.config()
    };
    let submitter = ReqwestSubmitter::new(Arc::new(config)).unwrap();

    let outcome = submitter.submit(&PostingId::from("1")).await.unwrap();

    assert_eq!(outcome.status_code, 400);
    assert_eq!(outcome.message, "CSRF token not found");
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn submit_transport_failure_is_status_500() {
    let base = closed_port_url().await;
    let config = SessionConfig {
        base_url: base.clone(),
        cookies: "_xsrf=T".into(),
        apply_url: format!("{base}/apply"),
        ..SessionConfig::default()
    };
    let submitter = ReqwestSubmitter::new(Arc::new(config)).unwrap();

    let outcome = submitter.submit(&PostingId::from("1")).await.unwrap();

    assert_eq!(outcome.status_code, 500);
    assert!(!outcome.message.is_empty());
}

#[tokio::test]
async fn telemetry_posts_json_when_enabled() {
    let stub = StubServer::start().await;
    let config = SessionConfig {
        interaction_enabled: true,
        ..stub.config()
    };
    let submitter = ReqwestSubmitter::new(Arc::new(config)).unwrap();

    submitter
        .register_interaction(&PostingId::from("77"))
        .await
        .unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/interaction");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-xsrftoken"), Some("TOKEN123"));
    let json: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(json, serde_json::json!({ "vacancyId": "77" }));
}

#[tokio::test]
async fn telemetry_disabled_sends_nothing() {
    let stub = StubServer::start().await;
    let submitter = ReqwestSubmitter::new(Arc::new(stub.config())).unwrap();

    submitter
        .register_interaction(&PostingId::from("77"))
        .await
        .unwrap();

    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn full_run_against_stub_applies_only_new_postings() {
    let stub = StubServer::start().await;
    let config = Arc::new(SessionConfig {
        interaction_enabled: true,
        ..stub.config()
    });
    let client = build_client(&config).unwrap();
    let ledger = MemoryLedger::with_applied(&["101"]);

    let service = ApplyService::new(
        ReqwestListingFetcher::with_client(client.clone(), config.clone()),
        ListingExtractor,
        ReqwestSubmitter::with_client(client, config.clone()),
        ledger.clone(),
        &config,
    )
    .with_throttle(ThrottleConfig::disabled());

    let summary = service.run(&TracingRunReporter).await;

    assert_eq!(summary.total_found, 3);
    assert_eq!(summary.new_postings, 2);
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.errors, 0);
    assert_eq!(ledger.applied_count().await, 3);

    let applies: HashSet<String> = stub
        .requests()
        .iter()
        .filter(|r| r.path == "/apply/ok")
        .map(|r| r.header("referer").unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        applies,
        HashSet::from([
            format!("{}/vacancy/102", stub.base_url),
            format!("{}/vacancy/103", stub.base_url),
        ])
    );

    let terminal = ledger
        .logs
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.action.is_terminal())
        .count();
    assert_eq!(terminal, 3);
    assert!(
        ledger
            .logs
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.posting_id.as_str() == "101" && e.action == LogAction::Skip)
    );
}

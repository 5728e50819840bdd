use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_bucketd::{app, BasicEntry, LogResponse, MemberInfo, SessionInfo, VersionsListing};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.to_string())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn send(
    app: &mut axum::routing::RouterIntoService<String>,
    req: Request<String>,
) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(req)
        .await
        .unwrap()
}

// --- buckets ---

#[tokio::test]
async fn create_bucket_then_conflict() {
    let mut app = app().into_service();

    let resp = send(&mut app, json_request("POST", "/default/bucket/b1", r#"{"uid":"1"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, json_request("POST", "/default/bucket/b1", r#"{"uid":"2"}"#)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&mut app, request("GET", "/default/attributes/b1", "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, r#"{"uid":"1"}"#);
}

#[tokio::test]
async fn create_bucket_on_unknown_session_is_rejected() {
    let resp = app()
        .oneshot(json_request("POST", "/default/bucket/b1?raftsession=12", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_missing_bucket_returns_404() {
    let resp = app()
        .oneshot(request("DELETE", "/default/bucket/nosuchbucket", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attributes_of_missing_bucket_return_404() {
    let resp = app()
        .oneshot(request("GET", "/default/attributes/nosuchbucket", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- listings ---

#[tokio::test]
async fn versions_listing_paginates() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;
    let batch = r#"{"batch":[
        {"key":"fop\u0000123","value":"1"},
        {"key":"goo\u0000124","value":"2"},
        {"key":"hop\u0000125","value":"3"}
    ]}"#;
    let resp = send(&mut app, json_request("POST", "/default/batch/b1", batch)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
        &mut app,
        request("GET", "/default/bucket/b1?listingType=DelimiterVersions&maxKeys=2", ""),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: VersionsListing = body_json(resp).await;
    assert_eq!(page.versions.len(), 2);
    assert!(page.is_truncated);
    assert_eq!(page.next_key_marker.as_deref(), Some("goo"));
    assert_eq!(page.next_version_id_marker.as_deref(), Some("124"));

    let resp = send(
        &mut app,
        request(
            "GET",
            "/default/bucket/b1?keyMarker=goo&listingType=DelimiterVersions&maxKeys=2&versionIdMarker=124",
            "",
        ),
    )
    .await;
    let page: VersionsListing = body_json(resp).await;
    assert_eq!(page.versions.len(), 1);
    assert_eq!(page.versions[0].key, "hop");
    assert!(!page.is_truncated);
}

#[tokio::test]
async fn basic_listing_without_values() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;
    let batch = r#"{"batch":[{"key":"a","value":"1"},{"key":"b","value":"2"},{"key":"c","value":"3"}]}"#;
    send(&mut app, json_request("POST", "/default/batch/b1", batch)).await;

    let resp = send(
        &mut app,
        request("GET", "/default/bucket/b1?gte=b&listingType=Basic&values=false", ""),
    )
    .await;
    let entries: Vec<BasicEntry> = body_json(resp).await;
    assert_eq!(
        entries,
        vec![
            BasicEntry { key: "b".to_string(), value: String::new() },
            BasicEntry { key: "c".to_string(), value: String::new() },
        ]
    );
}

#[tokio::test]
async fn listing_rejects_unknown_type_and_large_max_keys() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;

    let resp = send(&mut app, request("GET", "/default/bucket/b1?listingType=Delimiter", "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&mut app, request("GET", "/default/bucket/b1?listingType=Basic&maxKeys=10001", "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_deletes_keys() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;
    send(&mut app, json_request("POST", "/default/batch/b1", r#"{"batch":[{"key":"a","value":"1"}]}"#)).await;
    send(&mut app, json_request("POST", "/default/batch/b1", r#"{"batch":[{"key":"a","type":"del"}]}"#)).await;

    let resp = send(&mut app, request("GET", "/default/bucket/b1?listingType=Basic", "")).await;
    let entries: Vec<BasicEntry> = body_json(resp).await;
    assert!(entries.is_empty());
}

// --- admin ---

#[tokio::test]
async fn read_only_bucket_refuses_writes() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;

    let resp = send(&mut app, request("PUT", "/_/buckets/b1/accessMode?mode=read-only", "")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, request("GET", "/_/buckets/b1/accessMode", "")).await;
    assert_eq!(body_bytes(resp).await, "read-only");

    let resp = send(&mut app, json_request("POST", "/default/batch/b1", r#"{"batch":[]}"#)).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = send(&mut app, request("PUT", "/_/buckets/b1/accessMode?mode=sideways", "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn escaped_bucket_names_reach_the_bucket() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/my-bucket%2Fwith-a-slash?raftsession=2", "{}")).await;

    let resp = send(&mut app, request("GET", "/_/buckets/my-bucket%2Fwith-a-slash/id", "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "2");
}

#[tokio::test]
async fn raft_sessions_and_leader() {
    let mut app = app().into_service();

    let resp = send(&mut app, request("GET", "/_/raft_sessions", "")).await;
    let sessions: Vec<SessionInfo> = body_json(resp).await;
    assert_eq!(sessions.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);

    let resp = send(&mut app, request("GET", "/_/raft_sessions/2/leader", "")).await;
    let leader: MemberInfo = body_json(resp).await;
    assert_eq!(leader.id, 20);
    assert_eq!(leader.port, 4202);

    let resp = send(&mut app, request("GET", "/_/raft_sessions/9/leader", "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_log_records_mutations() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", r#"{"uid":"x"}"#)).await;
    send(&mut app, json_request("POST", "/default/batch/b1", r#"{"batch":[{"key":"k","value":"v"}]}"#)).await;

    let resp = send(&mut app, request("GET", "/_/raft_sessions/1/log?begin=1&limit=10", "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let log: LogResponse = body_json(resp).await;
    assert_eq!(log.info.cseq, 2);
    assert_eq!(log.log.len(), 2);
    assert_eq!(log.log[0].method, 0);
    assert_eq!(log.log[1].method, 8);
    assert_eq!(log.log[1].entries[0].key, "k");

    let resp = send(&mut app, request("GET", "/_/raft_sessions/1/log?begin=10&limit=2", "")).await;
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn session_log_with_huge_limit_returns_whole_log() {
    let mut app = app().into_service();
    send(&mut app, json_request("POST", "/default/bucket/b1", "{}")).await;

    let uri = format!("/_/raft_sessions/1/log?begin=1&limit={}", u64::MAX);
    let resp = send(&mut app, request("GET", &uri, "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let log: LogResponse = body_json(resp).await;
    assert_eq!(log.log.len(), 1);
}

// --- metastore ---

#[tokio::test]
async fn metastore_lifecycle() {
    let mut app = app().into_service();

    let resp = send(&mut app, request("GET", "/default/metastore/db/b1", "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &mut app,
        json_request("POST", "/default/metastore/db/b1", r#"{"name":"b1","raftSessionID":2}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, request("GET", "/default/metastore/db/b1", "")).await;
    let entry: serde_json::Value = body_json(resp).await;
    assert_eq!(entry["raftSessionID"], 2);

    let resp = send(&mut app, request("DELETE", "/default/metastore/db/b1", "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&mut app, request("DELETE", "/default/metastore/db/b1", "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
